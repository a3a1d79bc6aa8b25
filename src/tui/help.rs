use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:width$}{what}", "", width = pad)),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("o", 11, "Type a video path (Enter opens, Esc cancels)"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("paste", Style::default().fg(Color::Magenta)),
            Span::raw("       Drop a video file onto the terminal"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Enter", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::raw("   Submit for analysis"),
        ]),
        key_line("x", 11, "Reset (clears file, verdict and error)"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Evidence:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("←/→", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("h/l", Style::default().fg(Color::Magenta)),
            Span::raw("  Previous/next frame"),
        ]),
        key_line("1-9", 9, "Jump to frame"),
        Line::from(""),
        Line::from("Verify and History tabs:"),
        key_line("e", 11, "Export verdict as JSON"),
        key_line("y", 11, "Copy video hash to clipboard"),
        Line::from(""),
        Line::from("History tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate"),
        ]),
        key_line("r", 11, "Refresh history"),
        Line::from(""),
        Line::from("Service:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("--base-url", Style::default().fg(Color::Cyan)),
            Span::raw(" or "),
            Span::styled("VERITRUST_API_URL", Style::default().fg(Color::Cyan)),
            Span::raw(" (default http://localhost:8000)"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
