mod evidence;
mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::interpret::{format_percent, present, AccentTheme};
use crate::model::AppEvent;
use crate::orchestrator::{self, UiCommand};
use crate::workflow::WorkflowState;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{push_wrapped_status_kv, KeyAction, UiState, TAB_HISTORY, TAB_VERIFY};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    if let Some(path) = args.file.clone() {
        let _ = cmd_tx.send(UiCommand::Open(path));
        if args.submit_on_launch {
            let _ = cmd_tx.send(UiCommand::Submit);
        }
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let cfg = crate::cli::build_config(&args);
    let res = orchestrator::run_controller(&cfg, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    state.history_load_size = terminal
        .size()
        .map(|size| ((size.height as usize).saturating_sub(2) * 3).max(20))
        .unwrap_or(66);
    reload_history(&mut state);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        let mut reload = false;
        loop {
            match event_rx.try_recv() {
                Ok(ev) => reload |= state.apply_event(ev),
                Err(mpsc::error::TryRecvError::Empty) => break,
                // Controller is gone (e.g. failed to start); nothing left to drive.
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if state.info.is_empty() {
                        state.info = "Controller stopped".into();
                    }
                    break;
                }
            }
        }
        if reload {
            reload_history(&mut state);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
            continue;
        }
        let action = match event::read() {
            Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => state.handle_key(k),
            Ok(Event::Paste(text)) => state.handle_paste(&text),
            _ => KeyAction::None,
        };
        match action {
            KeyAction::None => {}
            KeyAction::Quit => {
                let _ = cmd_tx.send(UiCommand::Quit);
                break Ok(());
            }
            KeyAction::Send(cmd) => {
                let _ = cmd_tx.send(cmd);
            }
            KeyAction::ExportJson => export_active(&mut state),
            KeyAction::CopyHash => copy_active_hash(&mut state),
            KeyAction::RefreshHistory => {
                let old_count = state.history.len();
                reload_history(&mut state);
                let new_count = state.history.len();
                state.info = if new_count > old_count {
                    format!("Refreshed: {} new verdict(s)", new_count - old_count)
                } else {
                    "Refreshed".into()
                };
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

fn reload_history(state: &mut UiState) {
    match crate::storage::load_recent(state.history_load_size) {
        Ok(history) => state.replace_history(history),
        Err(e) => state.info = format!("History unavailable: {e:#}"),
    }
}

fn export_active(state: &mut UiState) {
    let Some(record) = state.active_record() else {
        state.info = "No verdict to export yet.".into();
        return;
    };
    match export::export_record_json(record) {
        Ok(p) => state.info = format!("Exported JSON: {}", p.display()),
        Err(e) => state.info = format!("JSON export failed: {e:#}"),
    }
}

fn copy_active_hash(state: &mut UiState) {
    let hash = match state.tab {
        TAB_VERIFY => state
            .workflow
            .result()
            .and_then(|r| r.provenance.video_hash.clone()),
        _ => state
            .active_record()
            .and_then(|r| r.provenance.video_hash.clone()),
    };
    let Some(hash) = hash else {
        state.info = "No video hash to copy".into();
        return;
    };
    state.info = match export::copy_to_clipboard(&hash) {
        Ok(()) => format!("✓ Copied video hash: {hash}"),
        Err(e) => format!("Clipboard copy failed: {e:#}"),
    };
}

fn accent_color(accent: AccentTheme) -> Color {
    match accent {
        AccentTheme::Authentic => Color::Green,
        AccentTheme::Manipulated => Color::Red,
        AccentTheme::Indeterminate => Color::Yellow,
        AccentTheme::Neutral => Color::Gray,
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut v = bytes as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{v:.1} {}", UNITS[unit])
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Verify"),
        Line::from("History"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("veritrust-cli"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_VERIFY => draw_verify(chunks[1], f, state),
        TAB_HISTORY => draw_history(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_verify(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Drop zone
                Constraint::Min(8),    // Verdict + evidence
                Constraint::Length(7), // Status
            ]
            .as_ref(),
        )
        .split(area);

    draw_drop_zone(main[0], f, state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(main[1]);
    draw_verdict(body[0], f, state);
    evidence::draw_evidence(body[1], f, state.workflow.navigator());

    draw_status(main[2], f, state);
}

fn draw_drop_zone(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let hovering = state.drop_zone.is_hovering();
    let border = if hovering {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let line = if let Some(input) = state.path_input.as_deref() {
        Line::from(vec![
            Span::styled("Path: ", Style::default().fg(Color::Gray)),
            Span::raw(input.to_string()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ])
    } else if let Some(file) = state.workflow.file() {
        Line::from(vec![
            Span::styled(file.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  {}  {}", file.mime, human_size(file.size()))),
        ])
    } else {
        Line::from(Span::styled(
            "Drop a video file here, or press o to type a path",
            Style::default().fg(Color::Gray),
        ))
    };

    let p = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Video"),
    );
    f.render_widget(p, area);
}

fn draw_verdict(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    let mut border = Style::default();

    match state.workflow.state() {
        WorkflowState::Idle => {
            lines.push(Line::from("No video selected."));
        }
        WorkflowState::Ready { file } => {
            lines.push(Line::from(format!("Ready to analyze {}.", file.name)));
            lines.push(Line::from(vec![
                Span::raw("Press "),
                Span::styled("Enter", Style::default().fg(Color::Magenta)),
                Span::raw(" to submit."),
            ]));
        }
        WorkflowState::Submitting { file, .. } => {
            lines.push(Line::from(Span::styled(
                format!("Analyzing {}...", file.name),
                Style::default().fg(Color::Cyan),
            )));
            lines.push(Line::from("This can take a while for long videos."));
        }
        WorkflowState::Resulted { result, .. } => {
            let p = present(&result.category);
            let color = accent_color(p.accent);
            border = Style::default().fg(color);
            lines.push(Line::from(Span::styled(
                p.headline,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(vec![
                Span::styled("Confidence: ", Style::default().fg(Color::Gray)),
                Span::styled(format_percent(result.confidence), Style::default().fg(color)),
            ]));
            lines.push(Line::from(""));
            for g in p.guidance {
                lines.push(Line::from(format!("• {g}")));
            }
            let provenance = crate::text_summary::provenance_lines(&result.provenance);
            if !provenance.is_empty() {
                lines.push(Line::from(""));
                lines.extend(
                    provenance
                        .into_iter()
                        .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::Gray)))),
                );
            }
        }
        WorkflowState::Failed { error, .. } => {
            border = Style::default().fg(Color::Red);
            lines.push(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from("Select the video again to retry, or x to reset."));
        }
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Verdict"),
    );
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    push_wrapped_status_kv(
        &mut lines,
        "Status",
        state.workflow.state().label(),
        area.width,
        None,
    );
    if let Some(notice) = state.workflow.notice() {
        push_wrapped_status_kv(
            &mut lines,
            "Rejected",
            &notice.to_string(),
            area.width,
            Some(Color::Red),
        );
    }
    if let Some(nav) = state.workflow.navigator() {
        push_wrapped_status_kv(&mut lines, "Evidence", &nav.status_text(), area.width, None);
    }
    push_wrapped_status_kv(&mut lines, "Info", &state.info, area.width, None);
    lines.push(Line::from(vec![
        Span::styled("o", Style::default().fg(Color::Magenta)),
        Span::raw(" open  "),
        Span::styled("Enter", Style::default().fg(Color::Magenta)),
        Span::raw(" submit  "),
        Span::styled("x", Style::default().fg(Color::Magenta)),
        Span::raw(" reset  "),
        Span::styled("←/→", Style::default().fg(Color::Magenta)),
        Span::raw(" frames  "),
        Span::styled("?", Style::default().fg(Color::Magenta)),
        Span::raw(" help"),
    ]));

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn short_timestamp(ts: &str) -> String {
    // "2026-01-15T14:30:45Z" -> "2026-01-15 14:30:45"
    ts.chars()
        .take(19)
        .map(|c| if c == 'T' { ' ' } else { c })
        .collect()
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();

    // Header, info line, blank, list, blank, details (3) and borders.
    let max_items = (area.height as usize).saturating_sub(9).max(1);

    let total_count = state.history.len();
    let current_pos = if total_count > 0 {
        state.history_selected + 1
    } else {
        0
    };

    lines.push(Line::from(vec![
        Span::raw(format!("History ({}/{}) - ", current_pos, total_count)),
        Span::styled("↑/↓/j/k", Style::default().fg(Color::Magenta)),
        Span::raw(": navigate, "),
        Span::styled("r", Style::default().fg(Color::Magenta)),
        Span::raw(": refresh, "),
        Span::styled("e", Style::default().fg(Color::Magenta)),
        Span::raw(": export JSON, "),
        Span::styled("y", Style::default().fg(Color::Magenta)),
        Span::raw(": copy hash"),
    ]));
    if !state.info.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Info: ", Style::default().fg(Color::Gray)),
            Span::raw(state.info.clone()),
        ]));
    }
    lines.push(Line::from(""));

    if state.history.is_empty() {
        lines.push(Line::from(Span::styled(
            "No saved verdicts yet.",
            Style::default().fg(Color::Gray),
        )));
    }

    // Keep the selected item visible.
    let scroll_offset = {
        let mut offset = state
            .history_scroll_offset
            .min(state.history.len().saturating_sub(1));
        if state.history_selected < offset {
            offset = state.history_selected;
        } else if state.history_selected >= offset + max_items {
            offset = state.history_selected.saturating_sub(max_items - 1);
        }
        offset
    };

    for (display_idx, r) in state
        .history
        .iter()
        .skip(scroll_offset)
        .take(max_items)
        .enumerate()
    {
        let is_selected = scroll_offset + display_idx == state.history_selected;
        let color = accent_color(present(&crate::model::Category::from_wire(&r.prediction)).accent);
        let base = if is_selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}  ", short_timestamp(&r.timestamp_utc)), base),
            Span::styled(format!("{:<11}", r.prediction), base.fg(color)),
            Span::styled(format!("{:>6}  ", format_percent(r.confidence)), base),
            Span::styled(r.source_name.clone(), base),
        ]));
    }

    if let Some(r) = state.selected_history() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Request: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{}  ({})", r.request_id, human_size(r.file_size))),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Hash: ", Style::default().fg(Color::Gray)),
            Span::raw(r.provenance.video_hash.clone().unwrap_or_else(|| "-".into())),
        ]));
        let keys = r.evidence.iter().filter(|e| e.is_key_detection).count();
        lines.push(Line::from(vec![
            Span::styled("Evidence: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{} frame(s), {} key detection(s)", r.evidence.len(), keys)),
        ]));
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("History"));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }

    #[test]
    fn timestamps_are_shortened_for_the_list() {
        assert_eq!(short_timestamp("2026-01-15T14:30:45.123Z"), "2026-01-15 14:30:45");
        assert_eq!(short_timestamp("bad"), "bad");
    }
}
