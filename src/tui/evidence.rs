use crate::interpret::format_percent;
use crate::navigator::VisualizationNavigator;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

/// (position, score%) pairs; x is 1-based to match the on-screen numbering.
pub fn score_points(nav: &VisualizationNavigator) -> Vec<(f64, f64)> {
    nav.frames()
        .iter()
        .enumerate()
        .map(|(i, f)| ((i + 1) as f64, f.score * 100.0))
        .collect()
}

fn key_points(nav: &VisualizationNavigator, all: &[(f64, f64)]) -> Vec<(f64, f64)> {
    nav.key_detections().into_iter().filter_map(|i| all.get(i).copied()).collect()
}

fn placeholder(area: Rect, f: &mut Frame, text: &str) {
    let p = Paragraph::new(Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::Gray),
    )))
    .block(Block::default().borders(Borders::ALL).title("Evidence"));
    f.render_widget(p, area);
}

/// Score chart across evidence frames with the selected frame highlighted,
/// followed by metadata for the selected frame.
pub fn draw_evidence(area: Rect, f: &mut Frame, nav: Option<&VisualizationNavigator>) {
    let nav = match nav {
        Some(nav) if nav.has_evidence() => nav,
        Some(_) => return placeholder(area, f, "No evidence available"),
        None => return placeholder(area, f, "Evidence frames appear after analysis"),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Evidence ({} frames)", nav.len()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)].as_ref())
        .split(inner);

    let points = score_points(nav);
    let keys = key_points(nav, &points);
    let selected: Vec<(f64, f64)> = nav
        .selected()
        .and_then(|i| points.get(i).copied())
        .into_iter()
        .collect();

    let mut datasets = vec![Dataset::default()
        .name("score")
        .graph_type(GraphType::Line)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Cyan))
        .data(&points)];
    if !keys.is_empty() {
        datasets.push(
            Dataset::default()
                .name("key detection")
                .graph_type(GraphType::Scatter)
                .marker(symbols::Marker::Dot)
                .style(Style::default().fg(Color::Red))
                .data(&keys),
        );
    }
    datasets.push(
        Dataset::default()
            .name("selected")
            .graph_type(GraphType::Scatter)
            .marker(symbols::Marker::Block)
            .style(Style::default().fg(Color::Yellow))
            .data(&selected),
    );

    let x_max = (nav.len() as f64).max(2.0);
    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("frame")
                .bounds([1.0, x_max])
                .labels(vec![
                    Span::raw("1"),
                    Span::raw(format!("{}", nav.len())),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("%")
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]),
        );
    f.render_widget(chart, rows[0]);

    let mut lines = Vec::new();
    if let Some(view) = nav.current() {
        let mut spans = vec![
            Span::styled(
                format!("Frame {}/{}", view.position + 1, view.total),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  #{}  score ", view.frame_index)),
            Span::styled(view.score_text, Style::default().fg(Color::Cyan)),
        ];
        if view.is_key_detection {
            spans.push(Span::styled(
                "  [key detection]",
                Style::default().fg(Color::Red),
            ));
        }
        lines.push(Line::from(spans));
    }
    if let Some(frame) = nav.current_frame() {
        let image = match crate::storage::inline_image_info(&frame.image) {
            Ok((ext, size)) => format!("Image: {ext}, {size} bytes"),
            Err(_) => "Image: unavailable".to_string(),
        };
        lines.push(Line::from(Span::styled(image, Style::default().fg(Color::Gray))));
    }
    let keys_text: Vec<String> = nav
        .key_detections()
        .into_iter()
        .filter_map(|i| nav.frames().get(i))
        .map(|f| format!("#{} ({})", f.frame_index, format_percent(f.score)))
        .collect();
    if !keys_text.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Key detections: ", Style::default().fg(Color::Gray)),
            Span::raw(keys_text.join(", ")),
        ]));
    }
    f.render_widget(Paragraph::new(lines), rows[1]);
}
