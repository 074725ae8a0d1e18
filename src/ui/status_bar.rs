// Status bar rendering module
//
// Bottom bar with keyboard hints, cadence readout, pause indicator and the
// most recent enumeration warning.

use crate::app::AppState;
use crate::theme::{ACCENT_CYAN, ALERT_RED, OUTBOUND_AMBER, TEXT_DIM, TEXT_PRIMARY};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let key_style = Style::default()
        .fg(ACCENT_CYAN)
        .add_modifier(Modifier::BOLD);
    let text_style = Style::default().fg(TEXT_PRIMARY);

    let mut spans = vec![
        Span::styled("Q:", key_style),
        Span::styled("Quit ", text_style),
        Span::styled("Space:", key_style),
        Span::styled(
            if app.paused { "Resume " } else { "Pause " },
            text_style,
        ),
        Span::styled("t:", key_style),
        Span::styled(
            if app.labels_enabled {
                "Labels off "
            } else {
                "Labels on "
            },
            text_style,
        ),
        Span::styled("+/-:", key_style),
        Span::styled("Poll speed ", text_style),
        Span::styled("l:", key_style),
        Span::styled("Log dump ", text_style),
    ];

    spans.push(Span::styled(
        format!(
            "| poll {}ms render {}ms ",
            app.poll.interval().as_millis(),
            app.render.interval().as_millis()
        ),
        Style::default().fg(TEXT_DIM),
    ));

    spans.push(Span::styled(
        format!(
            "| frames {} (skipped {}) polls {} ",
            app.frames_rendered, app.frames_skipped, app.polls_completed
        ),
        Style::default().fg(TEXT_DIM),
    ));

    if app.paused {
        spans.push(Span::styled(
            "[PAUSED] ",
            Style::default().fg(OUTBOUND_AMBER).add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(warning) = &app.enum_warning {
        spans.push(Span::styled(
            format!("⚠ {}", warning),
            Style::default().fg(ALERT_RED),
        ));
    }

    let status_bar = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(ACCENT_CYAN)),
        )
        .alignment(Alignment::Left);

    f.render_widget(status_bar, area);
}
