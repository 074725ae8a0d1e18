// Endpoint sidebar rendering module
//
// Tabular view of every tracked endpoint, including the ones the map
// cannot place (private/reserved and failed lookups).

use std::time::Instant;

use crate::app::AppState;
use crate::theme::{age_color, direction_color, ACCENT_CYAN, TEXT_PRIMARY};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Row, Table},
    Frame,
};

pub fn render_sidebar(f: &mut Frame, area: Rect, app: &AppState) {
    let now = Instant::now();
    let ttl = app.tracker.ttl();

    let header = Row::new(vec!["Remote", "Location", "Dir", "Conns", "Age"]).style(
        Style::default()
            .fg(TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .last_snapshot
        .iter()
        .map(|ep| {
            let age = now.duration_since(ep.last_seen);
            let row_color = age_color(age, ttl);
            Row::new(vec![
                Cell::from(ep.ip.to_string()),
                Cell::from(ep.location.summary()),
                Cell::from(Span::styled(
                    ep.directions.arrows(),
                    Style::default().fg(direction_color(ep.directions)),
                )),
                Cell::from(ep.weight.to_string()),
                Cell::from(format!("{}s", age.as_secs())),
            ])
            .style(Style::default().fg(row_color))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(15),    // Remote IP (IPv6 needs room)
            Constraint::Min(14),    // Location
            Constraint::Length(3),  // Direction arrows
            Constraint::Length(5),  // Connection count
            Constraint::Length(5),  // Age
        ],
    )
    .header(header)
    .column_spacing(1)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ACCENT_CYAN))
            .title(format!(" Endpoints ({}) ", app.last_snapshot.len()))
            .title_style(Style::default().fg(TEXT_PRIMARY)),
    );

    f.render_widget(table, area);
}
