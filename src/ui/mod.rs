// UI rendering module
//
// The main draw() function orchestrates the three panels: world map,
// endpoint sidebar, status bar. Rendering is a pure consumer of AppState;
// nothing here mutates tracked state.

mod map;
mod sidebar;
mod status_bar;

#[allow(unused_imports)]
pub use map::{plot_points, PlottedPoint};

use crate::app::AppState;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use map::render_map;
use sidebar::render_sidebar;
use status_bar::render_status_bar;

/// Main UI drawing function.
pub fn draw(f: &mut Frame, app: &AppState) {
    let size = f.area();

    // Main layout: body, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Status bar
        ])
        .split(size);

    // Body: world map + endpoint sidebar
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(68), // World map
            Constraint::Percentage(32), // Endpoint list
        ])
        .split(chunks[0]);

    render_map(f, body_chunks[0], app);
    render_sidebar(f, body_chunks[1], app);

    render_status_bar(f, chunks[1], app);
}
