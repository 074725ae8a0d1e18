// World map rendering module
//
// Draws the canvas world map and one marker per resolved endpoint.
// Endpoints whose location is private/reserved or failed to resolve are
// never plotted; they remain visible in the sidebar only.

use crate::app::config::HEAVY_WEIGHT_THRESHOLD;
use crate::app::AppState;
use crate::theme::{direction_color, ACCENT_CYAN, MAP_LAND, TEXT_PRIMARY};
use crate::track::TrackedEndpoint;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{
        canvas::{Canvas, Circle, Map, MapResolution, Points},
        Block, BorderType, Borders,
    },
    Frame,
};

/// Halo radius cap in map degrees, so one busy endpoint cannot swallow a
/// continent.
const MAX_HALO_RADIUS: f64 = 10.0;

/// One marker ready to paint: the view model extracted from a render
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottedPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub weight: usize,
    pub color: Color,
    pub label: String,
}

/// Extract the drawable points from a render snapshot. Only `Resolved`
/// endpoints make it onto the map.
pub fn plot_points(snapshot: &[TrackedEndpoint]) -> Vec<PlottedPoint> {
    snapshot
        .iter()
        .filter(|ep| ep.location.is_resolved())
        .map(|ep| PlottedPoint {
            longitude: ep.location.longitude,
            latitude: ep.location.latitude,
            weight: ep.weight,
            color: direction_color(ep.directions),
            label: point_label(ep),
        })
        .collect()
}

/// Label text: nearest named place (or the IP) plus a weight suffix when
/// several connections collapsed into the marker.
fn point_label(ep: &TrackedEndpoint) -> String {
    let place = match (&ep.location.city, &ep.location.country) {
        (Some(city), _) => city.clone(),
        (None, Some(country)) => country.clone(),
        (None, None) => ep.ip.to_string(),
    };
    if ep.weight > 1 {
        format!("{} ×{}", place, ep.weight)
    } else {
        place
    }
}

fn halo_radius(weight: usize) -> f64 {
    (weight as f64).min(MAX_HALO_RADIUS)
}

pub fn render_map(f: &mut Frame, area: Rect, app: &AppState) {
    let points = plot_points(&app.last_snapshot);

    let title = format!(
        " World Traffic — {} located / {} tracked ",
        points.len(),
        app.last_snapshot.len()
    );

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(ACCENT_CYAN))
                .title(title)
                .title_style(Style::default().fg(TEXT_PRIMARY)),
        )
        .marker(Marker::Braille)
        .x_bounds([-180.0, 180.0])
        .y_bounds([-90.0, 90.0])
        .paint(|ctx| {
            ctx.draw(&Map {
                resolution: MapResolution::High,
                color: MAP_LAND,
            });
            ctx.layer();

            for point in &points {
                if point.weight >= HEAVY_WEIGHT_THRESHOLD {
                    ctx.draw(&Circle {
                        x: point.longitude,
                        y: point.latitude,
                        radius: halo_radius(point.weight),
                        color: point.color,
                    });
                }
                ctx.draw(&Points {
                    coords: &[(point.longitude, point.latitude)],
                    color: point.color,
                });
            }

            if app.labels_enabled {
                // Labels go on a separate layer so they overpaint markers.
                ctx.layer();
                for point in &points {
                    ctx.print(
                        point.longitude,
                        point.latitude,
                        Line::styled(point.label.clone(), Style::default().fg(point.color)),
                    );
                }
            }
        });

    f.render_widget(canvas, area);
}
