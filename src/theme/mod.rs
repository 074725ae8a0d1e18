// Theme module - color constants and small styling helpers
//
// One palette for the whole UI: map landmass, traffic direction colors,
// and text shades.

use std::time::Duration;

use ratatui::style::Color;

use crate::track::DirectionSet;

/// Landmass color on the world map canvas.
pub const MAP_LAND: Color = Color::Rgb(90, 98, 120);

/// Inbound traffic markers.
pub const INBOUND_GREEN: Color = Color::Rgb(158, 206, 106);

/// Outbound traffic markers.
pub const OUTBOUND_AMBER: Color = Color::Rgb(255, 158, 100);

/// Endpoints seen in both directions.
pub const MIXED_VIOLET: Color = Color::Rgb(187, 154, 247);

/// General text.
pub const TEXT_PRIMARY: Color = Color::Rgb(169, 177, 214);

/// De-emphasized text (aging endpoints, inactive hints).
pub const TEXT_DIM: Color = Color::Rgb(96, 104, 132);

/// Borders and titles.
pub const ACCENT_CYAN: Color = Color::Rgb(125, 207, 255);

/// Warnings (enumeration failures).
pub const ALERT_RED: Color = Color::Rgb(247, 118, 142);

/// Marker color for an endpoint based on the directions observed on it.
pub fn direction_color(directions: DirectionSet) -> Color {
    match (directions.inbound, directions.outbound) {
        (true, true) => MIXED_VIOLET,
        (true, false) => INBOUND_GREEN,
        _ => OUTBOUND_AMBER,
    }
}

/// Text color for an endpoint row: dims once the entry has burned through
/// half its TTL without being re-sighted.
pub fn age_color(age: Duration, ttl: Duration) -> Color {
    if age * 2 >= ttl {
        TEXT_DIM
    } else {
        TEXT_PRIMARY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_color_mapping() {
        let mut both = DirectionSet::default();
        both.inbound = true;
        both.outbound = true;
        assert_eq!(direction_color(both), MIXED_VIOLET);

        let mut inbound = DirectionSet::default();
        inbound.inbound = true;
        assert_eq!(direction_color(inbound), INBOUND_GREEN);

        let mut outbound = DirectionSet::default();
        outbound.outbound = true;
        assert_eq!(direction_color(outbound), OUTBOUND_AMBER);
    }

    #[test]
    fn test_age_color_dims_past_half_ttl() {
        let ttl = Duration::from_secs(4);
        assert_eq!(age_color(Duration::from_secs(1), ttl), TEXT_PRIMARY);
        assert_eq!(age_color(Duration::from_secs(2), ttl), TEXT_DIM);
        assert_eq!(age_color(Duration::from_secs(3), ttl), TEXT_DIM);
    }
}
