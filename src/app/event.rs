// Keyboard event handling
//
// Processes user input and updates application state.

use super::AppState;
use crossterm::event::KeyCode;

/// Handle a key press.
///
/// Returns `true` if the application should continue running,
/// `false` if it should exit.
///
/// # Key Bindings
/// - `q`, `Q`, `Esc` - Quit
/// - `Space` - Pause/resume polling (the map keeps rendering; entries
///   still expire per TTL)
/// - `t`, `T` - Toggle endpoint labels on the map
/// - `+`, `=` - Poll faster (shorter interval)
/// - `-`, `_` - Poll slower (longer interval)
/// - `l`, `L` - Dump the current endpoint table to the log
pub fn handle_key_event(app: &mut AppState, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.running = false;
            false
        }
        KeyCode::Char(' ') => {
            app.toggle_pause();
            true
        }
        KeyCode::Char('t') | KeyCode::Char('T') => {
            app.toggle_labels();
            true
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.increase_poll_rate();
            true
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            app.decrease_poll_rate();
            true
        }
        KeyCode::Char('l') | KeyCode::Char('L') => {
            app.dump_endpoints();
            true
        }
        _ => true,
    }
}
