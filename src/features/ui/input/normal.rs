use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::super::state::DashboardState;

/// Applies one key press. Returns `true` when the visible page changed and
/// needs fresh data.
pub(in crate::features::ui) fn handle_key(key: KeyEvent, state: &mut DashboardState) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        state.should_quit = true;
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            state.should_quit = true;
            false
        }
        KeyCode::Right | KeyCode::Char('l') => state.next_page(),
        KeyCode::Left | KeyCode::Char('h') => state.prev_page(),
        _ => false,
    }
}
