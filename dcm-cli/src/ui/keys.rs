use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use dcm_core::controller::Input;

/// Translate a key press into controller input
pub fn map_key(key: KeyEvent) -> Option<Input> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Input::Quit),
        (KeyCode::Char('q'), _) => Some(Input::Quit),
        (KeyCode::Up | KeyCode::Char('k'), _) => Some(Input::Up),
        (KeyCode::Down | KeyCode::Char('j'), _) => Some(Input::Down),
        (KeyCode::Home | KeyCode::Char('g'), _) => Some(Input::Home),
        (KeyCode::End | KeyCode::Char('G'), _) => Some(Input::End),
        (KeyCode::Enter | KeyCode::Char(' '), _) => Some(Input::Confirm),
        (KeyCode::Char('r'), _) => Some(Input::Refresh),
        (KeyCode::Esc, _) => Some(Input::Dismiss),
        _ => None,
    }
}
