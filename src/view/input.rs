use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// A user intent understood by player views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    CursorDown,
    CursorUp,
    /// Play the highlighted track (or toggle it if it is already current).
    PlayCursor,
    TogglePlay,
    Next,
    Previous,
    SeekForward,
    SeekBackward,
    VolumeUp,
    VolumeDown,
}

/// Map a key press to a gesture. Unbound keys yield `None`.
pub fn gesture_for_key(key: KeyEvent) -> Option<Gesture> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('n') => Some(Gesture::CursorDown),
            KeyCode::Char('p') => Some(Gesture::CursorUp),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(Gesture::CursorDown),
        KeyCode::Char('k') | KeyCode::Up => Some(Gesture::CursorUp),
        KeyCode::Enter => Some(Gesture::PlayCursor),
        KeyCode::Char(' ') | KeyCode::Char('p') => Some(Gesture::TogglePlay),
        KeyCode::Char('l') => Some(Gesture::Next),
        KeyCode::Char('h') => Some(Gesture::Previous),
        KeyCode::Char('L') | KeyCode::Right => Some(Gesture::SeekForward),
        KeyCode::Char('H') | KeyCode::Left => Some(Gesture::SeekBackward),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Gesture::VolumeUp),
        KeyCode::Char('-') => Some(Gesture::VolumeDown),
        _ => None,
    }
}

/// Whether (`col`, `row`) falls inside `area`.
pub(super) fn hits(area: ratatui::layout::Rect, col: u16, row: u16) -> bool {
    col >= area.x
        && col < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}
