use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

/// TUI-specific input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiEvent {
    // Handled by the event loop
    Quit,
    Back,
    SaveSnapshot,
    Recreate,
    ResetMenu,
    Resize,

    // Forwarded to the focused screen (or an open prompt)
    Up,
    Down,
    Open,
    SwitchFocus,
    PopToRoot,
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(std::time::Duration::ZERO)
}

/// Poll for an event, blocking up to `timeout`.
pub fn poll_event_timeout(timeout: std::time::Duration) -> Option<TuiEvent> {
    if !event::poll(timeout).ok()? {
        return None;
    }
    match event::read().ok()? {
        Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
            log::debug!("Key event: {:?} with modifiers {:?}", key_event.code, key_event.modifiers);
            match (key_event.modifiers, key_event.code) {
                (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(TuiEvent::Quit),
                (_, KeyCode::Char('q')) => Some(TuiEvent::Quit),
                (_, KeyCode::Esc | KeyCode::Backspace | KeyCode::Left) => Some(TuiEvent::Back),
                (_, KeyCode::Enter | KeyCode::Right) => Some(TuiEvent::Open),
                (_, KeyCode::Up | KeyCode::Char('k')) => Some(TuiEvent::Up),
                (_, KeyCode::Down | KeyCode::Char('j')) => Some(TuiEvent::Down),
                (_, KeyCode::Tab) => Some(TuiEvent::SwitchFocus),
                (_, KeyCode::Char('t')) => Some(TuiEvent::PopToRoot),
                (_, KeyCode::Char('s')) => Some(TuiEvent::SaveSnapshot),
                (_, KeyCode::Char('c')) => Some(TuiEvent::Recreate),
                (_, KeyCode::Char('x')) => Some(TuiEvent::ResetMenu),
                _ => None,
            }
        }
        Event::Resize(_, _) => Some(TuiEvent::Resize),
        _ => None,
    }
}
