use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, Message, Model};

impl App {
    pub(super) fn handle_event(event: &Event, model: &Model) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Resize(width, height) => Some(Message::Resize(*width, *height)),
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return matches!(key.code, KeyCode::Char('c')).then_some(Message::Quit);
        }
        if model.help_visible {
            return match key.code {
                KeyCode::Char('q') => Some(Message::Quit),
                _ => Some(Message::HideHelp),
            };
        }
        match key.code {
            KeyCode::Char(' ') => Some(Message::Toggle),
            KeyCode::Char('n') | KeyCode::Right => Some(Message::Next),
            KeyCode::Char('b') | KeyCode::Left => Some(Message::Back),
            KeyCode::Char('s') => Some(Message::Stop),
            KeyCode::Char('r') => Some(Message::Reset),
            KeyCode::Char('f') => Some(Message::FastForward),
            KeyCode::Enter => Some(Message::ClickAnnotation),
            KeyCode::Char('c') => Some(Message::ClickCompile),
            KeyCode::Char('?') => Some(Message::ToggleHelp),
            KeyCode::Char('q') | KeyCode::Esc => Some(Message::Quit),
            _ => None,
        }
    }
}
