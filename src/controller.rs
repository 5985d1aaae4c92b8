use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use crate::domain::{Message, TableConfig, TableError};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TableConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self) -> Result<Option<Message>, TableError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Message::Quit),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Enter | KeyCode::Char('s') => Some(Message::SortSelected),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Option<Message> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                Some(Message::Click(mouse.column, mouse.row))
            }
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyEvent, KeyModifiers};

    fn controller() -> Controller {
        Controller::new(&TableConfig::default())
    }

    #[test]
    fn keys_map_to_messages() {
        let c = controller();
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(c.handle_key(key(KeyCode::Char('q'))), Some(Message::Quit));
        assert_eq!(c.handle_key(key(KeyCode::Enter)), Some(Message::SortSelected));
        assert_eq!(c.handle_key(key(KeyCode::Char('s'))), Some(Message::SortSelected));
        assert_eq!(c.handle_key(key(KeyCode::Left)), Some(Message::MoveLeft));
        assert_eq!(c.handle_key(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn left_click_becomes_click_message() {
        let mouse = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 12,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(controller().handle_mouse(mouse), Some(Message::Click(12, 0)));

        let right = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Right),
            ..mouse
        };
        assert_eq!(controller().handle_mouse(right), None);
    }
}
