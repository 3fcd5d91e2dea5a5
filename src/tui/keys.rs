//! Focus-aware key bindings

use crate::editor::EditOp;
use crate::focus::{Focus, NavEvent};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks the loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Nav(NavEvent),
}

/// Map a key press to an action for the current focus
///
/// Returns `None` for keys with no binding in that focus and for
/// release/repeat events on terminals that report them.
pub fn map_key(focus: Focus, key: KeyEvent) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c' | 'q')) {
        return Some(KeyAction::Quit);
    }

    let nav = match focus {
        Focus::Input => input_key(key.code, ctrl)?,
        Focus::Scroller => scroller_key(key.code, ctrl)?,
        Focus::CardSelector(_) => selector_key(key.code)?,
    };
    Some(KeyAction::Nav(nav))
}

fn input_key(code: KeyCode, ctrl: bool) -> Option<NavEvent> {
    let op = match code {
        KeyCode::Enter => return Some(NavEvent::Confirm),
        KeyCode::Tab => return Some(NavEvent::Advance),
        KeyCode::Esc => return Some(NavEvent::Cancel),
        KeyCode::Char('u') if ctrl => EditOp::Clear,
        KeyCode::Char('a') if ctrl => EditOp::Home,
        KeyCode::Char('e') if ctrl => EditOp::End,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(c) => EditOp::Insert(c),
        KeyCode::Backspace => EditOp::Backspace,
        KeyCode::Delete => EditOp::Delete,
        KeyCode::Left => EditOp::Left,
        KeyCode::Right => EditOp::Right,
        KeyCode::Home => EditOp::Home,
        KeyCode::End => EditOp::End,
        _ => return None,
    };
    Some(NavEvent::Edit(op))
}

fn scroller_key(code: KeyCode, ctrl: bool) -> Option<NavEvent> {
    Some(match code {
        KeyCode::Char('u') if ctrl => NavEvent::PageUp,
        KeyCode::Char('d') if ctrl => NavEvent::PageDown,
        KeyCode::Tab => NavEvent::Advance,
        KeyCode::Esc => NavEvent::Cancel,
        KeyCode::Enter => NavEvent::Confirm,
        KeyCode::Up | KeyCode::Char('k') => NavEvent::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => NavEvent::MoveDown,
        KeyCode::PageUp => NavEvent::PageUp,
        KeyCode::PageDown => NavEvent::PageDown,
        KeyCode::Home | KeyCode::Char('g') => NavEvent::Home,
        KeyCode::End | KeyCode::Char('G') => NavEvent::End,
        _ => return None,
    })
}

fn selector_key(code: KeyCode) -> Option<NavEvent> {
    Some(match code {
        KeyCode::Tab => NavEvent::Advance,
        KeyCode::Esc => NavEvent::Cancel,
        KeyCode::Enter => NavEvent::Confirm,
        KeyCode::Up | KeyCode::Char('k') => NavEvent::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => NavEvent::MoveDown,
        KeyCode::Home | KeyCode::Char('g') => NavEvent::Home,
        KeyCode::End | KeyCode::Char('G') => NavEvent::End,
        KeyCode::Char(c @ '1'..='9') => {
            let digit = usize::try_from(c.to_digit(10)?).ok()?;
            NavEvent::Jump(digit - 1)
        }
        _ => return None,
    })
}

/// Help line for the current focus
pub fn help_line(focus: Focus) -> &'static str {
    match focus {
        Focus::Input => "Enter: send | Tab: scroll transcript | Ctrl+U: clear | Ctrl+C: quit",
        Focus::Scroller => {
            "j/k: line | PgUp/PgDn: half page | g/G: top/bottom | Tab: select cards | Esc: back"
        }
        Focus::CardSelector(_) => "j/k or 1-9: choose | Enter: details | Tab/Esc: back",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::CardSelection;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn selecting() -> Focus {
        Focus::CardSelector(CardSelection {
            display_item_index: 2,
            card_index: 0,
            total_cards: 3,
        })
    }

    #[test]
    fn test_ctrl_c_quits_from_any_focus() {
        for focus in [Focus::Input, Focus::Scroller, selecting()] {
            assert_eq!(map_key(focus, ctrl('c')), Some(KeyAction::Quit));
        }
    }

    #[test]
    fn test_letters_type_in_input_but_scroll_in_scroller() {
        assert_eq!(
            map_key(Focus::Input, press(KeyCode::Char('j'))),
            Some(KeyAction::Nav(NavEvent::Edit(EditOp::Insert('j'))))
        );
        assert_eq!(
            map_key(Focus::Scroller, press(KeyCode::Char('j'))),
            Some(KeyAction::Nav(NavEvent::MoveDown))
        );
    }

    #[test]
    fn test_digits_jump_only_in_selector() {
        assert_eq!(
            map_key(selecting(), press(KeyCode::Char('3'))),
            Some(KeyAction::Nav(NavEvent::Jump(2)))
        );
        assert_eq!(map_key(selecting(), press(KeyCode::Char('0'))), None);
        assert_eq!(map_key(Focus::Scroller, press(KeyCode::Char('3'))), None);
    }

    #[test]
    fn test_release_events_ignored() {
        let mut key = press(KeyCode::Enter);
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(Focus::Input, key), None);
    }

    #[test]
    fn test_unbound_ctrl_chars_not_typed() {
        assert_eq!(map_key(Focus::Input, ctrl('x')), None);
        assert_eq!(
            map_key(Focus::Input, ctrl('u')),
            Some(KeyAction::Nav(NavEvent::Edit(EditOp::Clear)))
        );
    }
}
