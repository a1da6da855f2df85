//! Keyboard bindings configuration.

use crate::model::key_action::KeyAction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

/// Maps keyboard events to domain actions.
///
/// Provides default vim-style bindings. Character keys are matched without
/// the SHIFT modifier, since terminals disagree on reporting it for `G`.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<KeyEvent, KeyAction>,
}

impl KeyBindings {
    /// No bindings at all.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Look up the action for a key event.
    pub fn get(&self, key: KeyEvent) -> Option<KeyAction> {
        self.bindings.get(&normalize(key)).copied()
    }

    /// Bind `key` to `action`, replacing any previous binding.
    pub fn bind(&mut self, key: KeyEvent, action: KeyAction) {
        self.bindings.insert(normalize(key), action);
    }

    /// Every key bound to `action`, for the help overlay.
    pub fn keys_for(&self, action: KeyAction) -> Vec<KeyEvent> {
        let mut keys: Vec<KeyEvent> = self
            .bindings
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|(k, _)| *k)
            .collect();
        keys.sort_by_key(|k| describe(*k));
        keys
    }
}

fn normalize(key: KeyEvent) -> KeyEvent {
    let mut modifiers = key.modifiers;
    if matches!(key.code, KeyCode::Char(_)) {
        modifiers.remove(KeyModifiers::SHIFT);
    }
    KeyEvent::new(key.code, modifiers)
}

/// Short human-readable name of a key (`j`, `Ctrl+f`, `PgDn`).
pub fn describe(key: KeyEvent) -> String {
    let name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        other => format!("{other:?}"),
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        format!("Ctrl+{name}")
    } else {
        name
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let plain = |c: char| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
        let ctrl = |c: char| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        let code = |c: KeyCode| KeyEvent::new(c, KeyModifiers::NONE);

        let table = [
            // Movement
            (plain('j'), KeyAction::ScrollDown),
            (code(KeyCode::Down), KeyAction::ScrollDown),
            (plain('k'), KeyAction::ScrollUp),
            (code(KeyCode::Up), KeyAction::ScrollUp),
            (ctrl('f'), KeyAction::PageDown),
            (code(KeyCode::PageDown), KeyAction::PageDown),
            (plain(' '), KeyAction::PageDown),
            (ctrl('b'), KeyAction::PageUp),
            (code(KeyCode::PageUp), KeyAction::PageUp),
            (ctrl('d'), KeyAction::HalfPageDown),
            (ctrl('u'), KeyAction::HalfPageUp),
            (plain('g'), KeyAction::ScrollToTop),
            (code(KeyCode::Home), KeyAction::ScrollToTop),
            (plain('G'), KeyAction::ScrollToBottom),
            (code(KeyCode::End), KeyAction::ScrollToBottom),
            // Selection
            (code(KeyCode::Enter), KeyAction::Select),
            (plain('l'), KeyAction::Select),
            (code(KeyCode::Right), KeyAction::Select),
            (code(KeyCode::Backspace), KeyAction::Back),
            (plain('h'), KeyAction::Back),
            (code(KeyCode::Left), KeyAction::Back),
            // Views
            (plain('q'), KeyAction::Close),
            (plain('Q'), KeyAction::Quit),
            (ctrl('c'), KeyAction::Quit),
            (code(KeyCode::Tab), KeyAction::CycleFocus),
            (plain('F'), KeyAction::ToggleFullscreen),
            (plain('S'), KeyAction::SwitchSplit),
            (plain('t'), KeyAction::OpenTree),
            (plain('B'), KeyAction::OpenBranches),
            (plain('T'), KeyAction::OpenTimeline),
            // Search
            (plain('/'), KeyAction::StartSearch),
            (plain('n'), KeyAction::NextMatch),
            (plain('N'), KeyAction::PrevMatch),
            // Diff
            (plain(']'), KeyAction::MoreContext),
            (plain('['), KeyAction::LessContext),
            (plain('w'), KeyAction::ToggleWhitespace),
            (plain('i'), KeyAction::ToggleInvert),
            (plain('J'), KeyAction::NextFile),
            (plain('K'), KeyAction::PrevFile),
            // Blame
            (plain('p'), KeyAction::BlameParent),
            (plain('b'), KeyAction::BlameCommit),
            (plain('c'), KeyAction::BlameBack),
            // Tree / branch
            (plain('I'), KeyAction::ToggleIds),
            (plain('s'), KeyAction::CycleSort),
            // Application
            (plain('?'), KeyAction::Help),
            (ctrl('l'), KeyAction::Redraw),
        ];

        let mut bindings = Self {
            bindings: HashMap::with_capacity(table.len()),
        };
        for (key, action) in table {
            bindings.bind(key, action);
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercase_keys_match_with_or_without_shift() {
        let bindings = KeyBindings::default();
        let shifted = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        let bare = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::NONE);

        assert_eq!(bindings.get(shifted), Some(KeyAction::ScrollToBottom));
        assert_eq!(bindings.get(bare), Some(KeyAction::ScrollToBottom));
    }

    #[test]
    fn control_modifier_is_significant() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.get(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            bindings.get(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)),
            Some(KeyAction::BlameBack)
        );
    }

    #[test]
    fn keys_for_lists_every_binding() {
        let bindings = KeyBindings::default();
        let names: Vec<String> = bindings
            .keys_for(KeyAction::PageDown)
            .into_iter()
            .map(describe)
            .collect();
        assert_eq!(names, vec!["Ctrl+f", "PgDn", "Space"]);
    }

    #[test]
    fn unbound_key_is_none() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.get(KeyEvent::new(KeyCode::F(12), KeyModifiers::NONE)),
            None
        );
    }
}
