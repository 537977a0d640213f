use crate::tui::action::Action;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Maps KeyEvents to Actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(rename = "bindings")]
    bindings_list: Vec<KeyBinding>,

    #[serde(skip)]
    bindings_map: HashMap<KeyPattern, Action>,
}

/// Single keybinding entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: String,
    pub action: Action,
}

impl KeyBinding {
    pub fn new(key: &str, action: Action) -> Self {
        Self {
            key: key.to_string(),
            action,
        }
    }
}

/// Normalised key: characters carry their case, so Shift is dropped for them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_list(vec![
            KeyBinding::new("Up", Action::MoveUp),
            KeyBinding::new("Down", Action::MoveDown),
            KeyBinding::new("k", Action::MoveUp),
            KeyBinding::new("j", Action::MoveDown),
            KeyBinding::new("Tab", Action::NextField),
            KeyBinding::new("BackTab", Action::PrevField),
            KeyBinding::new("Right", Action::NextChoice),
            KeyBinding::new("Left", Action::PrevChoice),
            KeyBinding::new("Space", Action::ToggleChoice),
            KeyBinding::new("Enter", Action::Confirm),
            KeyBinding::new("Esc", Action::Cancel),
            KeyBinding::new("a", Action::AddFilter),
            KeyBinding::new("Ctrl+n", Action::AddFilter),
            KeyBinding::new("d", Action::RemoveFilter),
            KeyBinding::new("Delete", Action::RemoveFilter),
            KeyBinding::new("Ctrl+e", Action::ToggleEditMode),
            KeyBinding::new("Ctrl+x", Action::ToggleExpanded),
            KeyBinding::new("Ctrl+g", Action::ToggleHaving),
            KeyBinding::new("Ctrl+r", Action::RefreshChoices),
            KeyBinding::new("?", Action::ToggleHelp),
            KeyBinding::new("F1", Action::ToggleHelp),
            KeyBinding::new("q", Action::Quit),
            KeyBinding::new("Ctrl+q", Action::Quit),
        ])
    }
}

impl KeyBindings {
    pub fn from_list(bindings_list: Vec<KeyBinding>) -> Self {
        let bindings_map = Self::build_map(&bindings_list);
        Self {
            bindings_list,
            bindings_map,
        }
    }

    /// Defaults with `overrides` taking precedence for the keys they name
    pub fn with_overrides(overrides: &[KeyBinding]) -> Self {
        let mut list = Self::default().bindings_list;
        for binding in overrides {
            list.retain(|b| b.key != binding.key);
            list.push(binding.clone());
        }
        Self::from_list(list)
    }

    fn build_map(bindings: &[KeyBinding]) -> HashMap<KeyPattern, Action> {
        bindings
            .iter()
            .filter_map(|b| KeyPattern::parse(&b.key).ok().map(|p| (p, b.action)))
            .collect()
    }

    pub fn get_action(&self, key: &KeyEvent) -> Option<Action> {
        self.bindings_map.get(&KeyPattern::from_event(key)).copied()
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings_list
    }

    /// Keys bound to `action`, for the help overlay
    pub fn keys_for(&self, action: Action) -> Vec<String> {
        self.bindings_list
            .iter()
            .filter(|b| b.action == action)
            .map(|b| b.key.clone())
            .collect()
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let bindings: KeyBindings = serde_json::from_str(&content)?;
        Ok(Self::from_list(bindings.bindings_list))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Duplicate keys, unparsable keys and unbound actions
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen: HashMap<&str, Action> = HashMap::new();
        for binding in &self.bindings_list {
            if let Some(existing) = seen.insert(binding.key.as_str(), binding.action) {
                warnings.push(format!(
                    "Duplicate key '{}': bound to both {:?} and {:?}",
                    binding.key, existing, binding.action
                ));
            }
            if let Err(e) = KeyPattern::parse(&binding.key) {
                warnings.push(format!("Invalid key pattern '{}': {e}", binding.key));
            }
        }

        let bound: HashSet<Action> = self.bindings_list.iter().map(|b| b.action).collect();
        let unbound: Vec<String> = Action::all()
            .into_iter()
            .filter(|a| !bound.contains(a))
            .map(|a| format!("{a:?}"))
            .collect();
        if !unbound.is_empty() {
            warnings.push(format!("Unbound action(s): {}", unbound.join(", ")));
        }
        warnings
    }
}

impl KeyPattern {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }.normalized()
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }

    fn normalized(mut self) -> Self {
        if matches!(self.code, KeyCode::Char(_) | KeyCode::BackTab) {
            self.modifiers.remove(KeyModifiers::SHIFT);
        }
        self
    }

    /// Parse "Ctrl+r", "BackTab", "F1", "?" and the like
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut modifiers = KeyModifiers::empty();
        let mut parts: Vec<&str> = s.split('+').collect();
        // A bare "+" or a trailing "+" names the plus key itself
        let key = match parts.pop() {
            Some("") if s.ends_with('+') => {
                parts.pop();
                "+"
            }
            Some(key) => key,
            None => return Err("empty key".to_string()),
        };
        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                other => return Err(format!("Unknown modifier: {other}")),
            }
        }

        let mut chars = key.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(c), None) => KeyCode::Char(c),
            _ => match key.to_ascii_lowercase().as_str() {
                "up" => KeyCode::Up,
                "down" => KeyCode::Down,
                "left" => KeyCode::Left,
                "right" => KeyCode::Right,
                "home" => KeyCode::Home,
                "end" => KeyCode::End,
                "tab" => KeyCode::Tab,
                "backtab" => KeyCode::BackTab,
                "enter" | "return" => KeyCode::Enter,
                "esc" | "escape" => KeyCode::Esc,
                "backspace" => KeyCode::Backspace,
                "delete" | "del" => KeyCode::Delete,
                "space" => KeyCode::Char(' '),
                f if f.starts_with('f') => match f[1..].parse::<u8>() {
                    Ok(n) if (1..=12).contains(&n) => KeyCode::F(n),
                    _ => return Err(format!("Invalid function key: {key}")),
                },
                _ => return Err(format!("Unknown key: {key}")),
            },
        };
        Ok(Self::new(code, modifiers))
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            write!(f, "Alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            write!(f, "Shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "F{n}"),
            KeyCode::BackTab => write!(f, "Shift+Tab"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pattern_parsing() {
        assert_eq!(
            KeyPattern::parse("Ctrl+r").unwrap(),
            KeyPattern::new(KeyCode::Char('r'), KeyModifiers::CONTROL)
        );
        assert_eq!(KeyPattern::parse("F1").unwrap().code, KeyCode::F(1));
        assert_eq!(KeyPattern::parse("Space").unwrap().code, KeyCode::Char(' '));
        assert_eq!(KeyPattern::parse("+").unwrap().code, KeyCode::Char('+'));
        assert!(KeyPattern::parse("Hyper+x").is_err());
        assert!(KeyPattern::parse("F13").is_err());
    }

    #[test]
    fn test_shifted_events_match_plain_patterns() {
        let bindings = KeyBindings::default();
        let question = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        let backtab = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);

        assert_eq!(bindings.get_action(&question), Some(Action::ToggleHelp));
        assert_eq!(bindings.get_action(&backtab), Some(Action::PrevField));
    }

    #[test]
    fn test_default_bindings_are_valid_and_complete() {
        let warnings = KeyBindings::default().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_overrides_replace_same_key() {
        let bindings = KeyBindings::with_overrides(&[KeyBinding::new("q", Action::Cancel)]);
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(bindings.get_action(&q), Some(Action::Cancel));
        assert_eq!(bindings.keys_for(Action::Quit), vec!["Ctrl+q".to_string()]);
    }

    #[test]
    fn test_save_and_load() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keys").join("keybindings.json");

        let bindings = KeyBindings::default();
        bindings.save_to_file(&path).unwrap();

        let loaded = KeyBindings::load_from_file(&path).unwrap();
        assert_eq!(loaded.bindings(), bindings.bindings());
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(loaded.get_action(&ctrl_r), Some(Action::RefreshChoices));
    }
}
