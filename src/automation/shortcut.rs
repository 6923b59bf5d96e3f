use keyboard_types::{Key, Modifiers};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Modifier names accepted in a shortcut string (compared lowercased)
static MODIFIER_ALIASES: Lazy<HashMap<&'static str, Modifiers>> = Lazy::new(|| {
    HashMap::from([
        ("ctrl", Modifiers::CONTROL),
        ("control", Modifiers::CONTROL),
        ("alt", Modifiers::ALT),
        ("option", Modifiers::ALT),
        ("opt", Modifiers::ALT),
        ("shift", Modifiers::SHIFT),
        ("meta", Modifiers::META),
        ("cmd", Modifiers::META),
        ("command", Modifiers::META),
        ("super", Modifiers::META),
        ("win", Modifiers::META),
    ])
});

/// Friendly names that `Key::from_str` does not know
static KEY_ALIASES: Lazy<HashMap<&'static str, Key>> = Lazy::new(|| {
    HashMap::from([
        ("space", Key::Character(" ".to_string())),
        ("spacebar", Key::Character(" ".to_string())),
        ("esc", Key::Escape),
        ("return", Key::Enter),
        ("del", Key::Delete),
        ("up", Key::ArrowUp),
        ("down", Key::ArrowDown),
        ("left", Key::ArrowLeft),
        ("right", Key::ArrowRight),
        ("plus", Key::Character("+".to_string())),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortcutError {
    #[error("shortcut is empty")]
    Empty,
    #[error("shortcut needs a non-modifier key")]
    ModifierOnly,
    #[error("shortcut has more than one trigger key: {0}")]
    MultipleKeys(String),
    #[error("unknown key: {0}")]
    UnknownKey(String),
}

/// One key-down as delivered by the host document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The DOM `key` value (`"p"`, `"P"`, `"F2"`, `"Alt"`, ...)
    pub key: String,
    pub modifiers: Modifiers,
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            repeat: false,
        }
    }
}

/// A parsed key combination such as `Alt+P` or `Ctrl+Shift+F2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    modifiers: Modifiers,
    key: Key,
}

impl Shortcut {
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Exact modifier set plus the trigger key. Modifier presses never match.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let Some(key) = parse_key(&event.key) else {
            return false;
        };
        !is_modifier_key(&key) && key == self.key && event.modifiers == self.modifiers
    }
}

impl FromStr for Shortcut {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ShortcutError::Empty);
        }

        let mut modifiers = Modifiers::empty();
        let mut key: Option<Key> = None;

        for part in split_parts(trimmed) {
            if let Some(modifier) = MODIFIER_ALIASES.get(part.to_lowercase().as_str()) {
                modifiers.insert(*modifier);
                continue;
            }

            let parsed = parse_key(part).ok_or_else(|| ShortcutError::UnknownKey(part.to_string()))?;
            if is_modifier_key(&parsed) {
                return Err(ShortcutError::ModifierOnly);
            }
            if key.is_some() {
                return Err(ShortcutError::MultipleKeys(trimmed.to_string()));
            }
            key = Some(parsed);
        }

        let key = key.ok_or(ShortcutError::ModifierOnly)?;
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::META, "Meta"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{}+", name)?;
            }
        }
        match &self.key {
            Key::Character(c) if c == " " => f.write_str("Space"),
            Key::Character(c) if c == "+" => f.write_str("Plus"),
            Key::Character(c) => f.write_str(&c.to_uppercase()),
            other => write!(f, "{}", other),
        }
    }
}

/// Split on `+`, keeping a literal trailing `+` as the key (`Ctrl++`).
fn split_parts(s: &str) -> Vec<&str> {
    if let Some(head) = s.strip_suffix("++") {
        let mut parts: Vec<&str> = head.split('+').map(str::trim).collect();
        parts.push("+");
        return parts;
    }
    s.split('+').map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Normalize a key name; single characters compare case-insensitively
fn parse_key(raw: &str) -> Option<Key> {
    if raw.is_empty() {
        return None;
    }

    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(Key::Character(c.to_lowercase().collect()));
    }

    let lower = raw.to_lowercase();
    if let Some(alias) = KEY_ALIASES.get(lower.as_str()) {
        return Some(alias.clone());
    }

    // Named keys are case-sensitive in keyboard-types ("F2", "PageUp")
    Key::from_str(raw)
        .ok()
        .or_else(|| Key::from_str(&capitalize(&lower)).ok())
        .filter(|key| !matches!(key, Key::Character(_)))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_modifier_key(key: &Key) -> bool {
    matches!(
        key,
        Key::Alt | Key::AltGraph | Key::Control | Key::Shift | Key::Meta | Key::CapsLock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(key: &str, modifiers: Modifiers) -> KeyEvent {
        KeyEvent::new(key, modifiers)
    }

    #[test]
    fn test_parse_simple_combo() {
        let s: Shortcut = "Alt+P".parse().unwrap();
        assert_eq!(s.modifiers(), Modifiers::ALT);
        assert_eq!(s.key(), &Key::Character("p".into()));
        assert_eq!(s.to_string(), "Alt+P");
    }

    #[test]
    fn test_parse_aliases_case_insensitive() {
        let s: Shortcut = "cmd+SHIFT+space".parse().unwrap();
        assert_eq!(s.modifiers(), Modifiers::META | Modifiers::SHIFT);
        assert_eq!(s.to_string(), "Shift+Meta+Space");

        let s: Shortcut = "ctrl+f2".parse().unwrap();
        assert_eq!(s.key(), &Key::F2);
        let s: Shortcut = "Ctrl++".parse().unwrap();
        assert_eq!(s.key(), &Key::Character("+".into()));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Shortcut>(), Err(ShortcutError::Empty));
        assert_eq!("Ctrl+Shift".parse::<Shortcut>(), Err(ShortcutError::ModifierOnly));
        assert!(matches!(
            "Ctrl+A+B".parse::<Shortcut>(),
            Err(ShortcutError::MultipleKeys(_))
        ));
        assert!(matches!(
            "Ctrl+NotAKey".parse::<Shortcut>(),
            Err(ShortcutError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_single_key_shortcut_is_allowed() {
        let s: Shortcut = "F9".parse().unwrap();
        assert!(s.matches(&ev("F9", Modifiers::empty())));
        assert!(!s.matches(&ev("F9", Modifiers::SHIFT)));
    }

    #[test]
    fn test_matches_case_insensitive_character() {
        let s: Shortcut = "Alt+p".parse().unwrap();
        assert!(s.matches(&ev("p", Modifiers::ALT)));
        assert!(s.matches(&ev("P", Modifiers::ALT)));
        assert!(!s.matches(&ev("o", Modifiers::ALT)));
    }

    #[test]
    fn test_matches_requires_exact_modifiers() {
        let s: Shortcut = "Ctrl+Shift+K".parse().unwrap();
        assert!(s.matches(&ev("K", Modifiers::CONTROL | Modifiers::SHIFT)));
        assert!(!s.matches(&ev("K", Modifiers::CONTROL)));
        assert!(!s.matches(&ev("K", Modifiers::CONTROL | Modifiers::SHIFT | Modifiers::ALT)));
    }

    #[test]
    fn test_modifier_press_never_triggers() {
        let s: Shortcut = "Alt+P".parse().unwrap();
        assert!(!s.matches(&ev("Alt", Modifiers::ALT)));
        assert!(!s.matches(&ev("Shift", Modifiers::ALT | Modifiers::SHIFT)));
        assert!(!s.matches(&ev("", Modifiers::ALT)));
    }
}
