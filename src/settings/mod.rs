mod backend;
mod store;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::automation::Shortcut;

pub use backend::{JsonFileBackend, MemoryBackend, SettingsBackend};
pub use store::{SettingsStore, LAST_SIZE_KEY, SETTINGS_KEY, SETTINGS_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAnchor {
    Top,
    Mid,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Grid cell of the floating button relative to the hovered video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ButtonPosition {
    pub vertical: VerticalAnchor,
    pub horizontal: HorizontalAnchor,
}

impl ButtonPosition {
    pub const fn new(vertical: VerticalAnchor, horizontal: HorizontalAnchor) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }
}

impl Default for ButtonPosition {
    fn default() -> Self {
        Self::new(VerticalAnchor::Top, HorizontalAnchor::Right)
    }
}

impl fmt::Display for ButtonPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self.vertical {
            VerticalAnchor::Top => "top",
            VerticalAnchor::Mid => "mid",
            VerticalAnchor::Bot => "bot",
        };
        let h = match self.horizontal {
            HorizontalAnchor::Left => "left",
            HorizontalAnchor::Center => "center",
            HorizontalAnchor::Right => "right",
        };
        write!(f, "{}-{}", v, h)
    }
}

impl FromStr for ButtonPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        let (v, h) = normalized
            .split_once('-')
            .ok_or_else(|| format!("Invalid button position: {}", s))?;

        let vertical = match v {
            "top" => VerticalAnchor::Top,
            "mid" | "middle" => VerticalAnchor::Mid,
            "bot" | "bottom" => VerticalAnchor::Bot,
            _ => return Err(format!("Invalid button position: {}", s)),
        };
        let horizontal = match h {
            "left" => HorizontalAnchor::Left,
            "center" | "centre" | "mid" => HorizontalAnchor::Center,
            "right" => HorizontalAnchor::Right,
            _ => return Err(format!("Invalid button position: {}", s)),
        };
        Ok(Self::new(vertical, horizontal))
    }
}

impl TryFrom<String> for ButtonPosition {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ButtonPosition> for String {
    fn from(value: ButtonPosition) -> Self {
        value.to_string()
    }
}

/// User configuration. Read-only while a session runs; a save replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_pip_enabled: bool,
    pub auto_trigger_delay_ms: u64,
    pub blacklist: Vec<String>,
    pub button_position: ButtonPosition,
    pub min_duration_seconds: f64,
    pub min_width: u32,
    pub min_height: u32,
    pub seek_interval_seconds: u32,
    pub idle_opacity: f64,
    pub shortcut: String,
    pub hide_button_while_active: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_pip_enabled: false,
            auto_trigger_delay_ms: 1000,
            blacklist: Vec::new(),
            button_position: ButtonPosition::default(),
            min_duration_seconds: 10.0,
            min_width: 200,
            min_height: 150,
            seek_interval_seconds: 10,
            idle_opacity: 0.5,
            shortcut: "Alt+P".to_string(),
            hide_button_while_active: false,
        }
    }
}

impl Settings {
    /// Clamp every field into its declared domain.
    pub fn sanitized(mut self) -> Self {
        self.blacklist = parse_blacklist(&self.blacklist.join("\n"));
        self.min_width = self.min_width.max(1);
        self.min_height = self.min_height.max(1);
        self.seek_interval_seconds = self.seek_interval_seconds.max(1);

        if !self.min_duration_seconds.is_finite() || self.min_duration_seconds < 0.0 {
            self.min_duration_seconds = 0.0;
        }
        self.idle_opacity = if self.idle_opacity.is_finite() {
            self.idle_opacity.clamp(0.0, 1.0)
        } else {
            Settings::default().idle_opacity
        };

        let trimmed = self.shortcut.trim().to_string();
        if !trimmed.is_empty() {
            if let Err(e) = trimmed.parse::<Shortcut>() {
                log::warn!("[SETTINGS] Dropping invalid shortcut '{}': {}", trimmed, e);
                self.shortcut = String::new();
            } else {
                self.shortcut = trimmed;
            }
        } else {
            self.shortcut = String::new();
        }
        self
    }

    /// Trimmed, non-empty blacklist entries.
    pub fn blacklist_entries(&self) -> impl Iterator<Item = &str> {
        self.blacklist
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
    }

    /// Newline-separated form used by the settings dialog.
    pub fn blacklist_text(&self) -> String {
        self.blacklist_entries().collect::<Vec<_>>().join("\n")
    }

    /// `None` when no shortcut is configured or it does not parse.
    pub fn parsed_shortcut(&self) -> Option<Shortcut> {
        let raw = self.shortcut.trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse().ok()
    }

    pub fn auto_trigger_delay(&self) -> Duration {
        Duration::from_millis(self.auto_trigger_delay_ms)
    }
}

/// Split newline-separated blacklist text into entries.
pub fn parse_blacklist(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// The current settings snapshot shared by every component.
pub struct SharedSettings {
    current: RwLock<Arc<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Swap in a new snapshot; holders of the old one keep seeing it.
    pub fn replace(&self, settings: Settings) -> Arc<Settings> {
        let next = Arc::new(settings);
        match self.current.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => {
                log::warn!("[SETTINGS] Recovering from poisoned settings lock");
                std::mem::replace(&mut *poisoned.into_inner(), next)
            }
        }
    }
}
