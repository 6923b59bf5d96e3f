use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{absorb, Capability, PipError};
use crate::host::SurfaceSize;
use crate::settings::backend::SettingsBackend;
use crate::settings::{parse_blacklist, ButtonPosition, Settings};
use crate::utils::logger::{log_event, LogEvent, PersistenceStatus};

pub const SETTINGS_KEY: &str = "autopip.settings";
pub const LAST_SIZE_KEY: &str = "autopip.lastPipSize";
pub const SETTINGS_VERSION: u32 = 1;

/// Flat keys written by the pre-envelope settings dialog.
const LEGACY_KEYS: [&str; 11] = [
    "autoPip",
    "autoDelay",
    "blacklist",
    "position",
    "minduration",
    "minwidth",
    "minheight",
    "seek",
    "opacity",
    "shortcut",
    "hidebuttonwhenactive",
];

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsEnvelope {
    version: u32,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    settings: Settings,
}

/// Loads and saves [`Settings`] and the last PiP window size.
///
/// Nothing here is fatal: read failures fall back to defaults, write
/// failures are reported as [`PipError::PersistenceFailure`] and logged.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        Self { backend }
    }

    /// Current settings, or defaults when nothing usable is stored.
    pub fn load(&self) -> Settings {
        match self.load_checked() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("[SETTINGS] Using defaults: {}", e);
                Settings::default()
            }
        }
    }

    pub fn load_checked(&self) -> Result<Settings, PipError> {
        let stored = absorb(
            Capability::Storage,
            "read settings",
            self.backend.read(SETTINGS_KEY),
        )?;

        if let Some(value) = stored {
            let settings = decode_envelope(value)?;
            log_event(LogEvent::Persistence {
                key: SETTINGS_KEY.to_string(),
                status: PersistenceStatus::Loaded,
            });
            return Ok(settings.sanitized());
        }

        match self.load_legacy()? {
            Some(settings) => {
                log::info!("[SETTINGS] Migrating flat settings keys into {}", SETTINGS_KEY);
                if self.save(&settings).is_ok() {
                    for key in LEGACY_KEYS {
                        let _ = absorb(
                            Capability::Storage,
                            "remove legacy key",
                            self.backend.remove(key),
                        );
                    }
                }
                Ok(settings)
            }
            None => Ok(Settings::default()),
        }
    }

    /// Write the whole record in one backend call.
    pub fn save(&self, settings: &Settings) -> Result<(), PipError> {
        let envelope = SettingsEnvelope {
            version: SETTINGS_VERSION,
            saved_at: Some(Utc::now()),
            settings: settings.clone().sanitized(),
        };
        let value = serde_json::to_value(&envelope)
            .map_err(|e| PipError::PersistenceFailure(e.to_string()))?;

        let result = absorb(
            Capability::Storage,
            "write settings",
            self.backend.write(SETTINGS_KEY, value),
        );
        log_event(LogEvent::Persistence {
            key: SETTINGS_KEY.to_string(),
            status: match &result {
                Ok(()) => PersistenceStatus::Saved,
                Err(e) => PersistenceStatus::Failed {
                    error: e.to_string(),
                },
            },
        });
        result
    }

    pub fn load_last_size(&self) -> Option<SurfaceSize> {
        let value = absorb(
            Capability::Storage,
            "read last size",
            self.backend.read(LAST_SIZE_KEY),
        )
        .ok()??;
        match serde_json::from_value::<SurfaceSize>(value) {
            Ok(size) if size.width > 0 && size.height > 0 => Some(size),
            Ok(_) => None,
            Err(e) => {
                log::warn!("[SETTINGS] Ignoring malformed last size: {}", e);
                None
            }
        }
    }

    pub fn save_last_size(&self, size: SurfaceSize) -> Result<(), PipError> {
        absorb(
            Capability::Storage,
            "write last size",
            self.backend.write(
                LAST_SIZE_KEY,
                json!({ "width": size.width, "height": size.height }),
            ),
        )
    }

    fn load_legacy(&self) -> Result<Option<Settings>, PipError> {
        let mut found = false;
        let mut read = |key: &str| -> Result<Option<Value>, PipError> {
            let value = absorb(Capability::Storage, "read legacy key", self.backend.read(key))?;
            found |= value.is_some();
            Ok(value)
        };

        let defaults = Settings::default();
        let settings = Settings {
            auto_pip_enabled: read("autoPip")?
                .and_then(|v| as_bool(&v))
                .unwrap_or(defaults.auto_pip_enabled),
            auto_trigger_delay_ms: read("autoDelay")?
                .and_then(|v| as_f64(&v))
                .filter(|n| *n >= 0.0)
                .map(|n| n as u64)
                .unwrap_or(defaults.auto_trigger_delay_ms),
            blacklist: read("blacklist")?
                .and_then(|v| match v {
                    Value::String(s) => Some(parse_blacklist(&s)),
                    Value::Array(items) => Some(
                        items
                            .iter()
                            .filter_map(|i| i.as_str().map(str::to_string))
                            .collect(),
                    ),
                    _ => None,
                })
                .unwrap_or(defaults.blacklist),
            button_position: read("position")?
                .and_then(|v| v.as_str().and_then(|s| s.parse::<ButtonPosition>().ok()))
                .unwrap_or(defaults.button_position),
            min_duration_seconds: read("minduration")?
                .and_then(|v| as_f64(&v))
                .unwrap_or(defaults.min_duration_seconds),
            min_width: read("minwidth")?
                .and_then(|v| as_f64(&v))
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(defaults.min_width),
            min_height: read("minheight")?
                .and_then(|v| as_f64(&v))
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(defaults.min_height),
            seek_interval_seconds: read("seek")?
                .and_then(|v| as_f64(&v))
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(defaults.seek_interval_seconds),
            idle_opacity: read("opacity")?
                .and_then(|v| as_f64(&v))
                .unwrap_or(defaults.idle_opacity),
            shortcut: read("shortcut")?
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or(defaults.shortcut),
            hide_button_while_active: read("hidebuttonwhenactive")?
                .and_then(|v| as_bool(&v))
                .unwrap_or(defaults.hide_button_while_active),
        };

        Ok(found.then(|| settings.sanitized()))
    }
}

fn decode_envelope(value: Value) -> Result<Settings, PipError> {
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| PipError::PersistenceFailure("Malformed settings: no version".into()))?;
    if version > u64::from(SETTINGS_VERSION) {
        return Err(PipError::PersistenceFailure(format!(
            "Settings version {} is newer than supported {}",
            version, SETTINGS_VERSION
        )));
    }

    let fields = match value.get("settings") {
        Some(Value::Object(fields)) => fields.clone(),
        _ => {
            return Err(PipError::PersistenceFailure(
                "Malformed settings: no settings object".into(),
            ))
        }
    };
    match serde_json::from_value::<SettingsEnvelope>(value) {
        Ok(envelope) => Ok(envelope.settings),
        Err(e) => {
            log::warn!("[SETTINGS] Stored settings partly unreadable: {}", e);
            Ok(decode_fields(fields))
        }
    }
}

/// Keep every stored field that decodes; a bad one falls back to its default.
fn decode_fields(stored: Map<String, Value>) -> Settings {
    let defaults = Settings::default();
    let Ok(Value::Object(mut merged)) = serde_json::to_value(&defaults) else {
        return defaults;
    };
    for (key, value) in stored {
        let mut trial = merged.clone();
        trial.insert(key.clone(), value.clone());
        match serde_json::from_value::<Settings>(Value::Object(trial)) {
            Ok(_) => {
                merged.insert(key, value);
            }
            Err(e) => log::warn!("[SETTINGS] Resetting '{}' to its default: {}", key, e),
        }
    }
    serde_json::from_value(Value::Object(merged)).unwrap_or(defaults)
}

// Legacy values were written by a form, so numbers and booleans may be strings.
fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}
