use serde::Serialize;

use crate::host::VideoId;

/// Structured logging for the PiP engine.
///
/// Session transitions, automatic trigger decisions and persistence results
/// all go through [`log_event`] so they read the same way in a host's
/// console regardless of which module produced them.
///
/// Hot paths (time updates mirrored into the media session, hover feedback)
/// stay at `trace`/`debug` and never go through here.
#[derive(Debug, Clone, Serialize)]
pub enum LogEvent {
    Session {
        #[serde(skip_serializing_if = "Option::is_none")]
        video: Option<VideoId>,
        phase: SessionPhase,
    },
    Trigger {
        source: TriggerSource,
        decision: String,
    },
    Persistence {
        key: String,
        status: PersistenceStatus,
    },
}

#[derive(Debug, Clone, Serialize)]
pub enum SessionPhase {
    Entering,
    Active,
    Exiting,
    Idle,
    Rejected { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerSource {
    Button,
    Shortcut,
    Visibility,
    Deferred,
    Lifecycle,
}

#[derive(Debug, Clone, Serialize)]
pub enum PersistenceStatus {
    Loaded,
    Saved,
    Failed { error: String },
}

pub fn log_event(event: LogEvent) {
    match event {
        LogEvent::Session { video, phase } => {
            let target = video.map(|v| format!(" {}", v)).unwrap_or_default();
            match phase {
                SessionPhase::Entering => log::info!("[PIP] 🚀 ENTERING{}", target),
                SessionPhase::Active => log::info!("[PIP] ✅ ACTIVE{}", target),
                SessionPhase::Exiting => log::info!("[PIP] EXITING{}", target),
                SessionPhase::Idle => log::info!("[PIP] IDLE{}", target),
                SessionPhase::Rejected { reason } => {
                    log::warn!("[PIP] ❌ REJECTED{}: {}", target, reason)
                }
            }
        }
        LogEvent::Trigger { source, decision } => {
            log::info!("[AUTO] {:?} -> {}", source, decision);
        }
        LogEvent::Persistence { key, status } => match status {
            PersistenceStatus::Loaded => log::debug!("[SETTINGS] loaded {}", key),
            PersistenceStatus::Saved => log::info!("[SETTINGS] saved {}", key),
            PersistenceStatus::Failed { error } => {
                log::error!("[SETTINGS] ❌ {} FAILED: {}", key, error)
            }
        },
    }
}

/// Install an `env_logger` honouring `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() -> bool {
    init_logging_with_filter("info")
}

pub fn init_logging_with_filter(default_filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
