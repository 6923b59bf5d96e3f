use std::time::Duration;

use tokio::time::Instant;

use crate::automation::shortcut::KeyEvent;
use crate::automation::AutomationEngine;
use crate::eligibility::pick_best_candidate;
use crate::error::PipError;
use crate::session::PipOutcome;
use crate::utils::logger::{log_event, LogEvent, TriggerSource};

/// Presses closer together than this are dropped.
pub const SHORTCUT_THROTTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq)]
pub enum ShortcutDecision {
    NotConfigured,
    NoMatch,
    Throttled,
    NoCandidate,
    Requested(Result<PipOutcome, PipError>),
}

impl AutomationEngine {
    /// Handle one key-down from the page.
    ///
    /// The blacklist does not apply here: the shortcut is an explicit user action.
    pub async fn on_key_down(&self, event: &KeyEvent) -> ShortcutDecision {
        let settings = self.settings.snapshot();
        let Some(shortcut) = settings.parsed_shortcut() else {
            return ShortcutDecision::NotConfigured;
        };
        if !shortcut.matches(event) {
            return ShortcutDecision::NoMatch;
        }
        if event.repeat || self.should_throttle() {
            log::debug!("[AUTO] Throttling shortcut press (too fast)");
            return ShortcutDecision::Throttled;
        }

        let videos = self.registry.live_videos();
        let hovered = self.registry.hovered();
        let Some(target) = pick_best_candidate(&videos, hovered.as_ref(), self.page.viewport())
        else {
            log::debug!("[AUTO] Shortcut pressed with no candidate video");
            return ShortcutDecision::NoCandidate;
        };

        log_event(LogEvent::Trigger {
            source: TriggerSource::Shortcut,
            decision: format!("toggle {} via {}", target.id(), shortcut),
        });
        ShortcutDecision::Requested(self.controller.request_pip(&target, settings).await)
    }

    fn should_throttle(&self) -> bool {
        let now = Instant::now();
        match self.last_shortcut.lock() {
            Ok(mut last_press) => {
                if let Some(last) = *last_press {
                    if now.duration_since(last) < SHORTCUT_THROTTLE {
                        return true;
                    }
                }
                *last_press = Some(now);
                false
            }
            Err(e) => {
                log::error!("Failed to lock last_shortcut: {}", e);
                false
            }
        }
    }
}
