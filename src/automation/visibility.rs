use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::automation::AutomationEngine;
use crate::eligibility::{is_blacklisted, is_too_short, meets_thresholds, pick_best_candidate};
use crate::error::PipError;
use crate::host::{VideoHandle, VideoId, WeakVideo};
use crate::session::{ExitReason, PipOutcome};
use crate::settings::Settings;
use crate::state::PipState;
use crate::utils::logger::{log_event, LogEvent, TriggerSource};

/// What the visibility trigger did with one event.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoDecision {
    Disabled,
    Blacklisted,
    NoCandidate,
    TooShort,
    TooSmall,
    SessionBusy,
    Scheduled { video: VideoId, delay: Duration },
    /// Conditions changed before the deferred trigger fired
    Stale,
    Started(VideoId),
    ExitRequested,
    Ignored,
    Failed(PipError),
}

impl AutomationEngine {
    /// React to the page being hidden or shown.
    ///
    /// Hiding schedules a deferred trigger; nothing is cancelled when the page
    /// comes back, the trigger re-checks its conditions when it fires instead.
    pub async fn on_visibility_change(self: &Arc<Self>, hidden: bool) -> AutoDecision {
        let epoch = self.visibility_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let settings = self.settings.snapshot();

        let decision = if hidden {
            self.schedule(settings, epoch)
        } else {
            self.on_visible(&settings).await
        };
        log_event(LogEvent::Trigger {
            source: TriggerSource::Visibility,
            decision: format!("{:?}", decision),
        });
        decision
    }

    async fn on_visible(&self, settings: &Settings) -> AutoDecision {
        if !settings.auto_pip_enabled || !self.controller.is_active() {
            return AutoDecision::Ignored;
        }
        match self.controller.request_exit(ExitReason::BecameVisible).await {
            Ok(_) => AutoDecision::ExitRequested,
            Err(e) => AutoDecision::Failed(e),
        }
    }

    fn schedule(self: &Arc<Self>, settings: Arc<Settings>, epoch: u64) -> AutoDecision {
        if !settings.auto_pip_enabled {
            return AutoDecision::Disabled;
        }
        if is_blacklisted(&self.page.hostname(), &settings) {
            return AutoDecision::Blacklisted;
        }

        let Some(candidate) = self.playing_candidate() else {
            return AutoDecision::NoCandidate;
        };
        if is_too_short(candidate.as_ref(), &settings) {
            return AutoDecision::TooShort;
        }
        if !meets_thresholds(candidate.as_ref(), &settings) {
            return AutoDecision::TooSmall;
        }
        if self.controller.state() != PipState::Idle {
            return AutoDecision::SessionBusy;
        }

        let video = candidate.id();
        let delay = settings.auto_trigger_delay();
        let weak = Arc::downgrade(&candidate);
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire_deferred(weak, epoch, settings).await
        });
        // A superseded trigger is left to run and fail its own re-check
        *self.pending_slot() = Some(handle);

        AutoDecision::Scheduled { video, delay }
    }

    /// The best candidate among playing videos only.
    fn playing_candidate(&self) -> Option<VideoHandle> {
        let playing: Vec<VideoHandle> = self
            .registry
            .live_videos()
            .into_iter()
            .filter(|video| video.is_playing())
            .collect();
        let hovered = self.registry.hovered().filter(|video| video.is_playing());
        pick_best_candidate(&playing, hovered.as_ref(), self.page.viewport())
    }

    async fn fire_deferred(
        &self,
        candidate: WeakVideo,
        epoch: u64,
        settings: Arc<Settings>,
    ) -> AutoDecision {
        let decision = match self.revalidate(&candidate, epoch) {
            Err(decision) => decision,
            Ok(video) => match self.controller.request_pip(&video, settings).await {
                Ok(PipOutcome::Entered(id)) if self.still_hidden(epoch) => AutoDecision::Started(id),
                Ok(PipOutcome::Entered(id)) => {
                    // The page came back while the entry was being acknowledged
                    log::info!("[AUTO] Page visible again before {} was floating", id);
                    match self.controller.request_exit(ExitReason::BecameVisible).await {
                        Ok(_) => AutoDecision::Stale,
                        Err(e) => AutoDecision::Failed(e),
                    }
                }
                Ok(PipOutcome::Exited(_)) => AutoDecision::Ignored,
                Err(e) => AutoDecision::Failed(e),
            },
        };
        log_event(LogEvent::Trigger {
            source: TriggerSource::Deferred,
            decision: format!("{:?}", decision),
        });
        decision
    }

    fn still_hidden(&self, epoch: u64) -> bool {
        self.visibility_epoch.load(Ordering::SeqCst) == epoch && self.page.is_hidden()
    }

    /// Still hidden since scheduling, no session, candidate still playing.
    fn revalidate(&self, candidate: &WeakVideo, epoch: u64) -> Result<VideoHandle, AutoDecision> {
        if !self.still_hidden(epoch) {
            return Err(AutoDecision::Stale);
        }
        if self.controller.state() != PipState::Idle {
            return Err(AutoDecision::SessionBusy);
        }
        candidate
            .upgrade()
            .filter(|video| video.is_connected() && video.is_playing())
            .ok_or(AutoDecision::Stale)
    }
}
