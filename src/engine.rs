//! The single, explicitly constructed PiP engine.
//!
//! Host adapters translate page events into [`HostEvent`]s and push them
//! through [`PipEngine::sender`]. Listener closures installed on media
//! elements post into the same inbox, so every reaction runs one event at a
//! time from [`PipEngine::run`] or [`PipEngine::process_pending`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::automation::{AutomationEngine, KeyEvent};
use crate::eligibility::{is_eligible, pick_best_candidate};
use crate::error::PipError;
use crate::host::{
    MediaSession, Notifier, Overlay, PageHost, PipCapability, SurfaceSize, VideoEventKind,
    VideoId,
};
use crate::media::MediaControlSync;
use crate::registry::VideoRegistry;
use crate::session::{PipOutcome, SessionController, SizeMemory};
use crate::settings::{Settings, SettingsBackend, SettingsStore, SharedSettings};
use crate::state::PipState;
use crate::utils::logger::{log_event, LogEvent, TriggerSource};

#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Media elements may have been added or removed
    DomMutated,
    VisibilityChanged { hidden: bool },
    KeyDown(KeyEvent),
    ButtonClicked { video: VideoId },
    Video { video: VideoId, kind: VideoEventKind },
    SettingsSaved(Settings),
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<HostEvent>;

/// Everything the engine needs from its host.
#[derive(Clone)]
pub struct Capabilities {
    pub page: Arc<dyn PageHost>,
    pub pip: Arc<dyn PipCapability>,
    pub media_session: Arc<dyn MediaSession>,
    pub storage: Arc<dyn SettingsBackend>,
    pub notifier: Arc<dyn Notifier>,
    pub overlay: Arc<dyn Overlay>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: PipState,
    pub active_video: Option<VideoId>,
    pub exit_callback_target: Option<VideoId>,
    pub bound_listeners: usize,
    pub last_known_size: Option<SurfaceSize>,
    pub registered_videos: usize,
    pub auto_pip_enabled: bool,
}

pub struct PipEngine {
    page: Arc<dyn PageHost>,
    overlay: Arc<dyn Overlay>,
    registry: Arc<VideoRegistry>,
    controller: Arc<SessionController>,
    automation: Arc<AutomationEngine>,
    settings: Arc<SharedSettings>,
    store: Arc<SettingsStore>,
    sender: EventSender,
    inbox: AsyncMutex<mpsc::UnboundedReceiver<HostEvent>>,
}

impl PipEngine {
    /// Load settings, instrument the page and wire every component.
    pub fn new(caps: Capabilities) -> Arc<Self> {
        let (sender, inbox) = mpsc::unbounded_channel();

        let store = Arc::new(SettingsStore::new(caps.storage));
        let settings = Arc::new(SharedSettings::new(store.load()));
        let registry = Arc::new(VideoRegistry::new(sender.clone()));

        let controller = Arc::new(SessionController::new(
            caps.pip,
            Arc::clone(&caps.page),
            MediaControlSync::new(caps.media_session, Arc::clone(&caps.page)),
            Arc::new(SizeMemory::new(Arc::clone(&store))),
            caps.notifier,
            Arc::clone(&caps.overlay),
            sender.clone(),
        ));
        let automation = Arc::new(AutomationEngine::new(
            Arc::clone(&controller),
            Arc::clone(&registry),
            Arc::clone(&caps.page),
            Arc::clone(&settings),
        ));

        let found = registry.scan(caps.page.as_ref());
        log::info!(
            "[PIP] Engine ready on {} ({} video(s))",
            caps.page.hostname(),
            found
        );

        Arc::new(Self {
            page: caps.page,
            overlay: caps.overlay,
            registry,
            controller,
            automation,
            settings,
            store,
            sender,
            inbox: AsyncMutex::new(inbox),
        })
    }

    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Process events until [`HostEvent::Shutdown`] arrives or every sender is gone.
    pub async fn run(&self) {
        let mut inbox = self.inbox.lock().await;
        while let Some(event) = inbox.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        log::info!("[PIP] Engine stopped");
    }

    /// Handle every event already queued. Returns how many were processed.
    pub async fn process_pending(&self) -> usize {
        let mut processed = 0;
        loop {
            let next = self.inbox.lock().await.try_recv();
            let Ok(event) = next else {
                break;
            };
            processed += 1;
            if !self.handle_event(event).await {
                break;
            }
        }
        processed
    }

    /// React to one event. Returns `false` once the engine should stop.
    pub async fn handle_event(&self, event: HostEvent) -> bool {
        log::trace!("[PIP] Event {:?}", event);
        match event {
            HostEvent::DomMutated => {
                self.registry.scan(self.page.as_ref());
                self.registry.prune();
                if self.controller.reconcile() {
                    log_event(LogEvent::Trigger {
                        source: TriggerSource::Lifecycle,
                        decision: "session video left the page".to_string(),
                    });
                }
            }
            HostEvent::VisibilityChanged { hidden } => {
                self.automation.on_visibility_change(hidden).await;
            }
            HostEvent::KeyDown(key) => {
                self.automation.on_key_down(&key).await;
            }
            HostEvent::ButtonClicked { video } => {
                let _ = self.click_button(video).await;
            }
            HostEvent::Video { video, kind } => self.on_video_event(video, kind).await,
            HostEvent::SettingsSaved(settings) => {
                let _ = self.save_settings(settings);
            }
            HostEvent::Shutdown => {
                log_event(LogEvent::Trigger {
                    source: TriggerSource::Lifecycle,
                    decision: "shutdown".to_string(),
                });
                self.overlay.hide_button();
                self.controller.shutdown().await;
                return false;
            }
        }
        true
    }

    /// The floating button on `video` was clicked.
    pub async fn click_button(&self, video: VideoId) -> Result<PipOutcome, PipError> {
        let Some(clicked) = self.registry.get(video) else {
            log::debug!("[PIP] Click on unknown or detached {}", video);
            return Err(PipError::StaleReference);
        };
        let target = pick_best_candidate(
            &self.registry.live_videos(),
            Some(&clicked),
            self.page.viewport(),
        )
        .ok_or_else(|| PipError::policy("no candidate video"))?;

        log_event(LogEvent::Trigger {
            source: TriggerSource::Button,
            decision: format!("toggle {}", target.id()),
        });
        self.controller
            .request_pip(&target, self.settings.snapshot())
            .await
    }

    async fn on_video_event(&self, video: VideoId, kind: VideoEventKind) {
        match kind {
            VideoEventKind::PointerEnter => self.on_hover(video),
            VideoEventKind::PointerLeave => {
                self.registry.clear_hovered(video);
                self.overlay.hide_button();
            }
            VideoEventKind::Ended => {
                if let Some(Err(e)) = self.controller.on_video_ended(video).await {
                    log::debug!("[PIP] Exit on end of {} failed: {}", video, e);
                }
            }
            VideoEventKind::LeavePictureInPicture => {
                self.controller.on_native_leave(video);
            }
            VideoEventKind::Play => {
                // Size and duration are often only known once playback starts
                let hovered = self.registry.hovered().map(|v| v.id());
                if hovered == Some(video) {
                    self.on_hover(video);
                }
            }
            _ => {}
        }
    }

    /// Show the button over an eligible hovered video.
    fn on_hover(&self, video: VideoId) {
        let Some(handle) = self.registry.get(video) else {
            return;
        };
        self.registry.set_hovered(&handle);

        let settings = self.settings.snapshot();
        if settings.hide_button_while_active && self.controller.is_active() {
            return;
        }
        if !is_eligible(handle.as_ref(), &settings, self.page.viewport()) {
            log::trace!("[PIP] {} not eligible for the button", video);
            return;
        }
        self.overlay.show_button(
            video,
            handle.rect(),
            settings.button_position,
            settings.idle_opacity,
        );
    }

    /// Replace the in-memory settings without persisting them.
    pub fn apply_settings(&self, settings: Settings) -> Arc<Settings> {
        self.settings.replace(settings.sanitized());
        self.settings.snapshot()
    }

    /// Persist and apply. The new values are applied even when persisting fails.
    pub fn save_settings(&self, settings: Settings) -> Result<Arc<Settings>, PipError> {
        let applied = self.apply_settings(settings);
        self.store.save(&applied)?;
        Ok(applied)
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.snapshot()
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub fn automation(&self) -> &Arc<AutomationEngine> {
        &self.automation
    }

    pub fn registry(&self) -> &Arc<VideoRegistry> {
        &self.registry
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.controller.state(),
            active_video: self.controller.active_video_id(),
            exit_callback_target: self.controller.exit_callback_target(),
            bound_listeners: self.controller.bound_listener_count(),
            last_known_size: self.controller.last_known_size(),
            registered_videos: self.registry.len(),
            auto_pip_enabled: self.settings.snapshot().auto_pip_enabled,
        }
    }
}
