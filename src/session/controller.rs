use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::EventSender;
use crate::error::{absorb, best_effort, Capability, PipError};
use crate::host::{
    Notifier, Overlay, PageHost, PipCapability, PipSurface, SurfaceSize, VideoHandle, VideoId,
};
use crate::media::MediaControlSync;
use crate::session::bindings::SessionBindings;
use crate::session::size_memory::SizeMemory;
use crate::settings::Settings;
use crate::state::{PipState, Session, UnifiedSessionState};
use crate::utils::logger::{log_event, LogEvent, SessionPhase};

const NOTICE_DURATION_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipOutcome {
    Entered(VideoId),
    Exited(VideoId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Re-request on the video that is already floating
    Toggle,
    Ended,
    BecameVisible,
    Shutdown,
}

/// The only component allowed to start or stop a PiP session.
pub struct SessionController {
    state: UnifiedSessionState,
    pip: Arc<dyn PipCapability>,
    page: Arc<dyn PageHost>,
    media: MediaControlSync,
    size_memory: Arc<SizeMemory>,
    notifier: Arc<dyn Notifier>,
    overlay: Arc<dyn Overlay>,
    events: EventSender,
    bindings: Mutex<SessionBindings>,
}

impl SessionController {
    pub fn new(
        pip: Arc<dyn PipCapability>,
        page: Arc<dyn PageHost>,
        media: MediaControlSync,
        size_memory: Arc<SizeMemory>,
        notifier: Arc<dyn Notifier>,
        overlay: Arc<dyn Overlay>,
        events: EventSender,
    ) -> Self {
        Self {
            state: UnifiedSessionState::new(),
            pip,
            page,
            media,
            size_memory,
            notifier,
            overlay,
            events,
            bindings: Mutex::new(SessionBindings::new()),
        }
    }

    /// Enter PiP for `video`, or leave it if `video` is already floating.
    ///
    /// Requesting a different video while a session is active replaces the
    /// session. A request while another one is still in flight is rejected.
    pub async fn request_pip(
        &self,
        video: &VideoHandle,
        settings: Arc<Settings>,
    ) -> Result<PipOutcome, PipError> {
        let id = video.id();
        if !video.is_connected() {
            log::debug!("[PIP] Ignoring request for detached {}", id);
            self.abandon(id);
            return Err(PipError::StaleReference);
        }

        if self.state.is_in_flight() {
            let reason = format!("{:?} request already in flight", self.state.current());
            log_event(LogEvent::Session {
                video: Some(id),
                phase: SessionPhase::Rejected {
                    reason: reason.clone(),
                },
            });
            return Err(PipError::policy(reason));
        }

        let (state, active) = self.state.with_session(|state, session| (state, session.target));
        match state {
            PipState::Active if active == Some(id) => {
                return self.request_exit(ExitReason::Toggle).await;
            }
            PipState::Idle if self.pip.active_video() == Some(id) => {
                // Floating without a session of ours (entered through native controls)
                absorb(Capability::Pip, "request exit", self.pip.request_exit().await)?;
                return Ok(PipOutcome::Exited(id));
            }
            _ => {}
        }

        if !self.pip.is_enabled() {
            let err = PipError::Unavailable("picture-in-picture is disabled here".to_string());
            self.report(Some(id), &err);
            return Err(err);
        }

        let mut replaced = None;
        self.state
            .transition_with(PipState::Entering, |session| {
                replaced = Some(std::mem::replace(
                    session,
                    Session::begin(video, Arc::clone(&settings)),
                ));
            })
            .map_err(|e| PipError::policy(e.to_string()))?;
        let previous = replaced.filter(|old| old.target.is_some());
        if let Some(old) = &previous {
            self.release(old);
        }
        log_event(LogEvent::Session {
            video: Some(id),
            phase: SessionPhase::Entering,
        });

        best_effort(
            Capability::Element,
            "clear disablePictureInPicture",
            video.clear_pip_disabled(),
        );
        self.pause_others(id);

        match self.pip.request_entry(Arc::clone(video)).await {
            Ok(surface) => self.complete_entry(video, surface, &settings).await,
            Err(e) => {
                let err = match absorb(Capability::Pip, "request entry", Err::<(), _>(e)) {
                    Err(err) => err,
                    Ok(()) => PipError::StaleReference,
                };
                match previous {
                    Some(old) if self.still_floating(&old) => self.restore(old),
                    _ => self.abandon(id),
                }
                self.report(Some(id), &err);
                Err(err)
            }
        }
    }

    /// Leave PiP for the active session.
    pub async fn request_exit(&self, reason: ExitReason) -> Result<PipOutcome, PipError> {
        let target = self.state.with_session(|_, session| session.target);
        self.state
            .transition_to(PipState::Exiting)
            .map_err(|_| PipError::policy("no active session to exit"))?;
        log::info!("[PIP] Exit requested ({:?})", reason);
        log_event(LogEvent::Session {
            video: target,
            phase: SessionPhase::Exiting,
        });

        match absorb(Capability::Pip, "request exit", self.pip.request_exit().await) {
            Err(err) if target.is_some() && self.pip.active_video() == target => {
                // The surface is still up; the session goes on
                if self.state.transition_to(PipState::Active).is_err() {
                    self.teardown();
                }
                Err(err)
            }
            _ => {
                let exited = self.teardown().or(target);
                exited
                    .map(PipOutcome::Exited)
                    .ok_or(PipError::StaleReference)
            }
        }
    }

    /// The native layer closed the surface on its own.
    pub fn on_native_leave(&self, video: VideoId) -> bool {
        let (state, target) = self.state.with_session(|state, session| (state, session.target));
        if state != PipState::Active || target != Some(video) {
            return false;
        }
        if self.state.transition_to(PipState::Exiting).is_err() {
            return false;
        }
        log_event(LogEvent::Session {
            video: Some(video),
            phase: SessionPhase::Exiting,
        });
        self.teardown();
        true
    }

    /// The active video played to the end.
    pub async fn on_video_ended(&self, video: VideoId) -> Option<Result<PipOutcome, PipError>> {
        let active = self.state.with_session(|state, session| {
            state == PipState::Active && session.target == Some(video)
        });
        if !active {
            return None;
        }
        Some(self.request_exit(ExitReason::Ended).await)
    }

    /// Drop the session if its video left the document.
    pub fn reconcile(&self) -> bool {
        let orphaned = self.state.with_session(|state, session| {
            state != PipState::Idle && session.target.is_some() && session.live_video().is_none()
        });
        if orphaned {
            log::info!("[PIP] Active video left the document");
            self.teardown();
        }
        orphaned
    }

    pub async fn shutdown(&self) {
        if self.is_active() {
            let _ = self.request_exit(ExitReason::Shutdown).await;
        }
        if self.state() != PipState::Idle {
            self.teardown();
        }
    }

    pub fn state(&self) -> PipState {
        self.state.current()
    }

    pub fn is_active(&self) -> bool {
        self.state() == PipState::Active
    }

    pub fn active_video_id(&self) -> Option<VideoId> {
        self.state.with_session(|state, session| {
            if state == PipState::Active {
                session.target
            } else {
                None
            }
        })
    }

    pub fn active_surface_size(&self) -> Option<SurfaceSize> {
        self.state
            .with_session(|_, session| session.surface.as_ref().map(|surface| surface.size()))
    }

    pub fn exit_callback_target(&self) -> Option<VideoId> {
        self.bindings().exit_callback_target()
    }

    pub fn exit_callbacks(&self) -> usize {
        self.bindings().exit_callbacks()
    }

    pub fn bound_listener_count(&self) -> usize {
        self.bindings().listener_count()
    }

    pub fn last_known_size(&self) -> Option<SurfaceSize> {
        self.size_memory.last()
    }

    pub fn media(&self) -> &MediaControlSync {
        &self.media
    }

    async fn complete_entry(
        &self,
        video: &VideoHandle,
        surface: Arc<dyn PipSurface>,
        settings: &Settings,
    ) -> Result<PipOutcome, PipError> {
        let id = video.id();
        let still_ours = self.state.with_session(|state, session| {
            state == PipState::Entering && session.target == Some(id)
        });
        if !still_ours || !video.is_connected() {
            log::debug!("[PIP] {} went stale while entering", id);
            best_effort(Capability::Pip, "exit stale surface", self.pip.request_exit().await);
            self.abandon(id);
            return Err(PipError::StaleReference);
        }

        let stored = Arc::clone(&surface);
        self.state
            .transition_with(PipState::Active, |session| session.surface = Some(stored))
            .map_err(|e| PipError::policy(e.to_string()))?;

        self.bind_session(video, &surface, settings);
        Ok(PipOutcome::Entered(id))
    }

    /// Install the exit callback, resize memory and media controls for an Active session.
    fn bind_session(&self, video: &VideoHandle, surface: &Arc<dyn PipSurface>, settings: &Settings) {
        {
            let mut bindings = self.bindings();
            bindings.bind_exit_callback(video, &self.events);
            let memory = Arc::clone(&self.size_memory);
            let state = self.state.clone();
            bindings.bind_resize(
                surface,
                Arc::new(move |size| {
                    if state.current() == PipState::Active {
                        memory.record(size);
                    }
                }),
            );
        }
        self.media.attach(video, settings.seek_interval_seconds);
        self.overlay
            .set_session_active(true, settings.hide_button_while_active);

        log_event(LogEvent::Session {
            video: Some(video.id()),
            phase: SessionPhase::Active,
        });
    }

    /// Whether a replaced session's video is still the one in the native surface.
    fn still_floating(&self, old: &Session) -> bool {
        old.target.is_some()
            && old.surface.is_some()
            && old.live_video().is_some()
            && self.pip.active_video() == old.target
    }

    /// Take back a session whose replacement was refused.
    fn restore(&self, old: Session) {
        let (Some(video), Some(surface), Some(settings)) =
            (old.live_video(), old.surface.clone(), old.settings.clone())
        else {
            self.teardown();
            return;
        };
        log::info!("[PIP] Replacement refused, keeping {} floating", video.id());
        if self
            .state
            .transition_with(PipState::Active, |session| *session = old)
            .is_err()
        {
            self.teardown();
            return;
        }
        self.bind_session(&video, &surface, &settings);
    }

    /// Pause every other playing video before the entry request goes out.
    fn pause_others(&self, target: VideoId) {
        for other in self.page.media_elements() {
            if other.id() != target && other.is_connected() && other.is_playing() {
                log::debug!("[PIP] Pausing {}", other.id());
                best_effort(Capability::Element, "pause other video", other.pause());
            }
        }
    }

    /// Return to Idle if the session still targets `video`.
    fn abandon(&self, video: VideoId) {
        let ours = self.state.with_session(|_, session| session.target == Some(video));
        if ours {
            self.teardown();
        }
    }

    fn teardown(&self) -> Option<VideoId> {
        let session = self.state.finish();
        self.release(&session)
    }

    /// Undo everything a session installed.
    fn release(&self, session: &Session) -> Option<VideoId> {
        self.bindings().unbind_all();
        self.media.detach();
        self.overlay.set_session_active(false, false);
        log_event(LogEvent::Session {
            video: session.target,
            phase: SessionPhase::Idle,
        });
        session.target
    }

    fn report(&self, video: Option<VideoId>, err: &PipError) {
        log_event(LogEvent::Session {
            video,
            phase: SessionPhase::Rejected {
                reason: err.to_string(),
            },
        });
        if err.is_user_visible() {
            self.notifier.notify(&err.to_string(), NOTICE_DURATION_MS);
        }
    }

    fn bindings(&self) -> MutexGuard<'_, SessionBindings> {
        match self.bindings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Recovering from poisoned mutex in SessionBindings");
                poisoned.into_inner()
            }
        }
    }
}
