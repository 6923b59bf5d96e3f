//! Media-control surface synchronisation for the active PiP video.
//!
//! Installs metadata, transport actions and state mirroring when a session
//! starts and removes every one of them when it ends. Only one video is ever
//! attached; attaching another detaches the previous one first.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{best_effort, Capability};
use crate::host::{
    known_duration, ActionDetails, ActionHandler, Listener, ListenerId, MediaAction, MediaElement,
    MediaSession, PageHost, PlaybackState, PositionState, VideoEventKind, VideoHandle, VideoId,
    WeakVideo,
};
use crate::media::metadata::resolve_metadata;

/// Video events whose effect is mirrored onto the control surface.
const MIRRORED_EVENTS: [VideoEventKind; 5] = [
    VideoEventKind::Play,
    VideoEventKind::Pause,
    VideoEventKind::RateChange,
    VideoEventKind::TimeUpdate,
    VideoEventKind::Seeked,
];

struct Attachment {
    video_id: VideoId,
    video: WeakVideo,
    listeners: Vec<ListenerId>,
    actions: Vec<MediaAction>,
}

pub struct MediaControlSync {
    session: Arc<dyn MediaSession>,
    page: Arc<dyn PageHost>,
    attached: Mutex<Option<Attachment>>,
}

impl MediaControlSync {
    pub fn new(session: Arc<dyn MediaSession>, page: Arc<dyn PageHost>) -> Self {
        Self {
            session,
            page,
            attached: Mutex::new(None),
        }
    }

    /// Project `video` onto the media-control surface.
    pub fn attach(&self, video: &VideoHandle, seek_interval_seconds: u32) {
        self.detach();

        let mut slot = self.slot();
        let video_id = video.id();
        let interval = f64::from(seek_interval_seconds.max(1));

        let metadata = resolve_metadata(video.as_ref(), self.page.as_ref());
        log::debug!("[MEDIA] Attaching {} as '{}'", video_id, metadata.title);
        best_effort(
            Capability::MediaSession,
            "set metadata",
            self.session.set_metadata(Some(metadata)),
        );

        let mut actions = Vec::with_capacity(MediaAction::ALL.len());
        for action in MediaAction::ALL {
            let weak = Arc::downgrade(video);
            let handler: ActionHandler = Arc::new(move |details| {
                if let Some(video) = weak.upgrade() {
                    perform_action(video.as_ref(), details, interval);
                }
            });
            if best_effort(
                Capability::MediaSession,
                "set action handler",
                self.session.set_action_handler(action, Some(handler)),
            )
            .is_some()
            {
                actions.push(action);
            }
        }

        let mut listeners = Vec::with_capacity(MIRRORED_EVENTS.len());
        for kind in MIRRORED_EVENTS {
            let weak = Arc::downgrade(video);
            let session = Arc::clone(&self.session);
            let listener: Listener = Arc::new(move |kind| {
                if let Some(video) = weak.upgrade() {
                    mirror_event(video.as_ref(), session.as_ref(), kind);
                }
            });
            if let Some(id) = best_effort(
                Capability::Element,
                "attach media listener",
                video.add_listener(kind, listener),
            ) {
                listeners.push(id);
            }
        }

        sync_playback_state(video.as_ref(), self.session.as_ref());
        sync_position_state(video.as_ref(), self.session.as_ref());

        *slot = Some(Attachment {
            video_id,
            video: Arc::downgrade(video),
            listeners,
            actions,
        });
    }

    /// Remove everything [`attach`](Self::attach) installed. Returns the video it was attached to.
    pub fn detach(&self) -> Option<VideoId> {
        let attachment = self.slot().take()?;

        for action in &attachment.actions {
            best_effort(
                Capability::MediaSession,
                "clear action handler",
                self.session.set_action_handler(*action, None),
            );
        }
        best_effort(
            Capability::MediaSession,
            "clear metadata",
            self.session.set_metadata(None),
        );
        best_effort(
            Capability::MediaSession,
            "clear playback state",
            self.session.set_playback_state(PlaybackState::None),
        );
        best_effort(
            Capability::MediaSession,
            "clear position state",
            self.session.set_position_state(None),
        );

        if let Some(video) = attachment.video.upgrade() {
            for id in attachment.listeners {
                video.remove_listener(id);
            }
        }

        log::debug!("[MEDIA] Detached {}", attachment.video_id);
        Some(attachment.video_id)
    }

    pub fn attached_video(&self) -> Option<VideoId> {
        self.slot().as_ref().map(|a| a.video_id)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Attachment>> {
        match self.attached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Translate a transport action into operations on the video.
pub fn perform_action(video: &dyn MediaElement, details: ActionDetails, seek_interval: f64) {
    let now = video.current_time();
    let duration = known_duration(video.duration());
    let clamp = |t: f64| {
        let t = t.max(0.0);
        duration.map_or(t, |d| t.min(d))
    };

    let result = match details.action {
        MediaAction::Play => video.play(),
        MediaAction::Pause => video.pause(),
        MediaAction::Stop => video.pause().and_then(|_| video.seek(0.0)),
        MediaAction::SeekBackward | MediaAction::PreviousTrack => {
            video.seek(clamp(now - details.seek_offset.unwrap_or(seek_interval)))
        }
        MediaAction::SeekForward | MediaAction::NextTrack => {
            video.seek(clamp(now + details.seek_offset.unwrap_or(seek_interval)))
        }
        MediaAction::SeekTo => match details.seek_time {
            Some(t) if t.is_finite() => video.seek(clamp(t)),
            _ => Ok(()),
        },
    };
    best_effort(Capability::Element, details.action.as_str(), result);
}

fn mirror_event(video: &dyn MediaElement, session: &dyn MediaSession, kind: VideoEventKind) {
    match kind {
        VideoEventKind::Play | VideoEventKind::Pause => {
            sync_playback_state(video, session);
            sync_position_state(video, session);
        }
        VideoEventKind::RateChange | VideoEventKind::TimeUpdate | VideoEventKind::Seeked => {
            sync_position_state(video, session);
        }
        _ => {}
    }
}

fn sync_playback_state(video: &dyn MediaElement, session: &dyn MediaSession) {
    let state = if video.is_paused() {
        PlaybackState::Paused
    } else {
        PlaybackState::Playing
    };
    best_effort(
        Capability::MediaSession,
        "set playback state",
        session.set_playback_state(state),
    );
}

/// Skipped unless the duration is a finite positive number.
fn sync_position_state(video: &dyn MediaElement, session: &dyn MediaSession) {
    let Some(duration) = known_duration(video.duration()) else {
        return;
    };
    let rate = video.playback_rate();
    if !rate.is_finite() || rate == 0.0 {
        return;
    }
    let position = video.current_time().clamp(0.0, duration);
    log::trace!("[MEDIA] position {:.1}/{:.1} @{}", position, duration, rate);
    best_effort(
        Capability::MediaSession,
        "set position state",
        session.set_position_state(Some(PositionState {
            duration,
            playback_rate: rate,
            position,
        })),
    );
}
