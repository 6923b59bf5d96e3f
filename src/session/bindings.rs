use std::sync::Arc;

use crate::engine::{EventSender, HostEvent};
use crate::error::{best_effort, Capability};
use crate::host::{
    Listener, ListenerId, PipSurface, ResizeListener, VideoEventKind, VideoHandle, VideoId,
    WeakVideo,
};

/// Events on the active video that end the session.
const EXIT_EVENTS: [VideoEventKind; 2] = [
    VideoEventKind::Ended,
    VideoEventKind::LeavePictureInPicture,
];

struct ExitBinding {
    video_id: VideoId,
    video: WeakVideo,
    listeners: Vec<ListenerId>,
}

struct ResizeBinding {
    surface: Arc<dyn PipSurface>,
    listener: ListenerId,
}

/// Per-session listeners: the exit callback on the active video and the
/// resize listener on the native surface.
///
/// At most one exit callback exists at a time.
#[derive(Default)]
pub struct SessionBindings {
    exit: Option<ExitBinding>,
    resize: Option<ResizeBinding>,
}

impl SessionBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `video`'s end-of-session events, unbinding any previous video first.
    pub fn bind_exit_callback(&mut self, video: &VideoHandle, events: &EventSender) -> bool {
        self.unbind_exit_callback();

        let video_id = video.id();
        let mut listeners = Vec::with_capacity(EXIT_EVENTS.len());
        for kind in EXIT_EVENTS {
            let events = events.clone();
            let listener: Listener = Arc::new(move |kind| {
                let _ = events.send(HostEvent::Video {
                    video: video_id,
                    kind,
                });
            });
            if let Some(id) = best_effort(
                Capability::Element,
                "bind exit callback",
                video.add_listener(kind, listener),
            ) {
                listeners.push(id);
            }
        }

        if listeners.is_empty() {
            return false;
        }
        log::debug!("[PIP] Exit callback bound to {}", video_id);
        self.exit = Some(ExitBinding {
            video_id,
            video: Arc::downgrade(video),
            listeners,
        });
        true
    }

    pub fn unbind_exit_callback(&mut self) -> Option<VideoId> {
        let binding = self.exit.take()?;
        if let Some(video) = binding.video.upgrade() {
            for id in binding.listeners {
                video.remove_listener(id);
            }
        }
        log::debug!("[PIP] Exit callback unbound from {}", binding.video_id);
        Some(binding.video_id)
    }

    pub fn bind_resize(&mut self, surface: &Arc<dyn PipSurface>, listener: ResizeListener) -> bool {
        self.unbind_resize();
        match best_effort(
            Capability::Pip,
            "bind resize listener",
            surface.add_resize_listener(listener),
        ) {
            Some(id) => {
                self.resize = Some(ResizeBinding {
                    surface: Arc::clone(surface),
                    listener: id,
                });
                true
            }
            None => false,
        }
    }

    pub fn unbind_resize(&mut self) {
        if let Some(binding) = self.resize.take() {
            binding.surface.remove_resize_listener(binding.listener);
        }
    }

    pub fn unbind_all(&mut self) {
        self.unbind_exit_callback();
        self.unbind_resize();
    }

    pub fn exit_callback_target(&self) -> Option<VideoId> {
        self.exit.as_ref().map(|binding| binding.video_id)
    }

    /// Number of bound exit callbacks (0 or 1).
    pub fn exit_callbacks(&self) -> usize {
        usize::from(self.exit.is_some())
    }

    /// Every individual listener currently installed for the session.
    pub fn listener_count(&self) -> usize {
        self.exit.as_ref().map_or(0, |b| b.listeners.len()) + usize::from(self.resize.is_some())
    }
}
