use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::{EventSender, HostEvent};
use crate::error::{best_effort, Capability};
use crate::host::{
    Listener, ListenerId, VideoEventKind, VideoHandle, VideoId, VideoSource, WeakVideo,
};

/// Events observed on every registered video for hover feedback.
const OBSERVED_EVENTS: [VideoEventKind; 3] = [
    VideoEventKind::PointerEnter,
    VideoEventKind::PointerLeave,
    VideoEventKind::Play,
];

struct RegisteredVideo {
    video: WeakVideo,
    listeners: Vec<ListenerId>,
}

/// Videos already instrumented on the page, keyed by identity.
///
/// Entries hold weak references only. A video the page removed stays in the
/// map until the next [`VideoRegistry::prune`]; lookups skip it.
pub struct VideoRegistry {
    entries: Mutex<HashMap<VideoId, RegisteredVideo>>,
    hovered: Mutex<Option<WeakVideo>>,
    events: EventSender,
}

impl VideoRegistry {
    pub fn new(events: EventSender) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hovered: Mutex::new(None),
            events,
        }
    }

    /// Instrument `video` once. Returns `false` if it was already registered.
    pub fn register(&self, video: &VideoHandle) -> bool {
        let id = video.id();
        let mut entries = self.entries();
        if let Some(existing) = entries.get(&id) {
            if existing.video.upgrade().is_some() {
                return false;
            }
        }

        best_effort(
            Capability::Element,
            "clear disablePictureInPicture",
            video.clear_pip_disabled(),
        );

        let mut listeners = Vec::with_capacity(OBSERVED_EVENTS.len());
        for kind in OBSERVED_EVENTS {
            let events = self.events.clone();
            let listener: Listener = Arc::new(move |kind| {
                let _ = events.send(HostEvent::Video { video: id, kind });
            });
            if let Some(listener_id) = best_effort(
                Capability::Element,
                "attach observer",
                video.add_listener(kind, listener),
            ) {
                listeners.push(listener_id);
            }
        }

        entries.insert(
            id,
            RegisteredVideo {
                video: Arc::downgrade(video),
                listeners,
            },
        );
        log::debug!("[REGISTRY] Registered {}", id);
        true
    }

    /// Register every media element under `root`. Returns how many were new.
    pub fn scan(&self, root: &dyn VideoSource) -> usize {
        let added = root
            .media_elements()
            .iter()
            .filter(|video| self.register(video))
            .count();
        if added > 0 {
            log::debug!("[REGISTRY] Scan found {} new video(s)", added);
        }
        added
    }

    pub fn contains(&self, id: VideoId) -> bool {
        self.entries().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The registered video with `id`, if it is still on the page.
    pub fn get(&self, id: VideoId) -> Option<VideoHandle> {
        self.entries()
            .get(&id)
            .and_then(|entry| entry.video.upgrade())
            .filter(|video| video.is_connected())
    }

    /// Every registered video still attached to the page, in id order.
    pub fn live_videos(&self) -> Vec<VideoHandle> {
        let mut videos: Vec<VideoHandle> = self
            .entries()
            .values()
            .filter_map(|entry| entry.video.upgrade())
            .filter(|video| video.is_connected())
            .collect();
        videos.sort_by_key(|video| video.id());
        videos
    }

    /// Forget entries whose element was dropped or detached.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| match entry.video.upgrade() {
            Some(video) if video.is_connected() => true,
            Some(video) => {
                for id in entry.listeners.drain(..) {
                    video.remove_listener(id);
                }
                false
            }
            None => false,
        });
        before - entries.len()
    }

    pub fn set_hovered(&self, video: &VideoHandle) {
        *self.hovered_slot() = Some(Arc::downgrade(video));
    }

    /// Clear the hover if it still points at `id`.
    pub fn clear_hovered(&self, id: VideoId) {
        let mut slot = self.hovered_slot();
        let matches = slot
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .map_or(true, |video| video.id() == id);
        if matches {
            *slot = None;
        }
    }

    pub fn hovered(&self) -> Option<VideoHandle> {
        self.hovered_slot()
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .filter(|video| video.is_connected())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<VideoId, RegisteredVideo>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn hovered_slot(&self) -> MutexGuard<'_, Option<WeakVideo>> {
        match self.hovered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
