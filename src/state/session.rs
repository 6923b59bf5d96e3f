use std::sync::Arc;

use serde::Serialize;

use crate::host::{PipSurface, VideoHandle, VideoId, WeakVideo};
use crate::settings::Settings;

/// Lifecycle state of the (single) PiP session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipState {
    #[default]
    Idle,
    Entering,
    Active,
    Exiting,
}

/// Data owned by the current session.
///
/// `video` is set from the entry request until teardown; `surface` only once
/// the native layer has acknowledged entry.
#[derive(Default)]
pub struct Session {
    pub target: Option<VideoId>,
    pub video: Option<WeakVideo>,
    pub surface: Option<Arc<dyn PipSurface>>,
    pub settings: Option<Arc<Settings>>,
}

impl Session {
    pub fn begin(video: &VideoHandle, settings: Arc<Settings>) -> Self {
        Self {
            target: Some(video.id()),
            video: Some(Arc::downgrade(video)),
            surface: None,
            settings: Some(settings),
        }
    }

    /// The session's video while it is still attached to the page.
    pub fn live_video(&self) -> Option<VideoHandle> {
        self.video
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .filter(|video| video.is_connected())
    }
}
