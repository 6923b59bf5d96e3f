use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Stable identity of a media element for as long as it lives on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoId(pub u64);

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video#{}", self.0)
    }
}

/// Rendered rectangle in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn intersects(&self, viewport: Viewport) -> bool {
        self.x < viewport.width
            && self.y < viewport.height
            && self.x + self.width > 0.0
            && self.y + self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Decoded frame size, independent of how large the element is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntrinsicSize {
    pub width: u32,
    pub height: u32,
}

impl IntrinsicSize {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Per-video metadata the page supplied explicitly (data attributes, schema tags).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataHint {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoEventKind {
    PointerEnter,
    PointerLeave,
    Play,
    Pause,
    Ended,
    RateChange,
    TimeUpdate,
    Seeked,
    LeavePictureInPicture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

pub type Listener = Arc<dyn Fn(VideoEventKind) + Send + Sync>;

/// A playable element owned by the page.
///
/// The page may remove it at any moment. Implementations report that through
/// [`MediaElement::is_connected`] and by returning [`HostError::Detached`]
/// from mutating calls; they must never panic on a stale element.
pub trait MediaElement: Send + Sync {
    fn id(&self) -> VideoId;
    fn is_connected(&self) -> bool;
    fn rect(&self) -> Rect;
    fn intrinsic_size(&self) -> IntrinsicSize;
    /// Seconds; `NaN` while unknown, infinite for live streams.
    fn duration(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    fn current_time(&self) -> f64;
    fn playback_rate(&self) -> f64;

    fn play(&self) -> Result<(), HostError>;
    fn pause(&self) -> Result<(), HostError>;
    fn seek(&self, seconds: f64) -> Result<(), HostError>;
    /// Drop a page-imposed `disablePictureInPicture` flag.
    fn clear_pip_disabled(&self) -> Result<(), HostError>;

    fn metadata_hint(&self) -> MetadataHint {
        MetadataHint::default()
    }
    fn poster(&self) -> Option<String> {
        None
    }
    /// Text of the closest caption-like element around the video.
    fn nearest_caption(&self) -> Option<String> {
        None
    }

    fn add_listener(
        &self,
        kind: VideoEventKind,
        listener: Listener,
    ) -> Result<ListenerId, HostError>;
    fn remove_listener(&self, id: ListenerId);

    fn is_playing(&self) -> bool {
        !self.is_paused() && !self.is_ended()
    }
}

pub type VideoHandle = Arc<dyn MediaElement>;
pub type WeakVideo = Weak<dyn MediaElement>;

/// Duration in seconds when it is a finite positive number.
pub fn known_duration(duration: f64) -> Option<f64> {
    if duration.is_finite() && duration > 0.0 {
        Some(duration)
    } else {
        None
    }
}
