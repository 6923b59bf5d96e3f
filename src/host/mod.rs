//! Capabilities supplied by the embedding page.
//!
//! The crate never touches a real document. A host shell implements these
//! traits over whatever it has (a webview bridge, a wasm binding, a test
//! double) and hands them to [`crate::PipEngine`].

mod element;
mod media_session;
mod page;
mod pip;

pub use element::{
    known_duration, IntrinsicSize, Listener, ListenerId, MediaElement, MetadataHint, Rect,
    VideoEventKind, VideoHandle, VideoId, Viewport, WeakVideo,
};
pub use media_session::{
    ActionDetails, ActionHandler, MediaAction, MediaMetadata, MediaSession, PlaybackState,
    PositionState,
};
pub use page::{NoopOverlay, Notifier, Overlay, PageHost, VideoSource};
pub use pip::{PipCapability, PipSurface, ResizeListener, SurfaceSize};

#[cfg(test)]
pub use page::MockNotifier;
