use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::host::element::{ListenerId, VideoHandle, VideoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

pub type ResizeListener = Arc<dyn Fn(SurfaceSize) + Send + Sync>;

/// Handle on a floating window the native layer created for us.
pub trait PipSurface: Send + Sync {
    fn size(&self) -> SurfaceSize;
    fn add_resize_listener(&self, listener: ResizeListener) -> Result<ListenerId, HostError>;
    fn remove_resize_listener(&self, id: ListenerId);
}

/// Native picture-in-picture capability.
///
/// Entry and exit resolve asynchronously; the caller must not assume either
/// has happened until the future completes.
#[async_trait]
pub trait PipCapability: Send + Sync {
    fn is_enabled(&self) -> bool;
    /// The element currently shown in the native surface, whoever put it there.
    fn active_video(&self) -> Option<VideoId>;
    async fn request_entry(&self, video: VideoHandle) -> Result<Arc<dyn PipSurface>, HostError>;
    async fn request_exit(&self) -> Result<(), HostError>;
}
