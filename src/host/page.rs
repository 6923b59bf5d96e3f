use crate::host::element::{Rect, VideoHandle, VideoId, Viewport};
use crate::settings::ButtonPosition;

/// Anything that can enumerate media elements below it.
pub trait VideoSource: Send + Sync {
    fn media_elements(&self) -> Vec<VideoHandle>;
}

/// The host document.
pub trait PageHost: VideoSource {
    fn hostname(&self) -> String;
    fn title(&self) -> String;
    fn viewport(&self) -> Viewport;
    fn is_hidden(&self) -> bool;
}

/// Transient user-visible notices (toasts).
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, duration_ms: u64);
}

/// The floating PiP button drawn over the page.
pub trait Overlay: Send + Sync {
    fn show_button(&self, video: VideoId, rect: Rect, position: ButtonPosition, idle_opacity: f64);
    fn hide_button(&self);
    fn set_session_active(&self, active: bool, hide_button: bool);
}

/// Overlay for headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOverlay;

impl Overlay for NoopOverlay {
    fn show_button(&self, _: VideoId, _: Rect, _: ButtonPosition, _: f64) {}
    fn hide_button(&self) {}
    fn set_session_active(&self, _: bool, _: bool) {}
}
