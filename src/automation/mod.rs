//! Automatic triggers: page visibility and the keyboard shortcut.
//!
//! Both resolve a target through the shared ranking in
//! [`crate::eligibility`] and hand it to the [`SessionController`]. Neither
//! ever mutates session state directly.

mod hotkeys;
mod shortcut;
mod visibility;

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::host::PageHost;
use crate::registry::VideoRegistry;
use crate::session::SessionController;
use crate::settings::SharedSettings;

pub use hotkeys::{ShortcutDecision, SHORTCUT_THROTTLE};
pub use shortcut::{KeyEvent, Shortcut, ShortcutError};
pub use visibility::AutoDecision;

pub struct AutomationEngine {
    controller: Arc<SessionController>,
    registry: Arc<VideoRegistry>,
    page: Arc<dyn PageHost>,
    settings: Arc<SharedSettings>,
    /// Bumped on every visibility change; a deferred trigger only fires if
    /// the epoch it was scheduled under is still current.
    visibility_epoch: AtomicU64,
    pending: Mutex<Option<JoinHandle<AutoDecision>>>,
    last_shortcut: Mutex<Option<Instant>>,
}

impl AutomationEngine {
    pub fn new(
        controller: Arc<SessionController>,
        registry: Arc<VideoRegistry>,
        page: Arc<dyn PageHost>,
        settings: Arc<SharedSettings>,
    ) -> Self {
        Self {
            controller,
            registry,
            page,
            settings,
            visibility_epoch: AtomicU64::new(0),
            pending: Mutex::new(None),
            last_shortcut: Mutex::new(None),
        }
    }

    /// Hand out the most recently scheduled deferred trigger.
    pub(crate) fn take_pending(&self) -> Option<JoinHandle<AutoDecision>> {
        self.pending_slot().take()
    }

    fn pending_slot(&self) -> MutexGuard<'_, Option<JoinHandle<AutoDecision>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
