//! Panic Prevention Tests
//!
//! These tests verify that stale references, poisoned locks and failing host
//! capabilities are absorbed without crashing the engine.

use std::sync::Arc;

use serial_test::serial;
use tokio::sync::mpsc;

use crate::error::{HostError, PipError};
use crate::host::{MockNotifier, Notifier, VideoHandle, VideoId};
use crate::media::MediaControlSync;
use crate::registry::VideoRegistry;
use crate::session::{PipOutcome, SessionController, SizeMemory};
use crate::settings::{MemoryBackend, Settings, SettingsStore};
use crate::state::{PipState, UnifiedSessionState};
use crate::tests::test_data_helpers::{
    FakeMediaSession, FakePage, FakePip, FakeVideo, RecordingOverlay,
};

struct Fixture {
    page: Arc<FakePage>,
    pip: Arc<FakePip>,
    controller: SessionController,
}

fn controller_with(notifier: Arc<dyn Notifier>, videos: Vec<FakeVideo>) -> Fixture {
    let page = Arc::new(FakePage::new("video.example.com"));
    for video in videos {
        page.add_video(video);
    }
    let pip = Arc::new(FakePip::for_page(&page));
    let (events, _inbox) = mpsc::unbounded_channel();
    let store = Arc::new(SettingsStore::new(Arc::new(MemoryBackend::new())));

    let controller = SessionController::new(
        pip.clone(),
        page.clone(),
        MediaControlSync::new(Arc::new(FakeMediaSession::default()), page.clone()),
        Arc::new(SizeMemory::new(store)),
        notifier,
        Arc::new(RecordingOverlay::default()),
        events,
    );
    Fixture {
        page,
        pip,
        controller,
    }
}

fn page_video(fixture: &Fixture, id: u64) -> VideoHandle {
    fixture.page.video(VideoId(id)).unwrap()
}

#[test]
fn test_dropped_video_is_stale_not_panic() {
    let (events, _inbox) = mpsc::unbounded_channel();
    let registry = VideoRegistry::new(events);

    let video: VideoHandle = Arc::new(FakeVideo::new(1).playing());
    assert!(registry.register(&video));
    registry.set_hovered(&video);
    drop(video);

    assert!(registry.get(VideoId(1)).is_none());
    assert!(registry.hovered().is_none());
    assert!(registry.live_videos().is_empty());
    assert_eq!(registry.prune(), 1);
    log::info!("✅ Dropped media elements resolve to nothing");
}

#[test]
fn test_detached_request_is_silent() {
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().times(0);
    let fixture = controller_with(Arc::new(notifier), vec![FakeVideo::new(1).playing()]);

    let video = page_video(&fixture, 1);
    fixture.page.remove_video(VideoId(1));

    let outcome = tokio_test::block_on(
        fixture
            .controller
            .request_pip(&video, Arc::new(Settings::default())),
    );
    assert_eq!(outcome, Err(PipError::StaleReference));
    assert_eq!(fixture.controller.state(), PipState::Idle);
}

#[tokio::test]
async fn test_unavailable_pip_notifies_once() {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .withf(|message, duration| message.contains("not allowed") && *duration == 3000)
        .times(1)
        .return_const(());
    let fixture = controller_with(Arc::new(notifier), vec![FakeVideo::new(1).playing()]);
    fixture
        .pip
        .fail_entries_with(Some(HostError::NotSupported("not allowed here".into())));

    let video = page_video(&fixture, 1);
    let outcome = fixture
        .controller
        .request_pip(&video, Arc::new(Settings::default()))
        .await;

    assert!(matches!(outcome, Err(PipError::Unavailable(_))));
    assert_eq!(fixture.controller.state(), PipState::Idle);
}

#[tokio::test]
async fn test_video_refusing_flag_change_still_enters() {
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().times(0);
    let fixture = controller_with(
        Arc::new(notifier),
        vec![FakeVideo::new(1)
            .playing()
            .with_pip_disabled()
            .refusing_flag_change()],
    );

    let video = page_video(&fixture, 1);
    let outcome = fixture
        .controller
        .request_pip(&video, Arc::new(Settings::default()))
        .await;

    assert_eq!(outcome, Ok(PipOutcome::Entered(VideoId(1))));
}

#[tokio::test]
async fn test_shutdown_without_session_is_noop() {
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().times(0);
    let fixture = controller_with(Arc::new(notifier), Vec::new());

    fixture.controller.shutdown().await;
    fixture.controller.shutdown().await;

    assert_eq!(fixture.pip.exit_count(), 0);
    assert!(!fixture.controller.reconcile());
}

#[test]
fn test_poisoned_session_state_recovers() {
    let state = UnifiedSessionState::new();
    let poisoner = state.clone();

    // Poison the lock by panicking inside a session update
    let handle = std::thread::spawn(move || {
        let _ = poisoner.transition_with(PipState::Entering, |_| {
            panic!("Intentional panic to poison mutex");
        });
    });
    assert!(handle.join().is_err());

    let result = std::panic::catch_unwind(|| state.current());
    assert_eq!(result.ok(), Some(PipState::Entering));

    assert!(state.transition_to(PipState::Idle).is_ok());
    assert_eq!(state.current(), PipState::Idle);
    log::info!("✅ Session state recovered from poisoned mutex");
}

#[test]
#[serial] // Installs a process-wide panic hook
fn test_panic_hook_does_not_break_engine_calls() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Test panic handler: {:?}", panic_info);
    }));

    let state = UnifiedSessionState::new();
    let result = std::panic::catch_unwind(|| {
        state
            .transition_to(PipState::Active)
            .map_err(|e| e.to_string())
    });

    std::panic::set_hook(previous);
    let transition = result.expect("transition must not panic");
    assert!(transition.is_err());
    assert_eq!(state.current(), PipState::Idle);
}
