use std::sync::Arc;
use std::time::Duration;

use keyboard_types::Modifiers;

use crate::automation::{AutoDecision, KeyEvent, ShortcutDecision, SHORTCUT_THROTTLE};
use crate::host::{PipCapability, VideoHandle, VideoId};
use crate::session::PipOutcome;
use crate::settings::Settings;
use crate::state::PipState;
use crate::tests::test_data_helpers::{auto_settings, FakeVideo, Harness};

fn scheduled(id: u64, delay_ms: u64) -> AutoDecision {
    AutoDecision::Scheduled {
        video: VideoId(id),
        delay: Duration::from_millis(delay_ms),
    }
}

#[tokio::test(start_paused = true)]
async fn test_visible_again_at_999ms_does_not_start_session() {
    let h = Harness::new(auto_settings(1000), vec![FakeVideo::new(1).playing()]);
    let automation = Arc::clone(h.engine.automation());

    h.page.set_hidden(true);
    assert_eq!(automation.on_visibility_change(true).await, scheduled(1, 1000));

    tokio::time::advance(Duration::from_millis(999)).await;
    h.page.set_hidden(false);
    assert_eq!(automation.on_visibility_change(false).await, AutoDecision::Ignored);

    let pending = automation.take_pending().unwrap();
    assert_eq!(pending.await.unwrap(), AutoDecision::Stale);
    assert_eq!(h.engine.controller().state(), PipState::Idle);
    assert_eq!(h.pip.entry_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_staying_hidden_through_delay_starts_session() {
    let h = Harness::new(auto_settings(1000), vec![FakeVideo::new(1).playing()]);
    let automation = Arc::clone(h.engine.automation());

    h.page.set_hidden(true);
    automation.on_visibility_change(true).await;
    tokio::time::advance(Duration::from_millis(999)).await;
    assert_eq!(h.pip.entry_count(), 0);

    let pending = automation.take_pending().unwrap();
    assert_eq!(pending.await.unwrap(), AutoDecision::Started(VideoId(1)));
    assert_eq!(h.engine.controller().state(), PipState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_trigger_fails_its_own_recheck() {
    let h = Harness::new(auto_settings(500), vec![FakeVideo::new(1).playing()]);
    let automation = Arc::clone(h.engine.automation());

    h.page.set_hidden(true);
    automation.on_visibility_change(true).await;
    let first = automation.take_pending().unwrap();

    tokio::time::advance(Duration::from_millis(200)).await;
    h.page.set_hidden(false);
    automation.on_visibility_change(false).await;
    h.page.set_hidden(true);
    automation.on_visibility_change(true).await;
    let second = automation.take_pending().unwrap();

    // The first trigger fires while the page is hidden again, under an old epoch
    assert_eq!(first.await.unwrap(), AutoDecision::Stale);
    assert_eq!(second.await.unwrap(), AutoDecision::Started(VideoId(1)));
    assert_eq!(h.pip.entry_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_candidate_paused_during_delay() {
    let h = Harness::new(auto_settings(1000), vec![FakeVideo::new(1).playing()]);
    let automation = Arc::clone(h.engine.automation());

    h.page.set_hidden(true);
    automation.on_visibility_change(true).await;
    h.video(0).set_paused(true);

    let pending = automation.take_pending().unwrap();
    assert_eq!(pending.await.unwrap(), AutoDecision::Stale);
    assert_eq!(h.pip.entry_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_started_meanwhile_blocks_trigger() {
    let h = Harness::new(
        auto_settings(1000),
        vec![FakeVideo::new(1).playing(), FakeVideo::new(2)],
    );
    let automation = Arc::clone(h.engine.automation());

    h.page.set_hidden(true);
    automation.on_visibility_change(true).await;
    h.engine
        .controller()
        .request_pip(&h.handle(1), h.engine.settings())
        .await
        .unwrap();

    let pending = automation.take_pending().unwrap();
    assert_eq!(pending.await.unwrap(), AutoDecision::SessionBusy);
    assert_eq!(h.engine.controller().active_video_id(), Some(VideoId(2)));
}

#[tokio::test]
async fn test_gates_before_scheduling() {
    let disabled = Harness::new(Settings::default(), vec![FakeVideo::new(1).playing()]);
    assert_eq!(
        disabled.engine.automation().on_visibility_change(true).await,
        AutoDecision::Disabled
    );

    let blocked_settings = Settings {
        blacklist: vec!["tiktok.com".into()],
        ..auto_settings(1000)
    };
    let blocked = Harness::on_host(
        "www.tiktok.com",
        blocked_settings,
        vec![FakeVideo::new(1).playing()],
    );
    assert_eq!(
        blocked.engine.automation().on_visibility_change(true).await,
        AutoDecision::Blacklisted
    );

    let idle = Harness::new(auto_settings(1000), vec![FakeVideo::new(1)]);
    assert_eq!(
        idle.engine.automation().on_visibility_change(true).await,
        AutoDecision::NoCandidate
    );

    let short = Harness::new(
        auto_settings(1000),
        vec![FakeVideo::new(1).with_duration(5.0).playing()],
    );
    assert_eq!(
        short.engine.automation().on_visibility_change(true).await,
        AutoDecision::TooShort
    );

    let tiny = Harness::new(
        auto_settings(1000),
        vec![FakeVideo::new(1).with_rect(120.0, 90.0).playing()],
    );
    assert_eq!(
        tiny.engine.automation().on_visibility_change(true).await,
        AutoDecision::TooSmall
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_trigger_prefers_largest_playing() {
    let h = Harness::new(
        auto_settings(100),
        vec![
            FakeVideo::new(1).with_intrinsic(640, 360).playing(),
            FakeVideo::new(2).with_intrinsic(1920, 1080).playing(),
            FakeVideo::new(3).with_intrinsic(3840, 2160),
        ],
    );
    h.page.set_hidden(true);
    assert_eq!(
        h.engine.automation().on_visibility_change(true).await,
        scheduled(2, 100)
    );
}

#[tokio::test(start_paused = true)]
async fn test_becoming_visible_exits_active_session() {
    let h = Harness::new(auto_settings(1000), vec![FakeVideo::new(1).playing()]);
    let automation = Arc::clone(h.engine.automation());

    h.page.set_hidden(true);
    automation.on_visibility_change(true).await;
    automation.take_pending().unwrap().await.unwrap();
    assert!(h.engine.controller().is_active());

    h.page.set_hidden(false);
    assert_eq!(
        automation.on_visibility_change(false).await,
        AutoDecision::ExitRequested
    );
    assert_eq!(h.engine.controller().state(), PipState::Idle);
}

#[tokio::test]
async fn test_visible_without_auto_pip_keeps_manual_session() {
    let h = Harness::new(Settings::default(), vec![FakeVideo::new(1).playing()]);
    h.engine
        .controller()
        .request_pip(&h.handle(0), h.engine.settings())
        .await
        .unwrap();

    assert_eq!(
        h.engine.automation().on_visibility_change(false).await,
        AutoDecision::Ignored
    );
    assert!(h.engine.controller().is_active());
}

#[tokio::test(start_paused = true)]
async fn test_shortcut_toggles_and_throttles() {
    let h = Harness::new(Settings::default(), vec![FakeVideo::new(1).playing()]);
    let automation = h.engine.automation();
    let press = KeyEvent::new("p", Modifiers::ALT);

    assert_eq!(
        automation.on_key_down(&press).await,
        ShortcutDecision::Requested(Ok(PipOutcome::Entered(VideoId(1))))
    );
    assert_eq!(automation.on_key_down(&press).await, ShortcutDecision::Throttled);

    tokio::time::advance(SHORTCUT_THROTTLE).await;
    assert_eq!(
        automation.on_key_down(&press).await,
        ShortcutDecision::Requested(Ok(PipOutcome::Exited(VideoId(1))))
    );
}

#[tokio::test]
async fn test_shortcut_ignores_blacklist() {
    let settings = Settings {
        blacklist: vec!["example.com".into()],
        ..Settings::default()
    };
    let h = Harness::new(settings, vec![FakeVideo::new(1).playing()]);
    let decision = h
        .engine
        .automation()
        .on_key_down(&KeyEvent::new("P", Modifiers::ALT))
        .await;
    assert_eq!(
        decision,
        ShortcutDecision::Requested(Ok(PipOutcome::Entered(VideoId(1))))
    );
}

#[tokio::test]
async fn test_shortcut_prefers_hovered_video() {
    let h = Harness::new(
        Settings::default(),
        vec![FakeVideo::new(1).playing(), FakeVideo::new(2)],
    );
    let hovered: VideoHandle = h.handle(1);
    h.engine.registry().set_hovered(&hovered);

    let decision = h
        .engine
        .automation()
        .on_key_down(&KeyEvent::new("p", Modifiers::ALT))
        .await;
    assert_eq!(
        decision,
        ShortcutDecision::Requested(Ok(PipOutcome::Entered(VideoId(2))))
    );
}

#[tokio::test]
async fn test_shortcut_non_matching_presses() {
    let h = Harness::new(Settings::default(), vec![FakeVideo::new(1).playing()]);
    let automation = h.engine.automation();

    assert_eq!(
        automation.on_key_down(&KeyEvent::new("Alt", Modifiers::ALT)).await,
        ShortcutDecision::NoMatch
    );
    assert_eq!(
        automation
            .on_key_down(&KeyEvent::new("p", Modifiers::ALT | Modifiers::SHIFT))
            .await,
        ShortcutDecision::NoMatch
    );
    assert_eq!(h.pip.entry_count(), 0);

    h.engine.apply_settings(Settings {
        shortcut: String::new(),
        ..Settings::default()
    });
    assert_eq!(
        automation.on_key_down(&KeyEvent::new("p", Modifiers::ALT)).await,
        ShortcutDecision::NotConfigured
    );
}

#[tokio::test]
async fn test_shortcut_without_candidates() {
    let h = Harness::new(Settings::default(), vec![FakeVideo::new(1).ended()]);
    assert_eq!(
        h.engine
            .automation()
            .on_key_down(&KeyEvent::new("p", Modifiers::ALT))
            .await,
        ShortcutDecision::NoCandidate
    );
}

#[tokio::test(start_paused = true)]
async fn test_visible_while_entry_pending_exits_again() {
    let h = Harness::new(auto_settings(1000), vec![FakeVideo::new(1).playing()]);
    let automation = Arc::clone(h.engine.automation());
    let gate = h.pip.hold_entries();

    h.page.set_hidden(true);
    automation.on_visibility_change(true).await;
    let pending = automation.take_pending().unwrap();

    tokio::time::advance(Duration::from_millis(1001)).await;
    while h.engine.controller().state() != PipState::Entering {
        tokio::task::yield_now().await;
    }

    // Not Active yet, so becoming visible has nothing to exit
    h.page.set_hidden(false);
    assert_eq!(automation.on_visibility_change(false).await, AutoDecision::Ignored);

    gate.notify_one();
    assert_eq!(pending.await.unwrap(), AutoDecision::Stale);
    assert_eq!(h.engine.controller().state(), PipState::Idle);
    assert_eq!(h.pip.entry_count(), 1);
    assert_eq!(h.pip.exit_count(), 1);
    assert_eq!(h.pip.active_video(), None);
}
