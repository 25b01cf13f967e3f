//! Control session wiring: settings, feature flags, schedules and the run loop.

mod common;

use bridge_traits::CommentItem;
use common::{segment, FakeSurface, Harness};
use core_async::CancellationToken;
use core_playback::{ControlSession, ControlSettings, GestureUpdate, SettingsFeed};
use std::sync::Arc;
use std::time::Duration;

fn comments() -> Vec<CommentItem> {
    vec![CommentItem::new(50, "a"), CommentItem::new(150, "b")]
}

#[tokio::test]
async fn settings_changes_apply_on_next_frame() {
    let harness = Harness::new(comments(), vec![]);
    let mut overlay = harness.overlay();
    let (publisher, feed) = SettingsFeed::channel(ControlSettings::default());
    let mut session = ControlSession::new(&harness.core, harness.events.clone(), feed);
    session.load_video("BV1", "cid1", 80, &mut overlay);
    session.settle_loads(&mut overlay).await;

    publisher.send_modify(|s| {
        s.gesture_sensitivity = 5.0;
        s.danmaku.opacity = 0.4;
        s.danmaku.block_rules = vec!["spoiler".to_string()];
    });
    assert_eq!(session.settings().gesture_sensitivity, 1.0, "not before a frame");

    session.on_frame(harness.now_ms(), &mut overlay);
    assert_eq!(session.settings().gesture_sensitivity, 2.0, "clamped on arrival");
    assert!((overlay.config().opacity - 0.4).abs() < f32::EPSILON);
    assert_eq!(overlay.config().block_rules, vec!["spoiler".to_string()]);
    assert_eq!(harness.comments.loads(), vec!["cid1"], "settings never reload the track");
}

#[tokio::test]
async fn polling_follows_playback_and_visibility() {
    let harness = Harness::new(comments(), vec![]);
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 80, &mut overlay);
    assert!(!session.is_polling(), "player not started yet");

    harness.player.set_playing(true);
    session.on_playback_state_changed(true, harness.now_ms(), &mut overlay);
    assert!(session.is_polling());

    session.on_visibility_changed(false, harness.now_ms());
    assert!(!session.is_polling());

    // Playback state changes while hidden do not restart polling.
    harness.player.set_playing(false);
    session.on_playback_state_changed(false, harness.now_ms(), &mut overlay);
    harness.player.set_playing(true);
    session.on_playback_state_changed(true, harness.now_ms(), &mut overlay);
    assert!(!session.is_polling());

    session.on_visibility_changed(true, harness.now_ms());
    assert!(session.is_polling());
}

#[tokio::test]
async fn disabled_gestures_ignore_drags() {
    let mut harness = Harness::new(vec![], vec![]);
    harness.core.features.enable_gestures = false;
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.set_viewport(1000.0, 500.0);
    session.load_video("BV1", "cid1", 80, &mut overlay);

    session.drag_start();
    assert_eq!(session.drag(0.0, -100.0, 100.0), GestureUpdate::Ignored);
    assert!(harness.brightness.calls().is_empty());
    assert_eq!(session.drag_end(&mut overlay), None);
}

#[tokio::test]
async fn disabled_segment_skip_fetches_nothing() {
    let mut harness = Harness::new(vec![], vec![segment(0, 10_000, "sponsor", "s1")]);
    harness.core.features.enable_segment_skip = false;
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());

    session.load_video("BV1", "cid1", 80, &mut overlay);
    assert_eq!(session.pending_loads(), 1, "comment track only");
    session.settle_loads(&mut overlay).await;
    assert!(session.segments().segments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_loop_drives_overlay_until_cancelled() {
    let harness = Harness::new(comments(), vec![]);
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 80, &mut overlay);
    session.settle_loads(&mut overlay).await;

    let surface = Arc::new(FakeSurface::new());
    overlay.attach_surface(surface.clone());
    harness.player.set_playing(true);
    session.on_playback_state_changed(true, harness.now_ms(), &mut overlay);

    let cancel = CancellationToken::new();
    let driver = async {
        // Offset from the 100 ms frame ticks so each frame sees one step.
        tokio::time::sleep(Duration::from_millis(50)).await;
        for _ in 0..5 {
            harness.advance(100);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        cancel.cancel();
    };
    tokio::join!(session.run(&mut overlay, cancel.clone()), driver);

    assert_eq!(surface.spawned_texts(), vec!["a", "b"]);
    assert!(surface.render_count() >= 4);
}

#[tokio::test]
async fn leaving_unbinds_the_overlay() {
    let harness = Harness::new(comments(), vec![]);
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 80, &mut overlay);
    session.settle_loads(&mut overlay).await;
    let surface = Arc::new(FakeSurface::new());
    overlay.attach_surface(surface.clone());

    session.drag_start();
    session.leave(&mut overlay);

    assert!(overlay.bound_surface().is_none());
    assert!(!overlay.has_clock());
    assert_eq!(overlay.loaded_track_id(), Some("cid1"));
}
