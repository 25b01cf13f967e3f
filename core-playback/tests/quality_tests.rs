//! Quality switching: latest request wins, failures revert once.

mod common;

use common::{count_events, segment, Harness, ScriptedResolver};
use core_playback::{AppliedSwitch, ControlError, ControlSettings, SkipDecision, SwitchState};
use core_runtime::events::{CoreEvent, QualityEvent};
use std::time::Duration;

fn resolver() -> ScriptedResolver {
    ScriptedResolver::default()
        .with(80, Duration::from_millis(500), 80)
        .with(32, Duration::from_millis(10), 32)
        .with(120, Duration::from_millis(5), 80)
}

#[tokio::test(start_paused = true)]
async fn newest_request_wins_over_slower_older_one() {
    let harness = Harness::with_resolver(vec![], vec![], resolver());
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 64, &mut overlay);
    harness.player.set_position(42_000);
    let mut events = harness.subscribe();

    let first = session.switch_quality(80).unwrap();
    let second = session.switch_quality(32).unwrap();
    assert!(second > first);
    assert_eq!(session.quality().current_quality_id(), 32);

    let applied = session.await_quality_switch(&mut overlay).await;
    assert_eq!(
        applied,
        Some(AppliedSwitch::Switched {
            quality_id: 32,
            was_downgraded: false,
            position_ms: 42_000
        })
    );

    assert_eq!(
        session.quality().latest_request().map(|r| r.state),
        Some(SwitchState::Done)
    );
    assert!(!session.quality().is_switching());

    // The 80 response lands later and is dropped.
    tokio::time::sleep(Duration::from_millis(600)).await;
    session.on_frame(harness.now_ms(), &mut overlay);

    assert_eq!(session.quality().current_quality_id(), 32);
    assert_eq!(session.clock().current_quality_id(), Some(32));
    assert_eq!(harness.player.swapped().len(), 1);
    assert_eq!(
        harness.player.swapped()[0].primary_url(),
        "https://cdn.test/BV1/32.mp4"
    );

    let events = events.drain();
    assert_eq!(
        count_events(&events, |e| matches!(
            e,
            CoreEvent::Quality(QualityEvent::SwitchStarted { .. })
        )),
        2
    );
    assert_eq!(
        count_events(&events, |e| matches!(
            e,
            CoreEvent::Quality(QualityEvent::Switched { .. })
        )),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn switch_resumes_at_the_captured_position() {
    let harness = Harness::with_resolver(vec![], vec![], resolver());
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 64, &mut overlay);
    harness.player.set_position(42_000);

    session.switch_quality(80).unwrap();
    // The player keeps moving while the stream resolves.
    harness.player.set_position(42_400);

    let applied = session.await_quality_switch(&mut overlay).await;
    assert!(matches!(
        applied,
        Some(AppliedSwitch::Switched {
            position_ms: 42_000,
            ..
        })
    ));
    assert_eq!(harness.player.position_ms_now(), 42_000);
    assert!(harness.player.playing_now());
}

#[tokio::test(start_paused = true)]
async fn resolve_failure_reverts_with_a_single_notice() {
    let harness = Harness::with_resolver(vec![], vec![], resolver());
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 64, &mut overlay);
    let mut events = harness.subscribe();

    session.switch_quality(116).unwrap();
    assert_eq!(session.quality().current_quality_id(), 116);

    let applied = session.await_quality_switch(&mut overlay).await;
    assert_eq!(applied, Some(AppliedSwitch::Failed { reverted_to: 64 }));
    assert_eq!(session.quality().current_quality_id(), 64);
    assert_eq!(session.clock().current_quality_id(), Some(64));
    assert_eq!(
        session.quality().latest_request().map(|r| r.state),
        Some(SwitchState::Failed)
    );
    assert!(!session.quality().is_switching(), "a failed switch leaves the UI idle");
    assert!(harness.player.swapped().is_empty());

    let failures: Vec<_> = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::Quality(QualityEvent::SwitchFailed { .. })))
        .collect();
    assert_eq!(failures.len(), 1);
    match &failures[0] {
        CoreEvent::Quality(QualityEvent::SwitchFailed {
            requested_quality_id,
            reverted_to,
            ..
        }) => {
            assert_eq!(*requested_quality_id, 116);
            assert_eq!(*reverted_to, 64);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn swap_failure_reverts_to_last_good_tier() {
    let harness = Harness::with_resolver(vec![], vec![], resolver());
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 64, &mut overlay);

    session.switch_quality(32).unwrap();
    session.await_quality_switch(&mut overlay).await;
    assert_eq!(session.quality().last_good_quality_id(), 32);

    harness.player.fail_swaps();
    session.switch_quality(80).unwrap();
    let applied = session.await_quality_switch(&mut overlay).await;
    assert_eq!(applied, Some(AppliedSwitch::Failed { reverted_to: 32 }));
    assert_eq!(session.quality().current_quality_id(), 32);
}

#[tokio::test(start_paused = true)]
async fn switch_from_paused_resumes_polling() {
    let harness = Harness::with_resolver(
        vec![],
        vec![segment(30_000, 45_000, "sponsor", "s1")],
        resolver(),
    );
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 64, &mut overlay);
    session.settle_loads(&mut overlay).await;
    harness.player.set_position(20_000);
    assert!(!session.is_polling());

    session.switch_quality(32).unwrap();
    let applied = session.await_quality_switch(&mut overlay).await;
    assert!(matches!(applied, Some(AppliedSwitch::Switched { .. })));
    assert!(harness.player.playing_now());
    assert!(session.is_polling(), "the swapped source plays, so polling resumes");

    let mut decisions = Vec::new();
    for _ in 0..30 {
        let now = harness.advance(500);
        decisions.extend(session.on_frame(now, &mut overlay));
    }
    assert_eq!(
        decisions,
        vec![SkipDecision::SkipTo {
            position_ms: 45_000,
            segment_id: "s1".to_string()
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn lower_delivered_tier_is_reported_as_downgrade() {
    let harness = Harness::with_resolver(vec![], vec![], resolver());
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 64, &mut overlay);
    let mut events = harness.subscribe();

    session.switch_quality(120).unwrap();
    let applied = session.await_quality_switch(&mut overlay).await;
    assert!(matches!(
        applied,
        Some(AppliedSwitch::Switched {
            quality_id: 80,
            was_downgraded: true,
            ..
        })
    ));
    assert!(events.drain().iter().any(|e| matches!(
        e,
        CoreEvent::Quality(QualityEvent::Switched {
            quality_id: 80,
            was_downgraded: true,
            ..
        })
    )));
}

#[tokio::test(start_paused = true)]
async fn loading_another_video_drops_pending_switch() {
    let harness = Harness::with_resolver(vec![], vec![], resolver());
    let mut overlay = harness.overlay();
    let mut session = harness.session(ControlSettings::default());
    session.load_video("BV1", "cid1", 64, &mut overlay);

    session.switch_quality(80).unwrap();
    session.load_video("BV2", "cid2", 32, &mut overlay);
    assert!(!session.quality().is_switching());
    assert_eq!(session.await_quality_switch(&mut overlay).await, None);

    tokio::time::sleep(Duration::from_millis(600)).await;
    session.on_frame(harness.now_ms(), &mut overlay);
    assert!(harness.player.swapped().is_empty());
    assert_eq!(session.quality().current_quality_id(), 32);
}

#[tokio::test]
async fn switch_without_video_is_rejected() {
    let harness = Harness::new(vec![], vec![]);
    let mut session = harness.session(ControlSettings::default());

    assert!(matches!(
        session.switch_quality(80),
        Err(ControlError::NoVideoLoaded)
    ));
}
