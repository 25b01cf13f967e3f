//! # Control Session
//!
//! Per-screen driver that ties the clock, gestures, skip segments and quality
//! switching together on one cooperative loop.
//!
//! A session lives as long as the player screen. It never owns the comment
//! overlay: the [`DanmakuOverlayManager`] is borrowed on each call that needs
//! it, so leaving the screen drops the session while the overlay stays alive
//! for the next screen or the mini-player.
//!
//! ## Driving
//!
//! The host calls [`ControlSession::on_frame`] on every UI frame (or lets
//! [`ControlSession::run`] drive it from a Tokio interval). Each frame:
//!
//! 1. applies settings that changed since the last frame,
//! 2. installs finished track/segment fetches and quality outcomes,
//! 3. samples the clock and syncs the overlay when the clock schedule is due,
//! 4. polls skip segments when the segment schedule is due.
//!
//! Both schedules pause while playback is paused or the screen is hidden.

use bridge_traits::Clock;
use core_async::sync::{mpsc, CancellationToken};
use core_async::time::Duration;
use core_async::{IntervalSchedule, ScheduledInterval};
use core_runtime::config::{CoreConfig, FeatureFlags};
use core_runtime::events::EventBus;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::clock::PlaybackClock;
use crate::config::{ControlSettings, SettingsFeed};
use crate::danmaku::{DanmakuOverlayManager, TrackFetch, TrackRequest};
use crate::error::Result;
use crate::gesture::{GestureArbiter, GestureUpdate};
use crate::quality::{AppliedSwitch, QualitySwitchCoordinator, RequestToken};
use crate::segments::{SegmentFetch, SegmentRequest, SegmentSkipController, SkipDecision};

/// Background fetch result delivered back to the driving loop.
enum LoadResult {
    Track(TrackFetch),
    Segments(SegmentFetch),
}

/// Playback controls for one player screen.
pub struct ControlSession {
    clock: PlaybackClock,
    gestures: GestureArbiter,
    segments: SegmentSkipController,
    quality: QualitySwitchCoordinator,

    settings: SettingsFeed,
    applied: ControlSettings,
    features: FeatureFlags,
    wall_clock: Arc<dyn Clock>,
    events: EventBus,

    clock_schedule: IntervalSchedule,
    segment_schedule: IntervalSchedule,
    is_playing: bool,
    visible: bool,

    loads_tx: mpsc::UnboundedSender<LoadResult>,
    loads_rx: mpsc::UnboundedReceiver<LoadResult>,
    pending_loads: usize,
}

impl ControlSession {
    pub fn new(core: &CoreConfig, events: EventBus, settings: SettingsFeed) -> Self {
        let applied = settings.current();
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();

        let mut session = Self {
            clock: PlaybackClock::new(
                core.media_player.clone(),
                core.clock.clone(),
                events.clone(),
            ),
            gestures: GestureArbiter::new(
                core.volume_control.clone(),
                core.brightness_control.clone(),
                events.clone(),
            ),
            segments: SegmentSkipController::new(core.segment_source.clone(), events.clone()),
            quality: QualitySwitchCoordinator::new(core.stream_resolver.clone(), events.clone()),
            settings,
            applied: applied.clone(),
            features: core.features,
            wall_clock: core.clock.clone(),
            events,
            clock_schedule: IntervalSchedule::new(Duration::from_millis(
                applied.clock_tick_interval_ms,
            )),
            segment_schedule: IntervalSchedule::new(Duration::from_millis(
                applied.segment_poll_interval_ms,
            )),
            is_playing: false,
            visible: true,
            loads_tx,
            loads_rx,
            pending_loads: 0,
        };
        session.configure_components();
        session
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut PlaybackClock {
        &mut self.clock
    }

    pub fn gestures(&self) -> &GestureArbiter {
        &self.gestures
    }

    pub fn segments(&self) -> &SegmentSkipController {
        &self.segments
    }

    pub fn quality(&self) -> &QualitySwitchCoordinator {
        &self.quality
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.applied
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// `true` while the polling schedules run.
    pub fn is_polling(&self) -> bool {
        self.clock_schedule.is_active()
    }

    /// Fetches started by this session that have not been installed yet.
    pub fn pending_loads(&self) -> usize {
        self.pending_loads
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.wall_clock.unix_timestamp_millis()).unwrap_or(0)
    }

    // ========================================================================
    // Video lifecycle
    // ========================================================================

    /// Switches the screen to a new video.
    ///
    /// Segment and quality state from the previous video is dropped. The
    /// comment track and the segment list are fetched in the background and
    /// installed by a later [`on_frame`](Self::on_frame).
    #[instrument(skip(self, overlay))]
    pub fn load_video(
        &mut self,
        video_id: &str,
        track_id: &str,
        quality_id: u32,
        overlay: &mut DanmakuOverlayManager,
    ) {
        self.clock.load_video(video_id, quality_id);
        self.quality.reset_for_video(video_id, quality_id);

        if self.features.enable_segment_skip {
            if let Some(request) = self.segments.request_segments(video_id, track_id) {
                self.spawn_segments(request);
            }
        } else {
            self.segments.clear();
        }

        overlay.set_jump_threshold_ms(self.applied.seek_jump_threshold_ms);
        overlay.set_config(self.applied.danmaku.clone());
        overlay.attach_playback_clock(self.clock.subscribe());
        if self.features.enable_danmaku {
            if let Some(request) = overlay.request_track(track_id) {
                self.spawn_track(request);
            }
        }

        let now_ms = self.now_ms();
        self.is_playing = self.clock.is_playing();
        self.clock_schedule.start(now_ms);
        self.segment_schedule.start(now_ms);
        self.update_schedules(now_ms);
    }

    /// Playback reached the end of the video.
    pub fn on_video_ended(&mut self, overlay: &mut DanmakuOverlayManager) {
        self.segments.clear();
        self.clock.end_video();
        self.is_playing = false;
        overlay.sync();
        let now_ms = self.now_ms();
        self.update_schedules(now_ms);
    }

    /// The player started or stopped. Polling follows.
    pub fn on_playback_state_changed(
        &mut self,
        is_playing: bool,
        now_ms: u64,
        overlay: &mut DanmakuOverlayManager,
    ) {
        if self.is_playing == is_playing {
            return;
        }
        debug!(is_playing, "Playback state changed");
        self.is_playing = is_playing;
        self.clock.sample();
        overlay.sync();
        self.update_schedules(now_ms);
    }

    /// The screen was hidden or shown. Polling follows.
    pub fn on_visibility_changed(&mut self, visible: bool, now_ms: u64) {
        if self.visible == visible {
            return;
        }
        debug!(visible, "Screen visibility changed");
        self.visible = visible;
        self.update_schedules(now_ms);
    }

    fn update_schedules(&mut self, now_ms: u64) {
        let active = self.is_playing && self.visible;
        for schedule in [&mut self.clock_schedule, &mut self.segment_schedule] {
            if active {
                schedule.resume(now_ms);
            } else {
                schedule.pause();
            }
        }
    }

    // ========================================================================
    // Frame loop
    // ========================================================================

    /// One cooperative tick. Returns the skip decisions it produced.
    ///
    /// `SkipTo` decisions are already applied to the player when returned;
    /// `ShowButton` decisions are for the host to display.
    pub fn on_frame(
        &mut self,
        now_ms: u64,
        overlay: &mut DanmakuOverlayManager,
    ) -> Vec<SkipDecision> {
        if let Some(settings) = self.settings.take_changed() {
            self.apply_settings(settings, overlay);
        }

        self.drain_loads(overlay);
        if self.features.enable_danmaku {
            if let Some(request) = overlay.take_pending_request() {
                self.spawn_track(request);
            }
        }
        for applied in self.quality.drain_ready(&mut self.clock) {
            self.finish_switch(&applied, now_ms, overlay);
        }

        if self.clock_schedule.is_due(now_ms) {
            self.clock.sample();
            overlay.sync();
        }

        let mut decisions = Vec::new();
        if self.segment_schedule.is_due(now_ms) {
            if let Some(decision) = self.segments.poll(self.clock.position_ms()) {
                if let SkipDecision::SkipTo { position_ms, .. } = &decision {
                    self.clock.seek(*position_ms);
                    overlay.sync();
                }
                decisions.push(decision);
            }
        }
        decisions
    }

    /// Drives [`on_frame`](Self::on_frame) from a Tokio interval until `cancel` fires.
    ///
    /// Skip buttons are published on the event bus, so the returned decisions
    /// are not needed here.
    pub async fn run(&mut self, overlay: &mut DanmakuOverlayManager, cancel: CancellationToken) {
        let period = Duration::from_millis(self.applied.clock_tick_interval_ms);
        let mut ticks = ScheduledInterval::new(period, cancel);
        info!(period_ms = self.applied.clock_tick_interval_ms, "Control loop started");

        while ticks.tick().await.is_some() {
            let now_ms = self.now_ms();
            self.on_frame(now_ms, overlay);
        }
        info!("Control loop stopped");
    }

    /// Waits until every background fetch this session started has been
    /// installed.
    pub async fn settle_loads(&mut self, overlay: &mut DanmakuOverlayManager) {
        while self.pending_loads > 0 {
            let Some(result) = self.loads_rx.recv().await else {
                break;
            };
            self.install_load(result, overlay);
        }
    }

    /// Waits for the in-flight quality switch and finishes it.
    pub async fn await_quality_switch(
        &mut self,
        overlay: &mut DanmakuOverlayManager,
    ) -> Option<AppliedSwitch> {
        if !self.quality.is_switching() {
            return None;
        }
        loop {
            let outcome = self.quality.next_outcome().await?;
            let applied = self.quality.apply_outcome(&mut self.clock, outcome);
            if applied != AppliedSwitch::Stale {
                let now_ms = self.now_ms();
                self.finish_switch(&applied, now_ms, overlay);
                return Some(applied);
            }
        }
    }

    /// A swapped source starts playing, so polling resumes with it.
    fn finish_switch(
        &mut self,
        applied: &AppliedSwitch,
        now_ms: u64,
        overlay: &mut DanmakuOverlayManager,
    ) {
        overlay.sync();
        if matches!(applied, AppliedSwitch::Switched { .. }) && !self.is_playing {
            self.is_playing = true;
            self.update_schedules(now_ms);
        }
    }

    fn drain_loads(&mut self, overlay: &mut DanmakuOverlayManager) {
        while let Ok(result) = self.loads_rx.try_recv() {
            self.install_load(result, overlay);
        }
    }

    fn install_load(&mut self, result: LoadResult, overlay: &mut DanmakuOverlayManager) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        match result {
            LoadResult::Track(fetch) => {
                overlay.apply_track(fetch);
            }
            LoadResult::Segments(fetch) => {
                self.segments.apply_segments(fetch);
            }
        }
    }

    fn spawn_track(&mut self, request: TrackRequest) {
        self.pending_loads += 1;
        let tx = self.loads_tx.clone();
        core_async::spawn(async move {
            let fetch = request.fetch().await;
            let _ = tx.send(LoadResult::Track(fetch));
        });
    }

    fn spawn_segments(&mut self, request: SegmentRequest) {
        self.pending_loads += 1;
        let tx = self.loads_tx.clone();
        core_async::spawn(async move {
            let fetch = request.fetch().await;
            let _ = tx.send(LoadResult::Segments(fetch));
        });
    }

    // ========================================================================
    // Settings
    // ========================================================================

    fn apply_settings(&mut self, settings: ControlSettings, overlay: &mut DanmakuOverlayManager) {
        debug!("Applying updated control settings");
        self.applied = settings;
        self.configure_components();
        overlay.set_jump_threshold_ms(self.applied.seek_jump_threshold_ms);
        overlay.set_config(self.applied.danmaku.clone());
    }

    fn configure_components(&mut self) {
        self.gestures.apply_settings(&self.applied);
        self.segments.set_auto_skip(self.applied.sponsor.auto_skip);
        self.segments
            .set_categories(self.applied.sponsor.categories.clone());
        self.clock_schedule
            .set_period(Duration::from_millis(self.applied.clock_tick_interval_ms));
        self.segment_schedule
            .set_period(Duration::from_millis(self.applied.segment_poll_interval_ms));
    }

    // ========================================================================
    // Gestures
    // ========================================================================

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.gestures.set_viewport(width, height);
    }

    pub fn drag_start(&mut self) {
        if self.features.enable_gestures {
            self.gestures.on_drag_start(&self.clock);
        }
    }

    pub fn drag(&mut self, dx: f32, dy: f32, touch_x: f32) -> GestureUpdate {
        self.gestures.on_drag(dx, dy, touch_x)
    }

    /// Releases the drag. A committed seek also resumes playback.
    pub fn drag_end(&mut self, overlay: &mut DanmakuOverlayManager) -> Option<u64> {
        let target_ms = self.gestures.on_drag_end(&mut self.clock)?;
        overlay.sync();
        let now_ms = self.now_ms();
        if !self.is_playing {
            self.is_playing = true;
            self.update_schedules(now_ms);
        }
        Some(target_ms)
    }

    pub fn drag_cancel(&mut self) {
        self.gestures.on_drag_cancel();
    }

    // ========================================================================
    // Quality and skip actions
    // ========================================================================

    pub fn switch_quality(&mut self, target_quality_id: u32) -> Result<RequestToken> {
        self.quality.switch_quality(&self.clock, target_quality_id)
    }

    /// The user tapped a skip button. Returns the position jumped to.
    pub fn skip_current(
        &mut self,
        segment_id: &str,
        overlay: &mut DanmakuOverlayManager,
    ) -> Option<u64> {
        let end_ms = self.segments.mark_skipped(segment_id)?;
        let position_ms = self.clock.seek(end_ms);
        overlay.sync();
        Some(position_ms)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Leaves the screen.
    ///
    /// Polling stops for good and the overlay is unbound from this screen's
    /// surface and clock. The overlay itself, and its loaded track, stay.
    pub fn leave(mut self, overlay: &mut DanmakuOverlayManager) {
        self.clock_schedule.cancel();
        self.segment_schedule.cancel();
        self.gestures.on_drag_cancel();
        overlay.detach_surface();
        overlay.detach_playback_clock();
        info!(video_id = ?self.clock.video_id(), "Control session closed");
    }
}
