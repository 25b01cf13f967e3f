//! Shared in-memory bridges for the integration tests.

#![allow(dead_code)]

use bridge_traits::{
    error::Result, BrightnessControl, BridgeError, CommentItem, CommentTrackSource, ManualClock,
    MediaPlayer, RenderFrame, RenderSurface, ResolvedStream, SegmentRecord, SegmentSource,
    StreamResolver, StreamSource, SurfaceId, VideoDimensions, VolumeControl,
};
use core_playback::{ControlSession, ControlSettings, DanmakuOverlayManager, SettingsFeed};
use core_runtime::config::{CoreConfig, FeatureFlags};
use core_runtime::events::{CoreEvent, EventBus, EventStream};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Player
// ============================================================================

#[derive(Debug)]
struct PlayerState {
    position_ms: u64,
    duration_ms: u64,
    is_playing: bool,
    speed: f32,
    fail_swaps: bool,
    swapped: Vec<StreamSource>,
}

/// Player whose position only moves when the test moves it.
#[derive(Debug)]
pub struct FakePlayer {
    state: Mutex<PlayerState>,
}

impl FakePlayer {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            state: Mutex::new(PlayerState {
                position_ms: 0,
                duration_ms,
                is_playing: false,
                speed: 1.0,
                fail_swaps: false,
                swapped: Vec::new(),
            }),
        }
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().unwrap().position_ms = position_ms;
    }

    /// Moves the position forward as if playing for `ms`.
    pub fn play_for(&self, ms: u64) {
        let mut state = self.state.lock().unwrap();
        state.position_ms = (state.position_ms + ms).min(state.duration_ms);
    }

    pub fn set_playing(&self, is_playing: bool) {
        self.state.lock().unwrap().is_playing = is_playing;
    }

    pub fn set_speed(&self, speed: f32) {
        self.state.lock().unwrap().speed = speed;
    }

    pub fn fail_swaps(&self) {
        self.state.lock().unwrap().fail_swaps = true;
    }

    pub fn swapped(&self) -> Vec<StreamSource> {
        self.state.lock().unwrap().swapped.clone()
    }

    pub fn position_ms_now(&self) -> u64 {
        self.state.lock().unwrap().position_ms
    }

    pub fn playing_now(&self) -> bool {
        self.state.lock().unwrap().is_playing
    }
}

impl MediaPlayer for FakePlayer {
    fn play(&self) {
        self.set_playing(true);
    }

    fn pause(&self) {
        self.set_playing(false);
    }

    fn seek(&self, position_ms: u64) {
        self.set_position(position_ms);
    }

    fn position_ms(&self) -> u64 {
        self.state.lock().unwrap().position_ms
    }

    fn duration_ms(&self) -> u64 {
        self.state.lock().unwrap().duration_ms
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().is_playing
    }

    fn video_dimensions(&self) -> VideoDimensions {
        VideoDimensions::new(1920, 1080)
    }

    fn playback_speed(&self) -> f32 {
        self.state.lock().unwrap().speed
    }

    fn swap_source(&self, source: StreamSource) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_swaps {
            return Err(BridgeError::OperationFailed("decoder rejected source".into()));
        }
        state.swapped.push(source);
        Ok(())
    }
}

// ============================================================================
// System services
// ============================================================================

#[derive(Debug)]
pub struct FakeVolume {
    max: u32,
    current: Mutex<u32>,
    calls: Mutex<Vec<u32>>,
}

impl FakeVolume {
    pub fn new(current: u32, max: u32) -> Self {
        Self {
            max,
            current: Mutex::new(current),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

impl VolumeControl for FakeVolume {
    fn max_volume(&self) -> u32 {
        self.max
    }

    fn volume(&self) -> u32 {
        *self.current.lock().unwrap()
    }

    fn set_volume(&self, volume: u32) -> Result<()> {
        *self.current.lock().unwrap() = volume;
        self.calls.lock().unwrap().push(volume);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeBrightness {
    current: Mutex<f32>,
    calls: Mutex<Vec<f32>>,
}

impl FakeBrightness {
    pub fn new(current: f32) -> Self {
        Self {
            current: Mutex::new(current),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<f32> {
        self.calls.lock().unwrap().clone()
    }
}

impl BrightnessControl for FakeBrightness {
    fn brightness(&self) -> f32 {
        *self.current.lock().unwrap()
    }

    fn set_brightness(&self, brightness: f32) -> Result<()> {
        *self.current.lock().unwrap() = brightness;
        self.calls.lock().unwrap().push(brightness);
        Ok(())
    }
}

// ============================================================================
// Render surface
// ============================================================================

#[derive(Debug, Default)]
struct SurfaceLog {
    spawned: Vec<String>,
    seeds: Vec<u64>,
    clears: usize,
    pauses: usize,
    renders: usize,
}

#[derive(Debug)]
pub struct FakeSurface {
    id: SurfaceId,
    log: Mutex<SurfaceLog>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self {
            id: SurfaceId::new(),
            log: Mutex::new(SurfaceLog::default()),
        }
    }

    pub fn spawned_texts(&self) -> Vec<String> {
        self.log.lock().unwrap().spawned.clone()
    }

    pub fn seeds(&self) -> Vec<u64> {
        self.log.lock().unwrap().seeds.clone()
    }

    pub fn clear_count(&self) -> usize {
        self.log.lock().unwrap().clears
    }

    pub fn pause_count(&self) -> usize {
        self.log.lock().unwrap().pauses
    }

    pub fn render_count(&self) -> usize {
        self.log.lock().unwrap().renders
    }
}

impl RenderSurface for FakeSurface {
    fn surface_id(&self) -> SurfaceId {
        self.id
    }

    fn seed(&self, position_ms: u64) {
        self.log.lock().unwrap().seeds.push(position_ms);
    }

    fn render(&self, frame: &RenderFrame) {
        let mut log = self.log.lock().unwrap();
        log.renders += 1;
        log.spawned
            .extend(frame.spawned.iter().map(|c| c.text.clone()));
    }

    fn pause(&self) {
        self.log.lock().unwrap().pauses += 1;
    }

    fn clear(&self) {
        self.log.lock().unwrap().clears += 1;
    }
}

// ============================================================================
// Data sources
// ============================================================================

/// Comment source that answers every track id with the same list.
pub struct StaticComments {
    comments: Vec<CommentItem>,
    loads: Mutex<Vec<String>>,
}

impl StaticComments {
    pub fn new(comments: Vec<CommentItem>) -> Self {
        Self {
            comments,
            loads: Mutex::new(Vec::new()),
        }
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommentTrackSource for StaticComments {
    async fn load_track(&self, track_id: &str) -> Result<Vec<CommentItem>> {
        self.loads.lock().unwrap().push(track_id.to_string());
        Ok(self.comments.clone())
    }
}

pub struct StaticSegments {
    records: Vec<SegmentRecord>,
}

impl StaticSegments {
    pub fn new(records: Vec<SegmentRecord>) -> Self {
        Self { records }
    }
}

#[async_trait::async_trait]
impl SegmentSource for StaticSegments {
    async fn load_segments(&self, _video_id: &str, _track_id: &str) -> Result<Vec<SegmentRecord>> {
        Ok(self.records.clone())
    }
}

pub fn segment(start_ms: u64, end_ms: u64, category: &str, id: &str) -> SegmentRecord {
    SegmentRecord {
        start_ms,
        end_ms,
        category: category.to_string(),
        segment_id: id.to_string(),
    }
}

/// Resolver with a per-tier delay and answer.
///
/// Tiers without a script fail with a network error.
#[derive(Default)]
pub struct ScriptedResolver {
    script: HashMap<u32, (Duration, u32)>,
}

impl ScriptedResolver {
    /// `requested` resolves after `delay` to a stream of tier `actual`.
    pub fn with(mut self, requested: u32, delay: Duration, actual: u32) -> Self {
        self.script.insert(requested, (delay, actual));
        self
    }
}

#[async_trait::async_trait]
impl StreamResolver for ScriptedResolver {
    async fn resolve(&self, video_id: &str, quality_id: u32) -> Result<ResolvedStream> {
        let Some(&(delay, actual)) = self.script.get(&quality_id) else {
            return Err(BridgeError::Network(format!("no stream for {quality_id}")));
        };
        tokio::time::sleep(delay).await;
        Ok(ResolvedStream {
            source: StreamSource::progressive(format!("https://cdn.test/{video_id}/{actual}.mp4")),
            actual_quality_id: actual,
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub player: Arc<FakePlayer>,
    pub volume: Arc<FakeVolume>,
    pub brightness: Arc<FakeBrightness>,
    pub comments: Arc<StaticComments>,
    pub wall_clock: Arc<ManualClock>,
    pub events: EventBus,
    pub core: CoreConfig,
}

impl Harness {
    pub fn new(comments: Vec<CommentItem>, segments: Vec<SegmentRecord>) -> Self {
        Self::with_resolver(comments, segments, ScriptedResolver::default())
    }

    pub fn with_resolver(
        comments: Vec<CommentItem>,
        segments: Vec<SegmentRecord>,
        resolver: ScriptedResolver,
    ) -> Self {
        let player = Arc::new(FakePlayer::new(600_000));
        let volume = Arc::new(FakeVolume::new(5, 15));
        let brightness = Arc::new(FakeBrightness::new(0.5));
        let comments = Arc::new(StaticComments::new(comments));
        let wall_clock = Arc::new(ManualClock::new(1_000_000));

        let core = CoreConfig::builder()
            .media_player(player.clone())
            .volume_control(volume.clone())
            .brightness_control(brightness.clone())
            .comment_source(comments.clone())
            .stream_resolver(Arc::new(resolver))
            .segment_source(Arc::new(StaticSegments::new(segments)))
            .clock(wall_clock.clone())
            .features(FeatureFlags {
                enable_danmaku: true,
                enable_segment_skip: true,
                enable_gestures: true,
            })
            .build()
            .expect("valid core config");

        Self {
            player,
            volume,
            brightness,
            comments,
            wall_clock,
            events: EventBus::new(256),
            core,
        }
    }

    pub fn overlay(&self) -> DanmakuOverlayManager {
        DanmakuOverlayManager::from_core_config(
            &self.core,
            self.events.clone(),
            ControlSettings::default().danmaku,
        )
    }

    pub fn session(&self, settings: ControlSettings) -> ControlSession {
        ControlSession::new(&self.core, self.events.clone(), SettingsFeed::fixed(settings))
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn now_ms(&self) -> u64 {
        u64::try_from(bridge_traits::Clock::unix_timestamp_millis(self.wall_clock.as_ref()))
            .unwrap()
    }

    /// Advances wall clock and player together.
    pub fn advance(&self, ms: u64) -> u64 {
        self.wall_clock.advance(ms as i64);
        self.player.play_for(ms);
        self.now_ms()
    }
}

pub fn count_events(events: &[CoreEvent], predicate: impl Fn(&CoreEvent) -> bool) -> usize {
    events.iter().filter(|e| predicate(e)).count()
}
