//! In-memory bridge implementations shared by the unit tests.

use bridge_traits::{
    error::Result, BridgeError, CommentItem, CommentTrackSource, MediaPlayer, RenderFrame,
    RenderSurface, StreamSource, SurfaceId, VideoDimensions,
};
use std::sync::Mutex;

#[derive(Debug)]
struct PlayerState {
    position_ms: u64,
    duration_ms: u64,
    is_playing: bool,
    speed: f32,
    fail_next_swap: bool,
    swapped: Vec<StreamSource>,
}

/// Player whose position only moves when a test moves it.
#[derive(Debug)]
pub(crate) struct FakePlayer {
    state: Mutex<PlayerState>,
}

impl FakePlayer {
    pub(crate) fn new(duration_ms: u64) -> Self {
        Self {
            state: Mutex::new(PlayerState {
                position_ms: 0,
                duration_ms,
                is_playing: false,
                speed: 1.0,
                fail_next_swap: false,
                swapped: Vec::new(),
            }),
        }
    }

    pub(crate) fn set_position(&self, position_ms: u64) {
        self.state.lock().unwrap().position_ms = position_ms;
    }

    pub(crate) fn set_duration(&self, duration_ms: u64) {
        self.state.lock().unwrap().duration_ms = duration_ms;
    }

    pub(crate) fn set_playing(&self, is_playing: bool) {
        self.state.lock().unwrap().is_playing = is_playing;
    }

    pub(crate) fn set_speed(&self, speed: f32) {
        self.state.lock().unwrap().speed = speed;
    }

    pub(crate) fn fail_next_swap(&self) {
        self.state.lock().unwrap().fail_next_swap = true;
    }

    pub(crate) fn swapped(&self) -> Vec<StreamSource> {
        self.state.lock().unwrap().swapped.clone()
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
        if std::mem::take(&mut state.fail_next_swap) {
            return Err(BridgeError::OperationFailed("decoder rejected source".into()));
        }
        state.swapped.push(source);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SurfaceLog {
    spawned: Vec<String>,
    seeds: Vec<u64>,
    clears: usize,
    pauses: usize,
    renders: usize,
}

/// Surface that records every call.
#[derive(Debug)]
pub(crate) struct FakeSurface {
    id: SurfaceId,
    log: Mutex<SurfaceLog>,
}

impl FakeSurface {
    pub(crate) fn new() -> Self {
        Self::with_id(SurfaceId::new())
    }

    pub(crate) fn with_id(id: SurfaceId) -> Self {
        Self {
            id,
            log: Mutex::new(SurfaceLog::default()),
        }
    }

    /// Text of every spawned comment, across all frames.
    pub(crate) fn spawned_texts(&self) -> Vec<String> {
        self.log.lock().unwrap().spawned.clone()
    }

    pub(crate) fn clear_count(&self) -> usize {
        self.log.lock().unwrap().clears
    }

    pub(crate) fn seed_count(&self) -> usize {
        self.log.lock().unwrap().seeds.len()
    }

    pub(crate) fn last_seed(&self) -> Option<u64> {
        self.log.lock().unwrap().seeds.last().copied()
    }

    pub(crate) fn pause_count(&self) -> usize {
        self.log.lock().unwrap().pauses
    }

    pub(crate) fn render_count(&self) -> usize {
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

/// Comment source that always answers with the same list.
pub(crate) struct StaticComments {
    comments: Vec<CommentItem>,
}

impl StaticComments {
    pub(crate) fn new(comments: Vec<CommentItem>) -> Self {
        Self { comments }
    }
}

#[async_trait::async_trait]
impl CommentTrackSource for StaticComments {
    async fn load_track(&self, _track_id: &str) -> Result<Vec<CommentItem>> {
        Ok(self.comments.clone())
    }
}
