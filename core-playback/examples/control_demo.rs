//! # Playback Control Example
//!
//! Drives a control session against an in-memory player for a few seconds:
//! the comment overlay renders to a console surface, a sponsor segment gets
//! skipped automatically and a quality switch lands mid-playback.
//!
//! Run with: `cargo run --example control_demo --package core-playback`

use bridge_traits::{
    error::Result as BridgeResult, BrightnessControl, CommentItem, CommentTrackSource, LogLevel,
    MediaPlayer, RenderFrame, RenderSurface, ResolvedStream, SegmentRecord, SegmentSource,
    StreamResolver, StreamSource, SurfaceId, SystemClock, VideoDimensions, VolumeControl,
};
use core_async::CancellationToken;
use core_playback::{ControlSession, ControlSettings, DanmakuOverlayManager, SettingsFeed};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// In-memory player
// ============================================================================

/// Player whose position follows the wall clock while playing.
struct DemoPlayer {
    state: Mutex<(u64, Option<Instant>)>,
    duration_ms: u64,
}

impl DemoPlayer {
    fn new(duration_ms: u64) -> Self {
        Self {
            state: Mutex::new((0, None)),
            duration_ms,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (u64, Option<Instant>)> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MediaPlayer for DemoPlayer {
    fn play(&self) {
        let mut state = self.lock();
        if state.1.is_none() {
            state.1 = Some(Instant::now());
        }
    }

    fn pause(&self) {
        let position = self.position_ms();
        *self.lock() = (position, None);
    }

    fn seek(&self, position_ms: u64) {
        let mut state = self.lock();
        state.0 = position_ms.min(self.duration_ms);
        if state.1.is_some() {
            state.1 = Some(Instant::now());
        }
    }

    fn position_ms(&self) -> u64 {
        let (base, started) = *self.lock();
        let played = started.map_or(0, |t| t.elapsed().as_millis() as u64);
        (base + played).min(self.duration_ms)
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn is_playing(&self) -> bool {
        self.lock().1.is_some()
    }

    fn video_dimensions(&self) -> VideoDimensions {
        VideoDimensions::new(1280, 720)
    }

    fn swap_source(&self, source: StreamSource) -> BridgeResult<()> {
        println!("  [player] now playing {}", source.primary_url());
        Ok(())
    }
}

// ============================================================================
// Console bridges
// ============================================================================

struct ConsoleSurface(SurfaceId);

impl RenderSurface for ConsoleSurface {
    fn surface_id(&self) -> SurfaceId {
        self.0
    }

    fn seed(&self, position_ms: u64) {
        println!("  [overlay] seeded at {position_ms} ms");
    }

    fn render(&self, frame: &RenderFrame) {
        for comment in &frame.spawned {
            println!("  [overlay] {:>6} ms  {}", frame.position_ms, comment.text);
        }
    }

    fn pause(&self) {}

    fn clear(&self) {}
}

struct FixedVolume;

impl VolumeControl for FixedVolume {
    fn max_volume(&self) -> u32 {
        15
    }

    fn volume(&self) -> u32 {
        7
    }

    fn set_volume(&self, _volume: u32) -> BridgeResult<()> {
        Ok(())
    }
}

struct FixedBrightness;

impl BrightnessControl for FixedBrightness {
    fn brightness(&self) -> f32 {
        0.5
    }

    fn set_brightness(&self, _brightness: f32) -> BridgeResult<()> {
        Ok(())
    }
}

struct DemoComments;

#[async_trait::async_trait]
impl CommentTrackSource for DemoComments {
    async fn load_track(&self, _track_id: &str) -> BridgeResult<Vec<CommentItem>> {
        Ok(vec![
            CommentItem::new(300, "first!"),
            CommentItem::new(900, "the intro again"),
            CommentItem::new(2_600, "thanks for skipping the ad"),
            CommentItem::new(3_200, "spoiler: it works"),
        ])
    }
}

struct DemoSegments;

#[async_trait::async_trait]
impl SegmentSource for DemoSegments {
    async fn load_segments(
        &self,
        _video_id: &str,
        _track_id: &str,
    ) -> BridgeResult<Vec<SegmentRecord>> {
        Ok(vec![SegmentRecord {
            start_ms: 1_200,
            end_ms: 2_500,
            category: "sponsor".to_string(),
            segment_id: "ad-1".to_string(),
        }])
    }
}

struct DemoResolver;

#[async_trait::async_trait]
impl StreamResolver for DemoResolver {
    async fn resolve(&self, video_id: &str, quality_id: u32) -> BridgeResult<ResolvedStream> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(ResolvedStream {
            source: StreamSource::progressive(format!(
                "https://cdn.example/{video_id}/{quality_id}.mp4"
            )),
            actual_quality_id: quality_id,
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Warn),
    )?;

    println!("=== Playback Control Demo ===\n");

    let player = Arc::new(DemoPlayer::new(4_000));
    let core = CoreConfig::builder()
        .media_player(player.clone())
        .volume_control(Arc::new(FixedVolume))
        .brightness_control(Arc::new(FixedBrightness))
        .comment_source(Arc::new(DemoComments))
        .stream_resolver(Arc::new(DemoResolver))
        .segment_source(Arc::new(DemoSegments))
        .clock(Arc::new(SystemClock))
        .enable_segment_skip(true)
        .build()?;

    let events = EventBus::new(64);
    let mut notices = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = notices.recv().await {
            if matches!(event, CoreEvent::Segment(_) | CoreEvent::Quality(_)) {
                println!("  [event] {}", event.description());
            }
        }
    });

    let mut settings = ControlSettings::default();
    settings.danmaku.block_rules = vec!["spoiler".to_string()];
    settings.check()?;

    let mut overlay =
        DanmakuOverlayManager::from_core_config(&core, events.clone(), settings.danmaku.clone());
    let mut session = ControlSession::new(&core, events, SettingsFeed::fixed(settings));

    session.load_video("BV1demo", "cid-demo", 64, &mut overlay);
    session.settle_loads(&mut overlay).await;
    overlay.attach_surface(Arc::new(ConsoleSurface(SurfaceId::new())));

    player.play();
    let now_ms = core_async::time::now_millis();
    session.on_playback_state_changed(true, now_ms, &mut overlay);
    session.switch_quality(80)?;

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3_800)).await;
        stop.cancel();
    });
    session.run(&mut overlay, cancel).await;

    // Fullscreen toggle: a new surface picks up at the current position.
    overlay.attach_surface(Arc::new(ConsoleSurface(SurfaceId::new())));

    session.set_viewport(1280.0, 720.0);
    session.drag_start();
    let update = session.drag(0.0, -144.0, 200.0);
    println!("  [gesture] {update:?}");
    session.drag_end(&mut overlay);

    println!(
        "\nStopped at {} ms on quality {}",
        session.clock().position_ms(),
        session.quality().current_quality_id()
    );
    session.leave(&mut overlay);
    println!("Overlay kept track: {:?}", overlay.loaded_track_id());

    Ok(())
}
