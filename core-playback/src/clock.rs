//! # Playback Clock
//!
//! Thin layer over the host media player that owns the per-video
//! [`PlaybackSession`] and publishes position samples to subscribers.
//!
//! Samples go out on a `watch` channel, so a slow subscriber only ever sees
//! the latest position, never a backlog. Each video load bumps a generation
//! counter that subscribers use to tell "video changed" apart from a seek.

use bridge_traits::{Clock, SharedPlayer, StreamSource, VideoDimensions};
use core_async::sync::watch;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_url_query;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;

/// State of the video currently in the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub video_id: String,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub current_quality_id: u32,
    pub dimensions: VideoDimensions,
    pub generation: u64,
}

/// One position sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClockSnapshot {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    /// Playback rate, `1.0` for normal speed.
    pub speed: f32,
    /// Wall clock time of the sample.
    pub sampled_at_ms: u64,
    /// Video load counter; `0` before the first load.
    pub generation: u64,
}

/// Receiving end of the clock's position samples.
#[derive(Debug, Clone)]
pub struct ClockSubscription {
    receiver: watch::Receiver<ClockSnapshot>,
}

impl ClockSubscription {
    /// The most recent sample, seen or not.
    pub fn latest(&self) -> ClockSnapshot {
        *self.receiver.borrow()
    }

    /// The sample published since the last call, if any.
    pub fn take_changed(&mut self) -> Option<ClockSnapshot> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }
        Some(*self.receiver.borrow_and_update())
    }

    /// Waits for the next sample. Returns `None` once the clock is dropped.
    pub async fn changed(&mut self) -> Option<ClockSnapshot> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }
}

/// Position, transport and source glue around the host media player.
pub struct PlaybackClock {
    player: SharedPlayer,
    wall_clock: Arc<dyn Clock>,
    events: EventBus,
    session: Option<PlaybackSession>,
    generation: u64,
    samples: watch::Sender<ClockSnapshot>,
}

impl PlaybackClock {
    pub fn new(player: SharedPlayer, wall_clock: Arc<dyn Clock>, events: EventBus) -> Self {
        let (samples, _) = watch::channel(ClockSnapshot::default());
        Self {
            player,
            wall_clock,
            events,
            session: None,
            generation: 0,
            samples,
        }
    }

    /// Starts a fresh session for `video_id`, replacing the previous one.
    pub fn load_video(&mut self, video_id: &str, quality_id: u32) -> &PlaybackSession {
        self.generation += 1;
        info!(video_id, quality_id, generation = self.generation, "Video loaded");

        self.events
            .publish(CoreEvent::Playback(PlaybackEvent::VideoLoaded {
                video_id: video_id.to_string(),
                quality_id,
                generation: self.generation,
            }));

        let session = self.session.insert(PlaybackSession {
            video_id: video_id.to_string(),
            position_ms: self.player.position_ms(),
            duration_ms: self.player.duration_ms(),
            is_playing: self.player.is_playing(),
            current_quality_id: quality_id,
            dimensions: self.player.video_dimensions(),
            generation: self.generation,
        });
        let snapshot = ClockSnapshot {
            position_ms: session.position_ms,
            duration_ms: session.duration_ms,
            is_playing: session.is_playing,
            speed: self.player.playback_speed(),
            sampled_at_ms: wall_millis(self.wall_clock.as_ref()),
            generation: self.generation,
        };
        self.samples.send_replace(snapshot);
        session
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn video_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.video_id.as_str())
    }

    pub fn position_ms(&self) -> u64 {
        self.player.position_ms()
    }

    pub fn duration_ms(&self) -> u64 {
        self.player.duration_ms()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn current_quality_id(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.current_quality_id)
    }

    pub fn set_current_quality(&mut self, quality_id: u32) {
        if let Some(session) = self.session.as_mut() {
            session.current_quality_id = quality_id;
        }
    }

    /// Reads the player, refreshes the session and publishes the sample.
    pub fn sample(&mut self) -> ClockSnapshot {
        let snapshot = ClockSnapshot {
            position_ms: self.player.position_ms(),
            duration_ms: self.player.duration_ms(),
            is_playing: self.player.is_playing(),
            speed: self.player.playback_speed(),
            sampled_at_ms: wall_millis(self.wall_clock.as_ref()),
            generation: self.generation,
        };

        if let Some(session) = self.session.as_mut() {
            session.position_ms = snapshot.position_ms;
            session.duration_ms = snapshot.duration_ms;
            session.is_playing = snapshot.is_playing;
            session.dimensions = self.player.video_dimensions();
        }

        self.samples.send_replace(snapshot);
        snapshot
    }

    /// Last published sample.
    pub fn latest(&self) -> ClockSnapshot {
        *self.samples.borrow()
    }

    pub fn subscribe(&self) -> ClockSubscription {
        ClockSubscription {
            receiver: self.samples.subscribe(),
        }
    }

    pub fn play(&mut self) {
        self.player.play();
        let snapshot = self.sample();
        self.events
            .publish(CoreEvent::Playback(PlaybackEvent::Resumed {
                position_ms: snapshot.position_ms,
            }));
    }

    pub fn pause(&mut self) {
        self.player.pause();
        let snapshot = self.sample();
        self.events
            .publish(CoreEvent::Playback(PlaybackEvent::Paused {
                position_ms: snapshot.position_ms,
            }));
    }

    /// Seeks to `position_ms`, clamped to the duration when it is known.
    /// Returns the applied position.
    pub fn seek(&mut self, position_ms: u64) -> u64 {
        let from_ms = self.player.position_ms();
        let duration_ms = self.player.duration_ms();
        let to_ms = if duration_ms > 0 {
            position_ms.min(duration_ms)
        } else {
            position_ms
        };

        debug!(from_ms, to_ms, "Seeking");
        self.player.seek(to_ms);
        self.sample();
        self.events
            .publish(CoreEvent::Playback(PlaybackEvent::Seeked { from_ms, to_ms }));
        to_ms
    }

    /// Replaces the player source, restores `resume_at_ms` and resumes.
    ///
    /// The player instance survives the swap. On error nothing was changed.
    pub fn swap_source(
        &mut self,
        source: StreamSource,
        quality_id: u32,
        resume_at_ms: u64,
    ) -> Result<u64> {
        info!(
            quality_id,
            resume_at_ms,
            url = redact_url_query(source.primary_url()),
            "Swapping stream source"
        );
        self.player.swap_source(source)?;
        self.set_current_quality(quality_id);
        let position_ms = self.seek(resume_at_ms);
        self.play();
        Ok(position_ms)
    }

    /// Marks the current video finished.
    pub fn end_video(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.is_playing = false;
        info!(video_id = %session.video_id, "Video ended");
        self.events.publish(CoreEvent::Playback(PlaybackEvent::Ended {
            video_id: session.video_id.clone(),
        }));
        self.sample();
    }
}

fn wall_millis(clock: &dyn Clock) -> u64 {
    u64::try_from(clock.unix_timestamp_millis()).unwrap_or(0)
}
