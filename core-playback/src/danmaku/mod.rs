//! # Comment Overlay
//!
//! [`DanmakuOverlayManager`] is the long-lived owner of the comment track and
//! of the binding between that track, the playback clock and whichever render
//! surface is currently on screen.
//!
//! ## Lifetime
//!
//! The application root creates exactly one manager and keeps it for the
//! whole process. Player screens, fullscreen views and the mini-player only
//! borrow it to attach or detach their surface; none of them own it. That is
//! what lets the comment timeline survive surface teardown.
//!
//! ## Timeline
//!
//! The manager keeps a cursor into the time-sorted comment list. Each clock
//! sample either advances the cursor and renders the comments it passed, or,
//! on a discontinuity (seek, video change), clears the screen and reseeds the
//! surface at the new position instead of animating through the gap.
//!
//! ## Track loading
//!
//! Fetching is split into [`DanmakuOverlayManager::request_track`], a detached
//! [`TrackRequest::fetch`] and [`DanmakuOverlayManager::apply_track`], so the
//! driving loop never waits on the network. [`DanmakuOverlayManager::load_track`]
//! chains the three for callers that can.

pub mod config;
pub mod filter;

use bridge_traits::{
    CommentItem, CommentStyle, RenderFrame, SharedCommentSource, SharedSurface,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, OverlayEvent};
use std::collections::VecDeque;
use tracing::{debug, info, instrument, warn};

use crate::clock::{ClockSnapshot, ClockSubscription};
use crate::error::{ControlError, Result};

pub use config::DanmakuConfig;
pub use filter::CommentFilter;

/// Default position discontinuity treated as a seek.
pub const DEFAULT_JUMP_THRESHOLD_MS: u64 = 1_000;

/// What [`DanmakuOverlayManager::load_track`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLoad {
    /// The track is already loaded or being fetched.
    AlreadyLoaded,
    /// The overlay is disabled; the fetch waits for re-enabling.
    Deferred,
    Loaded { comment_count: usize },
    /// Fetch failed; whatever was loaded before stays.
    Unavailable,
    /// A newer request replaced this one while it was in flight.
    Stale,
}

/// Pending comment track fetch, detached from the manager.
pub struct TrackRequest {
    source: SharedCommentSource,
    track_id: String,
}

impl TrackRequest {
    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    #[instrument(skip(self), fields(track_id = %self.track_id))]
    pub async fn fetch(self) -> TrackFetch {
        let result = self
            .source
            .load_track(&self.track_id)
            .await
            .map_err(|e| ControlError::TrackUnavailable(e.to_string()));
        TrackFetch {
            track_id: self.track_id,
            result,
        }
    }
}

/// Completed comment track fetch.
pub struct TrackFetch {
    pub track_id: String,
    pub result: Result<Vec<CommentItem>>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    expires_at_ms: u64,
}

/// Render cursor over the comment list.
#[derive(Debug, Default)]
struct Timeline {
    /// Index of the first comment not yet emitted.
    cursor: usize,
    in_flight: VecDeque<InFlight>,
    last: Option<ClockSnapshot>,
}

/// Process-wide comment overlay.
pub struct DanmakuOverlayManager {
    source: SharedCommentSource,
    events: EventBus,
    config: DanmakuConfig,
    filter: CommentFilter,
    jump_threshold_ms: u64,

    /// Sorted by `time_ms`.
    comments: Vec<CommentItem>,
    loaded_track_id: Option<String>,
    /// Latest track asked for; differs from `loaded_track_id` while a fetch
    /// is pending or deferred.
    requested_track_id: Option<String>,
    fetch_in_flight: bool,

    surface: Option<SharedSurface>,
    clock: Option<ClockSubscription>,
    timeline: Timeline,
}

impl DanmakuOverlayManager {
    pub fn new(source: SharedCommentSource, events: EventBus, config: DanmakuConfig) -> Self {
        let config = config.clamped();
        let filter = CommentFilter::new(&config.block_rules);
        Self {
            source,
            events,
            config,
            filter,
            jump_threshold_ms: DEFAULT_JUMP_THRESHOLD_MS,
            comments: Vec::new(),
            loaded_track_id: None,
            requested_track_id: None,
            fetch_in_flight: false,
            surface: None,
            clock: None,
            timeline: Timeline::default(),
        }
    }

    /// Builds the manager from the host wiring.
    pub fn from_core_config(core: &CoreConfig, events: EventBus, config: DanmakuConfig) -> Self {
        Self::new(core.comment_source.clone(), events, config)
    }

    pub fn config(&self) -> &DanmakuConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn loaded_track_id(&self) -> Option<&str> {
        self.loaded_track_id.as_deref()
    }

    pub fn comments(&self) -> &[CommentItem] {
        &self.comments
    }

    pub fn in_flight(&self) -> usize {
        self.timeline.in_flight.len()
    }

    pub fn bound_surface(&self) -> Option<&SharedSurface> {
        self.surface.as_ref()
    }

    pub fn has_clock(&self) -> bool {
        self.clock.is_some()
    }

    pub fn set_jump_threshold_ms(&mut self, threshold_ms: u64) {
        self.jump_threshold_ms = threshold_ms;
    }

    /// Position the overlay currently renders at.
    pub fn position_ms(&self) -> u64 {
        self.current_snapshot().map_or(0, |s| s.position_ms)
    }

    fn current_snapshot(&self) -> Option<ClockSnapshot> {
        self.clock
            .as_ref()
            .map(ClockSubscription::latest)
            .or(self.timeline.last)
    }

    // ========================================================================
    // Surface binding
    // ========================================================================

    /// Binds `surface`, detaching any different surface first.
    ///
    /// The new surface is seeded at the current clock position so comments
    /// resume where they were instead of restarting at zero. Attaching the
    /// surface that is already bound does nothing.
    pub fn attach_surface(&mut self, surface: SharedSurface) {
        let surface_id = surface.surface_id();
        if let Some(current) = &self.surface {
            if current.surface_id() == surface_id {
                debug!(%surface_id, "Surface already attached");
                return;
            }
        }
        self.detach_surface();

        let snapshot = self.current_snapshot();
        let position_ms = snapshot.map_or(0, |s| s.position_ms);
        if snapshot.is_some() {
            self.timeline.last = snapshot;
        }
        self.surface = Some(surface);
        self.reseed(position_ms);
        if !snapshot.is_some_and(|s| s.is_playing) || !self.config.enabled {
            self.pause_surface();
        }

        info!(%surface_id, position_ms, "Overlay surface attached");
        self.events
            .publish(CoreEvent::Overlay(OverlayEvent::SurfaceAttached {
                surface_id: surface_id.to_string(),
                position_ms,
            }));
    }

    /// Pauses, clears and unbinds the current surface. The track stays.
    pub fn detach_surface(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        surface.pause();
        surface.clear();
        self.timeline.in_flight.clear();

        let surface_id = surface.surface_id();
        info!(%surface_id, "Overlay surface detached");
        self.events
            .publish(CoreEvent::Overlay(OverlayEvent::SurfaceDetached {
                surface_id: surface_id.to_string(),
            }));
    }

    // ========================================================================
    // Clock binding
    // ========================================================================

    /// Follows `clock` from now on, reseeding at its latest sample.
    pub fn attach_playback_clock(&mut self, clock: ClockSubscription) {
        let snapshot = clock.latest();
        self.clock = Some(clock);
        self.timeline.last = Some(snapshot);
        self.reseed(snapshot.position_ms);
        if !snapshot.is_playing {
            self.pause_surface();
        }
        debug!(
            position_ms = snapshot.position_ms,
            generation = snapshot.generation,
            "Playback clock attached"
        );
    }

    /// Stops following the clock; rendering freezes where it is.
    pub fn detach_playback_clock(&mut self) {
        if self.clock.take().is_some() {
            self.pause_surface();
            debug!("Playback clock detached");
        }
    }

    /// Processes the clock's newest sample, if one arrived.
    pub fn sync(&mut self) {
        let Some(snapshot) = self.clock.as_mut().and_then(ClockSubscription::take_changed) else {
            return;
        };
        self.on_clock_tick(snapshot);
    }

    /// Advances the timeline to `snapshot`.
    pub fn on_clock_tick(&mut self, snapshot: ClockSnapshot) {
        let Some(previous) = self.timeline.last.replace(snapshot) else {
            self.reseed(snapshot.position_ms);
            return;
        };

        if snapshot.generation != previous.generation {
            debug!(generation = snapshot.generation, "Video changed, reseeding overlay");
            self.reseed(snapshot.position_ms);
            if !snapshot.is_playing {
                self.pause_surface();
            }
            return;
        }

        if self.is_jump(&previous, &snapshot) {
            debug!(
                from_ms = previous.position_ms,
                to_ms = snapshot.position_ms,
                "Position jump, reseeding overlay"
            );
            self.reseed(snapshot.position_ms);
            if !snapshot.is_playing {
                self.pause_surface();
            }
            return;
        }

        if !snapshot.is_playing {
            if previous.is_playing {
                self.pause_surface();
            }
            return;
        }

        self.advance(&snapshot);
    }

    fn is_jump(&self, previous: &ClockSnapshot, current: &ClockSnapshot) -> bool {
        let expected = if previous.is_playing {
            let elapsed = current.sampled_at_ms.saturating_sub(previous.sampled_at_ms) as f64;
            previous.position_ms as f64 + elapsed * f64::from(previous.speed.max(0.0))
        } else {
            previous.position_ms as f64
        };
        (current.position_ms as f64 - expected).abs() > self.jump_threshold_ms as f64
    }

    /// Emits the comments passed since the last frame and renders.
    fn advance(&mut self, snapshot: &ClockSnapshot) {
        if !self.config.enabled {
            return;
        }
        let Some(surface) = self.surface.clone() else {
            return;
        };

        let position_ms = snapshot.position_ms;
        let timeline = &mut self.timeline;
        timeline.in_flight.retain(|c| c.expires_at_ms > position_ms);

        let mut spawned = Vec::new();
        while let Some(comment) = self.comments.get(timeline.cursor) {
            if comment.time_ms > position_ms {
                break;
            }
            timeline.cursor += 1;
            if !self.config.allows(&comment.style) || self.filter.is_blocked(&comment.text) {
                continue;
            }
            timeline.in_flight.push_back(InFlight {
                expires_at_ms: comment
                    .time_ms
                    .saturating_add(self.config.lifetime_ms(comment.style.mode)),
            });
            spawned.push(comment.clone());
        }

        surface.render(&RenderFrame {
            position_ms,
            rate: snapshot.speed,
            spawned,
            in_flight: timeline.in_flight.len(),
            style: self.config.overlay_style(snapshot.speed),
        });
    }

    /// Drops everything on screen and restarts the timeline at `position_ms`.
    fn reseed(&mut self, position_ms: u64) {
        self.timeline.in_flight.clear();
        self.timeline.cursor = self.comments.partition_point(|c| c.time_ms < position_ms);
        if let Some(surface) = &self.surface {
            surface.clear();
            if self.config.enabled {
                surface.seed(position_ms);
            }
        }
    }

    fn pause_surface(&self) {
        if let Some(surface) = &self.surface {
            surface.pause();
        }
    }

    // ========================================================================
    // Track loading
    // ========================================================================

    /// Registers `track_id` as the track to show and returns the fetch to
    /// run, if one is needed now.
    ///
    /// Returns `None` when the track is already loaded or in flight, or when
    /// the overlay is disabled. In the last case the previous track is
    /// dropped and the fetch is deferred until re-enabling.
    pub fn request_track(&mut self, track_id: &str) -> Option<TrackRequest> {
        if self.loaded_track_id.as_deref() == Some(track_id) {
            self.requested_track_id = Some(track_id.to_string());
            self.fetch_in_flight = false;
            debug!(track_id, "Comment track already loaded");
            return None;
        }
        if self.requested_track_id.as_deref() == Some(track_id)
            && (self.fetch_in_flight || !self.config.enabled)
        {
            debug!(track_id, "Comment track already requested");
            return None;
        }

        self.requested_track_id = Some(track_id.to_string());
        if !self.config.enabled {
            debug!(track_id, "Overlay disabled, deferring comment track");
            self.fetch_in_flight = false;
            self.comments.clear();
            self.loaded_track_id = None;
            self.reseed(self.position_ms());
            return None;
        }

        self.fetch_in_flight = true;
        Some(TrackRequest {
            source: self.source.clone(),
            track_id: track_id.to_string(),
        })
    }

    /// Returns the deferred fetch once the overlay is enabled again.
    pub fn take_pending_request(&mut self) -> Option<TrackRequest> {
        if !self.config.enabled || self.fetch_in_flight {
            return None;
        }
        let track_id = self.requested_track_id.clone()?;
        if self.loaded_track_id.as_deref() == Some(track_id.as_str()) {
            return None;
        }
        self.fetch_in_flight = true;
        Some(TrackRequest {
            source: self.source.clone(),
            track_id,
        })
    }

    /// Installs a completed fetch.
    pub fn apply_track(&mut self, fetch: TrackFetch) -> TrackLoad {
        if self.requested_track_id.as_deref() != Some(fetch.track_id.as_str()) {
            debug!(track_id = %fetch.track_id, "Discarding superseded comment track");
            return TrackLoad::Stale;
        }
        self.fetch_in_flight = false;

        match fetch.result {
            Ok(mut comments) => {
                comments.sort_by_key(|c| c.time_ms);
                let comment_count = comments.len();
                self.comments = comments;
                self.loaded_track_id = Some(fetch.track_id.clone());
                self.reseed(self.position_ms());

                info!(track_id = %fetch.track_id, comment_count, "Comment track loaded");
                self.events
                    .publish(CoreEvent::Overlay(OverlayEvent::TrackLoaded {
                        track_id: fetch.track_id,
                        comment_count,
                    }));
                TrackLoad::Loaded { comment_count }
            }
            Err(e) => {
                warn!(track_id = %fetch.track_id, error = %e, "Comment track unavailable");
                // No automatic retry; asking for the track again refetches it.
                self.requested_track_id = self.loaded_track_id.clone();
                self.events
                    .publish(CoreEvent::Overlay(OverlayEvent::TrackUnavailable {
                        track_id: fetch.track_id,
                        reason: e.to_string(),
                    }));
                TrackLoad::Unavailable
            }
        }
    }

    /// Loads `track_id` unless it is already loaded.
    pub async fn load_track(&mut self, track_id: &str) -> TrackLoad {
        match self.request_track(track_id) {
            Some(request) => {
                let fetch = request.fetch().await;
                self.apply_track(fetch)
            }
            None if self.config.enabled => TrackLoad::AlreadyLoaded,
            None => TrackLoad::Deferred,
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Shows or hides the overlay.
    ///
    /// Hiding clears the screen but keeps the parsed track, so showing it
    /// again resumes at the current position without a refetch.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled == enabled {
            return;
        }
        self.config.enabled = enabled;

        if enabled {
            let snapshot = self.current_snapshot();
            self.reseed(snapshot.map_or(0, |s| s.position_ms));
            if !snapshot.is_some_and(|s| s.is_playing) {
                self.pause_surface();
            }
        } else {
            self.timeline.in_flight.clear();
            if let Some(surface) = &self.surface {
                surface.clear();
            }
        }

        info!(enabled, "Overlay visibility changed");
        self.events
            .publish(CoreEvent::Overlay(OverlayEvent::EnabledChanged { enabled }));
    }

    /// Applies new settings. Style changes show on the next frame; the
    /// track is never reloaded.
    pub fn set_config(&mut self, config: DanmakuConfig) {
        let config = config.clamped();
        if config.block_rules != self.config.block_rules {
            self.filter = CommentFilter::new(&config.block_rules);
            debug!(rules = self.filter.len(), "Comment block rules updated");
        }
        let enabled = config.enabled;
        self.config = DanmakuConfig {
            enabled: self.config.enabled,
            ..config
        };
        self.set_enabled(enabled);
    }

    /// Inserts the user's own comment at the current position so it shows
    /// on the next frame.
    pub fn add_local_comment(&mut self, text: impl Into<String>, style: CommentStyle) {
        let time_ms = self.position_ms();
        let comment = CommentItem::new(time_ms, text).with_style(style);

        // Never before the cursor, or it would be skipped.
        let index = self
            .comments
            .partition_point(|c| c.time_ms <= time_ms)
            .max(self.timeline.cursor.min(self.comments.len()));
        self.comments.insert(index, comment);
        debug!(time_ms, "Local comment added");
    }
}
