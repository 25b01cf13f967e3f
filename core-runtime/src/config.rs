//! # Core Configuration Module
//!
//! Wires host bridges and feature flags into a single [`CoreConfig`].
//!
//! ## Overview
//!
//! The builder collects every collaborator the control surface needs and
//! fails fast with [`Error::CapabilityMissing`] when one is absent, so a
//! misconfigured host breaks at startup instead of on the first drag or
//! quality switch.
//!
//! ## Required Bridges
//!
//! - `MediaPlayer` - transport and source swap
//! - `VolumeControl` / `BrightnessControl` - vertical drag targets
//! - `CommentTrackSource` - comment overlay data
//! - `StreamResolver` - quality tier streams
//!
//! ## Optional Bridges
//!
//! - `SegmentSource` - skip segments (required when segment skipping is enabled)
//! - `Clock` - defaults to [`SystemClock`]
//! - `LoggerSink` - host log forwarding
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_player(Arc::new(ExoPlayerBridge::new(player)))
//!     .volume_control(Arc::new(AudioManagerBridge::new(ctx)))
//!     .brightness_control(Arc::new(WindowBrightness::new(window)))
//!     .comment_source(Arc::new(DanmakuApi::new(http)))
//!     .stream_resolver(Arc::new(PlayUrlApi::new(http)))
//!     .segment_source(Arc::new(SponsorBlockApi::new(http)))
//!     .enable_segment_skip(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    BrightnessControl, Clock, CommentTrackSource, LoggerSink, MediaPlayer, SegmentSource,
    StreamResolver, SystemClock, VolumeControl,
};
use std::sync::Arc;

/// Core configuration for the playback control surface.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Underlying media player (required)
    pub media_player: Arc<dyn MediaPlayer>,

    /// Stream volume (required)
    pub volume_control: Arc<dyn VolumeControl>,

    /// Screen brightness (required)
    pub brightness_control: Arc<dyn BrightnessControl>,

    /// Comment track fetcher (required)
    pub comment_source: Arc<dyn CommentTrackSource>,

    /// Quality tier stream resolver (required)
    pub stream_resolver: Arc<dyn StreamResolver>,

    /// Skip segment fetcher (optional)
    pub segment_source: Option<Arc<dyn SegmentSource>>,

    /// Wall clock driving the polling schedules
    pub clock: Arc<dyn Clock>,

    /// Host log forwarding (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Per-subscriber event buffer
    pub event_buffer_size: usize,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_player", &"MediaPlayer { ... }")
            .field("volume_control", &"VolumeControl { ... }")
            .field("brightness_control", &"BrightnessControl { ... }")
            .field("comment_source", &"CommentTrackSource { ... }")
            .field("stream_resolver", &"StreamResolver { ... }")
            .field(
                "segment_source",
                &self.segment_source.as_ref().map(|_| "SegmentSource { ... }"),
            )
            .field("clock", &"Clock { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Comment overlay rendering
    pub enable_danmaku: bool,

    /// Sponsor/intro segment detection (requires SegmentSource)
    pub enable_segment_skip: bool,

    /// Seek/brightness/volume drag gestures
    pub enable_gestures: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_danmaku: true,
            enable_segment_skip: false,
            enable_gestures: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The event buffer can hold at least one event
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.features.enable_segment_skip && self.segment_source.is_none() {
            return Err(Error::Config(
                "Segment skipping enabled but no SegmentSource provided. \
                 Disable the feature or inject a SegmentSource implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_player: Option<Arc<dyn MediaPlayer>>,
    volume_control: Option<Arc<dyn VolumeControl>>,
    brightness_control: Option<Arc<dyn BrightnessControl>>,
    comment_source: Option<Arc<dyn CommentTrackSource>>,
    stream_resolver: Option<Arc<dyn StreamResolver>>,
    segment_source: Option<Arc<dyn SegmentSource>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    event_buffer_size: Option<usize>,
    features: Option<FeatureFlags>,
}

impl CoreConfigBuilder {
    pub fn media_player(mut self, player: Arc<dyn MediaPlayer>) -> Self {
        self.media_player = Some(player);
        self
    }

    pub fn volume_control(mut self, volume: Arc<dyn VolumeControl>) -> Self {
        self.volume_control = Some(volume);
        self
    }

    pub fn brightness_control(mut self, brightness: Arc<dyn BrightnessControl>) -> Self {
        self.brightness_control = Some(brightness);
        self
    }

    pub fn comment_source(mut self, source: Arc<dyn CommentTrackSource>) -> Self {
        self.comment_source = Some(source);
        self
    }

    pub fn stream_resolver(mut self, resolver: Arc<dyn StreamResolver>) -> Self {
        self.stream_resolver = Some(resolver);
        self
    }

    pub fn segment_source(mut self, source: Arc<dyn SegmentSource>) -> Self {
        self.segment_source = Some(source);
        self
    }

    /// Overrides the wall clock (tests inject a `ManualClock`).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_danmaku(mut self, enabled: bool) -> Self {
        self.features_mut().enable_danmaku = enabled;
        self
    }

    pub fn enable_segment_skip(mut self, enabled: bool) -> Self {
        self.features_mut().enable_segment_skip = enabled;
        self
    }

    pub fn enable_gestures(mut self, enabled: bool) -> Self {
        self.features_mut().enable_gestures = enabled;
        self
    }

    /// Replaces all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }

    fn features_mut(&mut self) -> &mut FeatureFlags {
        self.features.get_or_insert_with(FeatureFlags::default)
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] naming the first absent required bridge
    /// - [`Error::Config`] when feature flags and bridges disagree
    pub fn build(self) -> Result<CoreConfig> {
        let media_player = self.media_player.ok_or_else(|| {
            Error::capability_missing(
                "MediaPlayer",
                "A MediaPlayer implementation is required to control playback. \
                 Android: wrap the ExoPlayer instance. iOS: wrap AVPlayer.",
            )
        })?;

        let volume_control = self.volume_control.ok_or_else(|| {
            Error::capability_missing(
                "VolumeControl",
                "VolumeControl is required for vertical volume gestures. \
                 Android: AudioManager STREAM_MUSIC. iOS: MPVolumeView.",
            )
        })?;

        let brightness_control = self.brightness_control.ok_or_else(|| {
            Error::capability_missing(
                "BrightnessControl",
                "BrightnessControl is required for vertical brightness gestures. \
                 Android: window screenBrightness. iOS: UIScreen brightness.",
            )
        })?;

        let comment_source = self.comment_source.ok_or_else(|| {
            Error::capability_missing(
                "CommentTrackSource",
                "CommentTrackSource is required to load comment overlay tracks.",
            )
        })?;

        let stream_resolver = self.stream_resolver.ok_or_else(|| {
            Error::capability_missing(
                "StreamResolver",
                "StreamResolver is required to resolve quality tier streams.",
            )
        })?;

        let config = CoreConfig {
            media_player,
            volume_control,
            brightness_control,
            comment_source,
            stream_resolver,
            segment_source: self.segment_source,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
