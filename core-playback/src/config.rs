//! # Control Settings
//!
//! User configuration read by the control surface, and the live feed that
//! delivers changes to it.
//!
//! The settings store itself lives in the host. It pushes new values through a
//! [`SettingsPublisher`]; the control session picks them up on its next tick.

use core_async::sync::watch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::danmaku::config::{clamp_or, DanmakuConfig};
use crate::error::ControlError;
use crate::segments::SegmentCategory;

pub const SENSITIVITY_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Settings consumed by the playback control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    /// Gesture multiplier, `0.5..=2.0`.
    ///
    /// Default: 1.0.
    #[serde(default = "default_gesture_sensitivity")]
    pub gesture_sensitivity: f32,

    #[serde(default)]
    pub danmaku: DanmakuConfig,

    #[serde(default)]
    pub sponsor: SponsorSettings,

    /// Clock sampling and overlay sync period.
    ///
    /// Default: 100 ms.
    #[serde(default = "default_clock_tick_interval_ms")]
    pub clock_tick_interval_ms: u64,

    /// Skip segment polling period.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_segment_poll_interval_ms")]
    pub segment_poll_interval_ms: u64,

    /// Position discontinuity treated as a seek by the overlay.
    ///
    /// Default: 1000 ms.
    #[serde(default = "default_seek_jump_threshold_ms")]
    pub seek_jump_threshold_ms: u64,

    /// Media milliseconds per horizontal pixel at sensitivity 1.0.
    ///
    /// Default: 200.
    #[serde(default = "default_seek_ms_per_px")]
    pub seek_ms_per_px: f32,

    /// Minimum brightness/volume fraction change forwarded to the system.
    ///
    /// Default: 0.02.
    #[serde(default = "default_system_apply_epsilon")]
    pub system_apply_epsilon: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            gesture_sensitivity: default_gesture_sensitivity(),
            danmaku: DanmakuConfig::default(),
            sponsor: SponsorSettings::default(),
            clock_tick_interval_ms: default_clock_tick_interval_ms(),
            segment_poll_interval_ms: default_segment_poll_interval_ms(),
            seek_jump_threshold_ms: default_seek_jump_threshold_ms(),
            seek_ms_per_px: default_seek_ms_per_px(),
            system_apply_epsilon: default_system_apply_epsilon(),
        }
    }
}

impl ControlSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !SENSITIVITY_RANGE.contains(&self.gesture_sensitivity) {
            return Err("gesture_sensitivity must be between 0.5 and 2.0".to_string());
        }

        self.danmaku.validate()?;

        if self.clock_tick_interval_ms == 0 {
            return Err("clock_tick_interval_ms must be > 0".to_string());
        }

        if self.segment_poll_interval_ms == 0 {
            return Err("segment_poll_interval_ms must be > 0".to_string());
        }

        if !(self.seek_ms_per_px.is_finite() && self.seek_ms_per_px > 0.0) {
            return Err("seek_ms_per_px must be > 0".to_string());
        }

        if !(0.0..1.0).contains(&self.system_apply_epsilon) {
            return Err("system_apply_epsilon must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }

    /// Like [`validate`](Self::validate) but with the control error type.
    pub fn check(&self) -> crate::error::Result<()> {
        self.validate().map_err(ControlError::InvalidSettings)
    }

    /// Returns a copy with every ranged field coerced into range.
    ///
    /// The settings store is outside this crate, so values are clamped on
    /// arrival instead of rejected.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            gesture_sensitivity: clamp_or(
                self.gesture_sensitivity,
                &SENSITIVITY_RANGE,
                defaults.gesture_sensitivity,
            ),
            danmaku: self.danmaku.clamped(),
            sponsor: self.sponsor.clone(),
            clock_tick_interval_ms: self.clock_tick_interval_ms.max(1),
            segment_poll_interval_ms: self.segment_poll_interval_ms.max(1),
            seek_jump_threshold_ms: self.seek_jump_threshold_ms,
            seek_ms_per_px: if self.seek_ms_per_px.is_finite() && self.seek_ms_per_px > 0.0 {
                self.seek_ms_per_px
            } else {
                defaults.seek_ms_per_px
            },
            system_apply_epsilon: clamp_or(
                self.system_apply_epsilon,
                &(0.0..=0.5),
                defaults.system_apply_epsilon,
            ),
        }
    }
}

/// Sponsor segment preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorSettings {
    /// Jump over segments instead of showing a skip button.
    #[serde(default = "default_auto_skip")]
    pub auto_skip: bool,

    /// Categories acted on. Others play through untouched.
    #[serde(default = "SegmentCategory::default_enabled")]
    pub categories: BTreeSet<SegmentCategory>,
}

impl Default for SponsorSettings {
    fn default() -> Self {
        Self {
            auto_skip: default_auto_skip(),
            categories: SegmentCategory::default_enabled(),
        }
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_gesture_sensitivity() -> f32 {
    1.0
}

fn default_clock_tick_interval_ms() -> u64 {
    100
}

fn default_segment_poll_interval_ms() -> u64 {
    500
}

fn default_seek_jump_threshold_ms() -> u64 {
    1_000
}

fn default_seek_ms_per_px() -> f32 {
    200.0
}

fn default_system_apply_epsilon() -> f32 {
    0.02
}

fn default_auto_skip() -> bool {
    true
}

// ============================================================================
// Live Updates
// ============================================================================

/// Host side of the settings feed.
pub type SettingsPublisher = watch::Sender<ControlSettings>;

/// Read side of the live settings feed.
///
/// Values are clamped on read, so consumers never see out-of-range numbers.
#[derive(Debug, Clone)]
pub struct SettingsFeed {
    receiver: watch::Receiver<ControlSettings>,
}

impl SettingsFeed {
    /// Creates a feed and the publisher the host keeps.
    pub fn channel(initial: ControlSettings) -> (SettingsPublisher, Self) {
        let (sender, receiver) = watch::channel(initial);
        (sender, Self { receiver })
    }

    /// A feed that never changes.
    pub fn fixed(settings: ControlSettings) -> Self {
        Self::channel(settings).1
    }

    pub fn current(&self) -> ControlSettings {
        self.receiver.borrow().clamped()
    }

    /// `true` when a value arrived since the last [`take_changed`](Self::take_changed)
    /// or [`changed`](Self::changed).
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Returns the new value if one arrived, without waiting.
    pub fn take_changed(&mut self) -> Option<ControlSettings> {
        if !self.has_changed() {
            return None;
        }
        Some(self.receiver.borrow_and_update().clamped())
    }

    /// Waits for the next value. Returns `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<ControlSettings> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clamped())
    }
}
