//! # Overlay Configuration
//!
//! User-facing comment overlay settings and the per-frame style derived from them.

use bridge_traits::{CommentMode, CommentStyle, OverlayStyle};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const OPACITY_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const FONT_SCALE_RANGE: RangeInclusive<f32> = 0.5..=2.0;
pub const SPEED_FACTOR_RANGE: RangeInclusive<f32> = 0.5..=3.0;
pub const AREA_FRACTION_RANGE: RangeInclusive<f32> = 0.25..=1.0;

/// Media time a scrolling comment needs to cross the screen at speed factor 1.0.
const BASE_SCROLL_MS: f32 = 5_000.0;
const MIN_SCROLL_MS: f32 = 2_000.0;
const MAX_SCROLL_MS: f32 = 10_000.0;

/// Media time a top or bottom comment stays pinned.
pub const FIXED_COMMENT_MS: u64 = 4_000;

/// Comment overlay settings.
///
/// Mutable at any time and independent of the loaded track: changing any
/// field takes effect on the next rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanmakuConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overlay opacity, `0.0..=1.0`.
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Text size multiplier, `0.5..=2.0`.
    #[serde(default = "default_one")]
    pub font_scale: f32,

    /// Scroll duration multiplier, `0.5..=3.0`. Larger is slower.
    #[serde(default = "default_one")]
    pub speed_factor: f32,

    /// Fraction of the video height comments may use, `0.25..=1.0`.
    #[serde(default = "default_area_fraction")]
    pub area_fraction: f32,

    #[serde(default = "default_true")]
    pub allow_scroll: bool,

    #[serde(default = "default_true")]
    pub allow_top: bool,

    #[serde(default = "default_true")]
    pub allow_bottom: bool,

    /// Show comments whose colour is not the default white.
    #[serde(default = "default_true")]
    pub allow_colorful: bool,

    /// Keyword or `regex:` rules, see [`CommentFilter`](super::filter::CommentFilter).
    #[serde(default)]
    pub block_rules: Vec<String>,
}

impl Default for DanmakuConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            opacity: default_opacity(),
            font_scale: default_one(),
            speed_factor: default_one(),
            area_fraction: default_area_fraction(),
            allow_scroll: default_true(),
            allow_top: default_true(),
            allow_bottom: default_true(),
            allow_colorful: default_true(),
            block_rules: Vec::new(),
        }
    }
}

impl DanmakuConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        check_range("opacity", self.opacity, &OPACITY_RANGE)?;
        check_range("font_scale", self.font_scale, &FONT_SCALE_RANGE)?;
        check_range("speed_factor", self.speed_factor, &SPEED_FACTOR_RANGE)?;
        check_range("area_fraction", self.area_fraction, &AREA_FRACTION_RANGE)?;
        Ok(())
    }

    /// Returns a copy with every ranged field coerced into its range.
    ///
    /// Non-finite values fall back to the field default.
    pub fn clamped(&self) -> Self {
        Self {
            opacity: clamp_or(self.opacity, &OPACITY_RANGE, default_opacity()),
            font_scale: clamp_or(self.font_scale, &FONT_SCALE_RANGE, default_one()),
            speed_factor: clamp_or(self.speed_factor, &SPEED_FACTOR_RANGE, default_one()),
            area_fraction: clamp_or(
                self.area_fraction,
                &AREA_FRACTION_RANGE,
                default_area_fraction(),
            ),
            ..self.clone()
        }
    }

    /// Media milliseconds a scrolling comment stays on screen.
    pub fn scroll_media_ms(&self) -> u64 {
        (BASE_SCROLL_MS * self.speed_factor)
            .clamp(MIN_SCROLL_MS, MAX_SCROLL_MS)
            .round() as u64
    }

    /// Media milliseconds a comment of `mode` stays on screen.
    pub fn lifetime_ms(&self, mode: CommentMode) -> u64 {
        match mode {
            CommentMode::Scroll => self.scroll_media_ms(),
            CommentMode::Top | CommentMode::Bottom => FIXED_COMMENT_MS,
        }
    }

    /// Style for one frame rendered at playback `rate`.
    ///
    /// The scroll duration is wall time, so it shrinks as the rate grows.
    pub fn overlay_style(&self, rate: f32) -> OverlayStyle {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        OverlayStyle {
            opacity: self.opacity,
            font_scale: self.font_scale,
            area_fraction: self.area_fraction,
            scroll_duration_ms: (self.scroll_media_ms() as f32 / rate).round() as u64,
        }
    }

    /// Whether mode and colour flags let a comment through.
    pub fn allows(&self, style: &CommentStyle) -> bool {
        let mode_allowed = match style.mode {
            CommentMode::Scroll => self.allow_scroll,
            CommentMode::Top => self.allow_top,
            CommentMode::Bottom => self.allow_bottom,
        };
        mode_allowed && (self.allow_colorful || !style.is_colorful())
    }
}

fn check_range(name: &str, value: f32, range: &RangeInclusive<f32>) -> Result<(), String> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "{} must be between {} and {}",
            name,
            range.start(),
            range.end()
        ))
    }
}

pub(crate) fn clamp_or(value: f32, range: &RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_one() -> f32 {
    1.0
}

fn default_opacity() -> f32 {
    0.85
}

fn default_area_fraction() -> f32 {
    0.5
}
