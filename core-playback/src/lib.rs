//! # Playback Control Module
//!
//! Real-time control surface of the video player screen.
//!
//! ## Overview
//!
//! This module handles:
//! - Drag gesture arbitration for seek, brightness and volume
//! - The comment (danmaku) overlay, which outlives the surfaces it draws on
//! - Sponsor/intro segment skipping
//! - Token-guarded quality switches that keep the playback position
//! - A playback clock that feeds position samples to all of the above
//!
//! [`ControlSession`] wires these together for one player screen. The
//! [`DanmakuOverlayManager`] is owned by the host, one per process, and lent
//! to the session on each call.

pub mod clock;
pub mod config;
pub mod danmaku;
pub mod error;
pub mod gesture;
pub mod quality;
pub mod segments;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{ClockSnapshot, ClockSubscription, PlaybackClock, PlaybackSession};
pub use config::{ControlSettings, SettingsFeed, SettingsPublisher, SponsorSettings};
pub use danmaku::{DanmakuConfig, DanmakuOverlayManager, TrackLoad};
pub use error::{ControlError, Result};
pub use gesture::{classify, GestureArbiter, GestureMode, GestureUpdate};
pub use quality::{AppliedSwitch, QualitySwitchCoordinator, RequestToken, SwitchState};
pub use segments::{SegmentCategory, SegmentSkipController, SkipDecision, SponsorSegment};
pub use session::ControlSession;
