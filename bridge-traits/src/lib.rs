//! # Host Bridge Traits
//!
//! Contracts between the playback control core and the host application.
//!
//! ## Overview
//!
//! The core never talks to a platform media framework, window manager or
//! network stack directly. Every capability it needs is expressed as a trait
//! in this crate and injected by the host (Android, iOS, desktop) at startup.
//!
//! ## Traits
//!
//! ### Playback
//! - [`MediaPlayer`](player::MediaPlayer) - Transport control, position, source swap
//! - [`RenderSurface`](surface::RenderSurface) - Physical comment overlay view
//!
//! ### System Services
//! - [`VolumeControl`](services::VolumeControl) - Stream volume in integer steps
//! - [`BrightnessControl`](services::BrightnessControl) - Window brightness `0.0..=1.0`
//!
//! ### Data Sources
//! - [`CommentTrackSource`](sources::CommentTrackSource) - Comment track fetch
//! - [`SegmentSource`](sources::SegmentSource) - Skip segment fetch
//! - [`StreamResolver`](sources::StreamResolver) - Quality tier stream resolution
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic scheduling
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! Missing required bridges are reported when the host builds its
//! `CoreConfig`, never later during playback:
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .media_player(Arc::new(ExoPlayerBridge::new(handle)))
//!     .build()?; // Err(CapabilityMissing { capability: "VolumeControl", .. })
//! ```
//!
//! ## Error Handling
//!
//! All fallible bridge calls return [`BridgeError`](error::BridgeError).
//! Connectivity problems should use `BridgeError::Network` and malformed
//! payloads `BridgeError::Parse` so the core can tell degradations apart.
//!
//! ## Thread Safety
//!
//! Bridges are shared behind `Arc` between the driving loop and background
//! resolution tasks and therefore require `Send + Sync` on native targets.

pub mod error;
pub mod platform;
pub mod player;
pub mod services;
pub mod sources;
pub mod surface;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use platform::{
    SharedBrightness, SharedCommentSource, SharedPlayer, SharedSegmentSource,
    SharedStreamResolver, SharedSurface, SharedVolume,
};
pub use player::{MediaPlayer, StreamSource, VideoDimensions};
pub use services::{BrightnessControl, VolumeControl};
pub use sources::{
    CommentItem, CommentMode, CommentStyle, CommentTrackSource, ResolvedStream, SegmentRecord,
    SegmentSource, StreamResolver,
};
pub use surface::{OverlayStyle, RenderFrame, RenderSurface, SurfaceId};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
