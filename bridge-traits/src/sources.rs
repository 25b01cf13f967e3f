//! Asynchronous data sources consumed by the playback control surface.
//!
//! All three sources perform network I/O on the host side. The core awaits
//! them off the driving loop and converts every failure into a degradation
//! (comment overlay or segment skipping unavailable) or a single surfaced
//! notice (quality switch), so implementations should report failures with
//! the typed [`BridgeError::Network`](crate::BridgeError::Network) and
//! [`BridgeError::Parse`](crate::BridgeError::Parse) variants instead of
//! panicking.

use serde::{Deserialize, Serialize};

use crate::{error::Result, platform::PlatformSendSync, player::StreamSource};

/// Opaque RGB value used by the default white comment colour.
pub const DEFAULT_COMMENT_COLOR: u32 = 0x00FF_FFFF;

/// Where a comment travels on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommentMode {
    /// Right-to-left across the overlay area.
    Scroll,
    /// Pinned to the top edge.
    Top,
    /// Pinned to the bottom edge.
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentStyle {
    pub mode: CommentMode,
    /// `0xRRGGBB`
    pub color: u32,
    pub font_size: f32,
}

impl Default for CommentStyle {
    fn default() -> Self {
        Self {
            mode: CommentMode::Scroll,
            color: DEFAULT_COMMENT_COLOR,
            font_size: 25.0,
        }
    }
}

impl CommentStyle {
    pub fn is_colorful(&self) -> bool {
        self.color & 0x00FF_FFFF != DEFAULT_COMMENT_COLOR
    }
}

/// One time-indexed comment of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentItem {
    pub time_ms: u64,
    pub text: String,
    pub style: CommentStyle,
    pub author_id: String,
}

impl CommentItem {
    pub fn new(time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            time_ms,
            text: text.into(),
            style: CommentStyle::default(),
            author_id: String::new(),
        }
    }

    pub fn with_style(mut self, style: CommentStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = author_id.into();
        self
    }
}

/// Raw skip segment as delivered by the segment service.
///
/// `category` is the service's wire name (`"sponsor"`, `"intro"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub start_ms: u64,
    pub end_ms: u64,
    pub category: String,
    pub segment_id: String,
}

/// Stream returned by [`StreamResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub source: StreamSource,
    /// Tier actually delivered; may be lower than the one requested.
    pub actual_quality_id: u32,
}

/// Comment track fetcher.
///
/// Returns comments in any order; the overlay sorts them by time.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait CommentTrackSource: PlatformSendSync {
    async fn load_track(&self, track_id: &str) -> Result<Vec<CommentItem>>;
}

/// Skip-segment fetcher. An empty list is a valid answer.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait SegmentSource: PlatformSendSync {
    async fn load_segments(&self, video_id: &str, track_id: &str) -> Result<Vec<SegmentRecord>>;
}

/// Resolves a playable stream for a quality tier.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait StreamResolver: PlatformSendSync {
    async fn resolve(&self, video_id: &str, quality_id: u32) -> Result<ResolvedStream>;
}
