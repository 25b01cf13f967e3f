//! Comment overlay render surface.
//!
//! A surface is the physical view the host creates for the comment overlay.
//! Hosts destroy and recreate it on every fullscreen toggle, picture-in-picture
//! transition or mini-player embedding, so the core never caches drawing state
//! inside it: every [`RenderSurface::render`] call carries everything needed to
//! draw the next frame.

use uuid::Uuid;

use crate::{platform::PlatformSendSync, sources::CommentItem};

/// Identity of a physical render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Visual parameters applied to the whole overlay for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub opacity: f32,
    pub font_scale: f32,
    /// Fraction of the video height comments may occupy.
    pub area_fraction: f32,
    /// Time a scrolling comment takes to cross the screen at the current rate.
    pub scroll_duration_ms: u64,
}

/// Everything a surface needs to draw one overlay frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub position_ms: u64,
    /// Playback rate the scroll animation should follow.
    pub rate: f32,
    /// Comments that enter the screen on this frame.
    pub spawned: Vec<CommentItem>,
    /// Comments still travelling, spawned ones included.
    pub in_flight: usize,
    pub style: OverlayStyle,
}

/// Comment overlay view provided by the host UI.
pub trait RenderSurface: PlatformSendSync {
    fn surface_id(&self) -> SurfaceId;

    /// Restart the timeline at `position_ms` with nothing on screen.
    fn seed(&self, position_ms: u64);

    fn render(&self, frame: &RenderFrame);

    /// Freeze comments in place.
    fn pause(&self);

    /// Remove every comment from the screen.
    fn clear(&self);
}
