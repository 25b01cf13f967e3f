//! Thread-safety markers and shared handle aliases for host collaborators.
//!
//! Native hosts hand collaborators to the core behind `Arc` so the control
//! surface, the overlay manager and background resolution tasks can all hold
//! the same player or surface. On `wasm32` everything runs on one thread and
//! browser objects are not `Send`, so the bounds collapse to nothing there.

use std::sync::Arc;

use crate::player::MediaPlayer;
use crate::services::{BrightnessControl, VolumeControl};
use crate::sources::{CommentTrackSource, SegmentSource, StreamResolver};
use crate::surface::RenderSurface;

/// `Send + Sync` on native targets, no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}

pub type SharedPlayer = Arc<dyn MediaPlayer>;
pub type SharedVolume = Arc<dyn VolumeControl>;
pub type SharedBrightness = Arc<dyn BrightnessControl>;
pub type SharedSurface = Arc<dyn RenderSurface>;
pub type SharedCommentSource = Arc<dyn CommentTrackSource>;
pub type SharedSegmentSource = Arc<dyn SegmentSource>;
pub type SharedStreamResolver = Arc<dyn StreamResolver>;
