//! Workspace facade crate.
//!
//! Re-exports the member crates so a host application can depend on a single
//! package and reach the bridge contracts, the runtime bootstrap and the
//! playback control surface through one path.

pub use bridge_traits as bridge;
pub use core_async as runtime_async;
pub use core_playback as playback;
pub use core_runtime as runtime;

pub use core_playback::{
    ControlSession, ControlSettings, DanmakuOverlayManager, GestureArbiter, PlaybackClock,
    QualitySwitchCoordinator, SegmentSkipController,
};
