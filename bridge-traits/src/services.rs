//! System services adjusted by vertical drag gestures.
//!
//! - **Android**: `AudioManager` stream volume, window `screenBrightness`
//! - **iOS**: `MPVolumeView` slider, `UIScreen.brightness`
//! - **Desktop**: mixer volume, no-op brightness

use crate::{error::Result, platform::PlatformSendSync};

/// Media stream volume expressed in the host's integer steps.
pub trait VolumeControl: PlatformSendSync {
    /// Highest step. `0` means the stream cannot be adjusted.
    fn max_volume(&self) -> u32;

    fn volume(&self) -> u32;

    fn set_volume(&self, volume: u32) -> Result<()>;

    /// Current volume as a fraction of [`max_volume`](Self::max_volume).
    fn volume_fraction(&self) -> f32 {
        let max = self.max_volume();
        if max == 0 {
            return 0.0;
        }
        (self.volume() as f32 / max as f32).clamp(0.0, 1.0)
    }
}

/// Window brightness in `0.0..=1.0`.
pub trait BrightnessControl: PlatformSendSync {
    fn brightness(&self) -> f32;

    fn set_brightness(&self, brightness: f32) -> Result<()>;
}
