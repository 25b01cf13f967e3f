//! Media player bridge.
//!
//! The host owns exactly one decoder/renderer instance per playback screen and
//! exposes it to the core through [`MediaPlayer`]. Calls are expected to be
//! cheap property reads or fire-and-forget commands; the core invokes them
//! from its single driving loop and never holds them across an `.await`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{error::Result, platform::PlatformSendSync};

/// Decoded frame size reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` once the decoder has reported a real frame size.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width over height, `None` while the size is unknown.
    pub fn aspect_ratio(&self) -> Option<f32> {
        self.is_known()
            .then(|| self.width as f32 / self.height as f32)
    }
}

/// Playable stream handed to [`MediaPlayer::swap_source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamSource {
    /// Single muxed file.
    Progressive {
        url: String,
        headers: HashMap<String, String>,
    },
    /// Separate video and audio representations.
    Dash {
        video_url: String,
        audio_url: Option<String>,
        headers: HashMap<String, String>,
    },
}

impl StreamSource {
    pub fn progressive(url: impl Into<String>) -> Self {
        StreamSource::Progressive {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// URL of the video-bearing representation.
    pub fn primary_url(&self) -> &str {
        match self {
            StreamSource::Progressive { url, .. } => url,
            StreamSource::Dash { video_url, .. } => video_url,
        }
    }
}

/// Underlying media player.
///
/// Positions and durations are milliseconds. A duration of `0` means the
/// player does not know it yet (stream still preparing).
pub trait MediaPlayer: PlatformSendSync {
    fn play(&self);

    fn pause(&self);

    fn seek(&self, position_ms: u64);

    fn position_ms(&self) -> u64;

    fn duration_ms(&self) -> u64;

    fn is_playing(&self) -> bool;

    fn video_dimensions(&self) -> VideoDimensions;

    /// Current playback rate, `1.0` for normal speed.
    fn playback_speed(&self) -> f32 {
        1.0
    }

    /// Replace the media source in place.
    ///
    /// Implementations keep the player instance alive; position after the swap
    /// is unspecified and the caller seeks explicitly.
    fn swap_source(&self, source: StreamSource) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_dimensions_have_no_aspect_ratio() {
        assert!(!VideoDimensions::default().is_known());
        assert_eq!(VideoDimensions::default().aspect_ratio(), None);
        assert_eq!(VideoDimensions::new(1920, 1080).aspect_ratio(), Some(1920.0 / 1080.0));
    }

    #[test]
    fn primary_url_picks_video_representation() {
        let dash = StreamSource::Dash {
            video_url: "https://cdn/v.m4s".to_string(),
            audio_url: Some("https://cdn/a.m4s".to_string()),
            headers: HashMap::new(),
        };
        assert_eq!(dash.primary_url(), "https://cdn/v.m4s");
        assert_eq!(StreamSource::progressive("https://cdn/f.mp4").primary_url(), "https://cdn/f.mp4");
    }
}
