//! # Drag Gestures
//!
//! Turns a continuous touch drag into exactly one of seek, brightness or
//! volume.
//!
//! The mode is chosen from the first non-zero delta by the pure
//! [`classify`] function and then locked for the rest of the drag. Seek only
//! previews until release; brightness and volume apply immediately, with
//! small changes coalesced so the system call is not hammered.

use bridge_traits::{SharedBrightness, SharedVolume};
use core_runtime::events::{CoreEvent, EventBus, GestureEvent};
use tracing::{debug, warn};

use crate::clock::PlaybackClock;
use crate::config::{ControlSettings, SENSITIVITY_RANGE};
use crate::danmaku::config::clamp_or;

/// Transport action a drag controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureMode {
    /// Not decided yet.
    None,
    Seek,
    Brightness,
    Volume,
}

/// Picks the mode for a drag from its first delta.
///
/// Horizontal wins only when strictly larger; a tie goes to the vertical
/// branch, split by which half of the screen the touch is in.
pub fn classify(dx: f32, dy: f32, touch_x: f32, screen_width: f32) -> GestureMode {
    if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
        return GestureMode::None;
    }
    if dx.abs() > dy.abs() {
        GestureMode::Seek
    } else if touch_x < screen_width / 2.0 {
        GestureMode::Brightness
    } else {
        GestureMode::Volume
    }
}

/// Screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }
}

impl Viewport {
    /// A zero-sized viewport cannot scale vertical drags.
    pub fn is_set(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// State of the drag in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    mode: GestureMode,
    pub start_position_ms: u64,
    pub duration_ms: u64,
    pub start_volume_fraction: f32,
    pub start_brightness_fraction: f32,
    pub cumulative_dx: f32,
    pub cumulative_dy: f32,
    pub sensitivity: f32,
    seek_target_ms: Option<u64>,
    last_applied: f32,
}

impl GestureSession {
    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn seek_target_ms(&self) -> Option<u64> {
        self.seek_target_ms
    }

    /// Locks the mode on the first non-zero delta. Later calls are ignored.
    fn lock_mode(&mut self, dx: f32, dy: f32, touch_x: f32, screen_width: f32) -> GestureMode {
        if self.mode == GestureMode::None {
            self.mode = classify(dx, dy, touch_x, screen_width);
            if self.mode != GestureMode::None {
                debug!(mode = ?self.mode, "Gesture mode locked");
                self.last_applied = match self.mode {
                    GestureMode::Brightness => self.start_brightness_fraction,
                    GestureMode::Volume => self.start_volume_fraction,
                    _ => 0.0,
                };
            }
        }
        self.mode
    }
}

/// Result of one drag delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureUpdate {
    /// Nothing to show: no active drag, mode undecided or a degenerate input.
    Ignored,
    SeekPreview { target_ms: u64, duration_ms: u64 },
    Brightness { fraction: f32, applied: bool },
    Volume { fraction: f32, volume: u32, applied: bool },
}

/// Drag interpreter for the player screen.
pub struct GestureArbiter {
    volume: SharedVolume,
    brightness: SharedBrightness,
    events: EventBus,
    viewport: Viewport,
    sensitivity: f32,
    seek_ms_per_px: f32,
    apply_epsilon: f32,
    session: Option<GestureSession>,
}

impl GestureArbiter {
    pub fn new(volume: SharedVolume, brightness: SharedBrightness, events: EventBus) -> Self {
        let defaults = ControlSettings::default();
        Self {
            volume,
            brightness,
            events,
            viewport: Viewport::default(),
            sensitivity: defaults.gesture_sensitivity,
            seek_ms_per_px: defaults.seek_ms_per_px,
            apply_epsilon: defaults.system_apply_epsilon,
            session: None,
        }
    }

    /// Picks up sensitivity and tuning. A drag in progress keeps its own
    /// sensitivity.
    pub fn apply_settings(&mut self, settings: &ControlSettings) {
        self.sensitivity = clamp_or(settings.gesture_sensitivity, &SENSITIVITY_RANGE, 1.0);
        self.seek_ms_per_px = settings.seek_ms_per_px;
        self.apply_epsilon = settings.system_apply_epsilon;
    }

    /// Must be called before the first drag; until then brightness and
    /// volume drags are ignored.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Viewport { width, height };
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    pub fn mode(&self) -> GestureMode {
        self.session
            .as_ref()
            .map_or(GestureMode::None, GestureSession::mode)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Pointer down: snapshots the start values of all three targets.
    pub fn on_drag_start(&mut self, clock: &PlaybackClock) {
        let session = GestureSession {
            mode: GestureMode::None,
            start_position_ms: clock.position_ms(),
            duration_ms: clock.duration_ms(),
            start_volume_fraction: self.volume.volume_fraction(),
            start_brightness_fraction: clamp_or(self.brightness.brightness(), &(0.0..=1.0), 0.5),
            cumulative_dx: 0.0,
            cumulative_dy: 0.0,
            sensitivity: self.sensitivity,
            seek_target_ms: None,
            last_applied: 0.0,
        };
        debug!(
            start_position_ms = session.start_position_ms,
            duration_ms = session.duration_ms,
            "Drag started"
        );
        self.session = Some(session);
    }

    /// One pointer move. `dy` is positive downwards.
    pub fn on_drag(&mut self, dx: f32, dy: f32, touch_x: f32) -> GestureUpdate {
        let viewport = self.viewport;
        let Some(session) = self.session.as_mut() else {
            return GestureUpdate::Ignored;
        };
        if !(dx.is_finite() && dy.is_finite()) {
            return GestureUpdate::Ignored;
        }

        let undecided = session.mode == GestureMode::None;
        let mode = session.lock_mode(dx, dy, touch_x, viewport.width);
        if undecided
            && matches!(mode, GestureMode::Brightness | GestureMode::Volume)
            && !viewport.is_set()
        {
            warn!(?mode, "Vertical drag without a viewport; set_viewport was never called");
        }

        match mode {
            GestureMode::None => GestureUpdate::Ignored,
            GestureMode::Seek => {
                session.cumulative_dx += dx;
                let Some(target_ms) = seek_target(session, self.seek_ms_per_px) else {
                    return GestureUpdate::Ignored;
                };
                session.seek_target_ms = Some(target_ms);
                self.events.publish(CoreEvent::Gesture(GestureEvent::SeekPreview {
                    target_ms,
                    duration_ms: session.duration_ms,
                }));
                GestureUpdate::SeekPreview {
                    target_ms,
                    duration_ms: session.duration_ms,
                }
            }
            GestureMode::Brightness => {
                session.cumulative_dy -= dy;
                let Some(fraction) = vertical_fraction(
                    session.start_brightness_fraction,
                    session.cumulative_dy,
                    viewport.height,
                    session.sensitivity,
                ) else {
                    return GestureUpdate::Ignored;
                };

                let applied = should_apply(session.last_applied, fraction, self.apply_epsilon)
                    && match self.brightness.set_brightness(fraction) {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(error = %e, "Failed to set brightness");
                            false
                        }
                    };
                if applied {
                    session.last_applied = fraction;
                    self.events
                        .publish(CoreEvent::Gesture(GestureEvent::BrightnessChanged {
                            percent: (fraction * 100.0).round() as u8,
                        }));
                }
                GestureUpdate::Brightness { fraction, applied }
            }
            GestureMode::Volume => {
                let max_volume = self.volume.max_volume();
                if max_volume == 0 {
                    return GestureUpdate::Ignored;
                }
                session.cumulative_dy -= dy;
                let Some(fraction) = vertical_fraction(
                    session.start_volume_fraction,
                    session.cumulative_dy,
                    viewport.height,
                    session.sensitivity,
                ) else {
                    return GestureUpdate::Ignored;
                };

                let volume = (fraction * max_volume as f32).round() as u32;
                let applied = should_apply(session.last_applied, fraction, self.apply_epsilon)
                    && match self.volume.set_volume(volume) {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(error = %e, volume, "Failed to set volume");
                            false
                        }
                    };
                if applied {
                    session.last_applied = fraction;
                    self.events
                        .publish(CoreEvent::Gesture(GestureEvent::VolumeChanged {
                            volume,
                            max_volume,
                        }));
                }
                GestureUpdate::Volume {
                    fraction,
                    volume,
                    applied,
                }
            }
        }
    }

    /// Pointer up. Commits a seek and resumes playback; other modes have
    /// already applied their value. Returns the committed seek target.
    pub fn on_drag_end(&mut self, clock: &mut PlaybackClock) -> Option<u64> {
        let session = self.session.take()?;
        if session.mode != GestureMode::Seek {
            return None;
        }
        let target_ms = session.seek_target_ms?;

        let applied_ms = clock.seek(target_ms);
        clock.play();
        debug!(target_ms = applied_ms, "Seek committed");
        self.events
            .publish(CoreEvent::Gesture(GestureEvent::SeekCommitted {
                target_ms: applied_ms,
            }));
        Some(applied_ms)
    }

    /// Pointer cancelled: discards the drag without committing anything.
    pub fn on_drag_cancel(&mut self) {
        if self.session.take().is_some() {
            debug!("Drag cancelled");
            self.events.publish(CoreEvent::Gesture(GestureEvent::Cancelled));
        }
    }
}

/// `None` while the duration is unknown.
fn seek_target(session: &GestureSession, ms_per_px: f32) -> Option<u64> {
    if session.duration_ms == 0 {
        return None;
    }
    let delta =
        f64::from(session.cumulative_dx) * f64::from(ms_per_px) * f64::from(session.sensitivity);
    let target = (session.start_position_ms as f64 + delta).clamp(0.0, session.duration_ms as f64);
    Some(target.round() as u64)
}

/// `None` for a zero-height screen.
fn vertical_fraction(start: f32, cumulative_dy: f32, height: f32, sensitivity: f32) -> Option<f32> {
    if !(height.is_finite() && height > 0.0) {
        return None;
    }
    let fraction = start + cumulative_dy / height * sensitivity;
    fraction.is_finite().then(|| fraction.clamp(0.0, 1.0))
}

/// Throttle for system calls. Reaching either end of the range always
/// applies so the extremes stay reachable.
fn should_apply(last_applied: f32, fraction: f32, epsilon: f32) -> bool {
    let at_bound = (fraction == 0.0 || fraction == 1.0) && fraction != last_applied;
    (fraction - last_applied).abs() > epsilon || at_bound
}
