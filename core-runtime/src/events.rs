//! # Event Bus System
//!
//! Typed notifications from the playback control core to the host UI, carried
//! over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The control components never call back into UI code. Anything the user
//! should see (a "skip sponsor" button, a failed quality switch notice, a
//! volume HUD) is published as a [`CoreEvent`] and rendered by whichever
//! screen is currently subscribed.
//!
//! ```text
//! ┌────────────────┐  emit   ┌───────────┐  subscribe  ┌──────────────┐
//! │ GestureArbiter ├────────>│           ├────────────>│ Player HUD   │
//! └────────────────┘         │           │             └──────────────┘
//! ┌────────────────┐  emit   │ EventBus  │
//! │ SegmentSkip    ├────────>│ (broadcast│  subscribe  ┌──────────────┐
//! └────────────────┘         │  channel) ├────────────>│ Toast / Snack│
//! ┌────────────────┐  emit   │           │             └──────────────┘
//! │ QualitySwitch  ├────────>│           │
//! └────────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SegmentEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut hud = bus.subscribe();
//!
//! bus.publish(CoreEvent::Segment(SegmentEvent::ShowSkipButton {
//!     segment_id: "s1".to_string(),
//!     skip_to_ms: 45_000,
//!     label: "Skip sponsor".to_string(),
//! }));
//!
//! let event = hud.recv().await.unwrap();
//! assert_eq!(event.description(), "Skip prompt shown");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped; the core shut down.
//!
//! Publishing never fails the publisher: a bus without subscribers (screen in
//! the background) simply drops the event. Use [`EventBus::emit`] when the
//! caller wants to know how many subscribers received it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Gesture previews are the chattiest producer (one per drag frame); 100
/// covers a fast fling between two UI frames.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Transport and video lifecycle
    Playback(PlaybackEvent),
    /// Touch-drag arbitration results
    Gesture(GestureEvent),
    /// Comment overlay lifecycle
    Overlay(OverlayEvent),
    /// Skip segment prompts and skips
    Segment(SegmentEvent),
    /// Quality tier switches
    Quality(QualityEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Gesture(e) => e.description(),
            CoreEvent::Overlay(e) => e.description(),
            CoreEvent::Segment(e) => e.description(),
            CoreEvent::Quality(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Quality(QualityEvent::SwitchFailed { .. }) => EventSeverity::Error,
            CoreEvent::Overlay(OverlayEvent::TrackUnavailable { .. }) => EventSeverity::Warning,
            CoreEvent::Segment(SegmentEvent::Unavailable { .. }) => EventSeverity::Warning,
            CoreEvent::Quality(QualityEvent::Switched { .. }) => EventSeverity::Info,
            CoreEvent::Segment(SegmentEvent::ShowSkipButton { .. }) => EventSeverity::Info,
            CoreEvent::Segment(SegmentEvent::SkippedTo { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::VideoLoaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new video replaced the previous session.
    VideoLoaded {
        video_id: String,
        quality_id: u32,
        /// Monotonic session counter; changes on every load.
        generation: u64,
    },
    Resumed {
        position_ms: u64,
    },
    Paused {
        position_ms: u64,
    },
    Seeked {
        from_ms: u64,
        to_ms: u64,
    },
    Ended {
        video_id: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::VideoLoaded { .. } => "Video loaded",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Seeked { .. } => "Playback position moved",
            PlaybackEvent::Ended { .. } => "Video ended",
        }
    }
}

// ============================================================================
// Gesture Events
// ============================================================================

/// Drag gesture feedback for on-screen indicators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum GestureEvent {
    /// Horizontal drag preview; nothing is applied to the player yet.
    SeekPreview { target_ms: u64, duration_ms: u64 },
    /// Drag released in seek mode and the target was applied.
    SeekCommitted { target_ms: u64 },
    VolumeChanged { volume: u32, max_volume: u32 },
    /// Brightness in whole percent.
    BrightnessChanged { percent: u8 },
    /// Drag aborted without committing.
    Cancelled,
}

impl GestureEvent {
    fn description(&self) -> &str {
        match self {
            GestureEvent::SeekPreview { .. } => "Seek preview updated",
            GestureEvent::SeekCommitted { .. } => "Seek committed",
            GestureEvent::VolumeChanged { .. } => "Volume changed",
            GestureEvent::BrightnessChanged { .. } => "Brightness changed",
            GestureEvent::Cancelled => "Gesture cancelled",
        }
    }
}

// ============================================================================
// Overlay Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum OverlayEvent {
    SurfaceAttached {
        surface_id: String,
        position_ms: u64,
    },
    SurfaceDetached {
        surface_id: String,
    },
    TrackLoaded {
        track_id: String,
        comment_count: usize,
    },
    /// Fetch failed; the previously rendered track (if any) stays.
    TrackUnavailable {
        track_id: String,
        reason: String,
    },
    EnabledChanged {
        enabled: bool,
    },
}

impl OverlayEvent {
    fn description(&self) -> &str {
        match self {
            OverlayEvent::SurfaceAttached { .. } => "Overlay surface attached",
            OverlayEvent::SurfaceDetached { .. } => "Overlay surface detached",
            OverlayEvent::TrackLoaded { .. } => "Comment track loaded",
            OverlayEvent::TrackUnavailable { .. } => "Comment track unavailable",
            OverlayEvent::EnabledChanged { .. } => "Overlay visibility changed",
        }
    }
}

// ============================================================================
// Segment Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SegmentEvent {
    SegmentsLoaded {
        video_id: String,
        count: usize,
    },
    /// Skipping disabled for this video because the fetch failed.
    Unavailable {
        video_id: String,
        reason: String,
    },
    /// Playback entered a segment with auto-skip off.
    ShowSkipButton {
        segment_id: String,
        skip_to_ms: u64,
        label: String,
    },
    /// Playback jumped over a segment.
    SkippedTo {
        segment_id: String,
        position_ms: u64,
    },
}

impl SegmentEvent {
    fn description(&self) -> &str {
        match self {
            SegmentEvent::SegmentsLoaded { .. } => "Skip segments loaded",
            SegmentEvent::Unavailable { .. } => "Skip segments unavailable",
            SegmentEvent::ShowSkipButton { .. } => "Skip prompt shown",
            SegmentEvent::SkippedTo { .. } => "Segment skipped",
        }
    }
}

// ============================================================================
// Quality Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QualityEvent {
    SwitchStarted {
        token: u64,
        target_quality_id: u32,
        resume_at_ms: u64,
    },
    Switched {
        quality_id: u32,
        was_downgraded: bool,
        resume_at_ms: u64,
    },
    /// The single user-visible notice for a failed switch.
    SwitchFailed {
        requested_quality_id: u32,
        reverted_to: u32,
        reason: String,
    },
}

impl QualityEvent {
    fn description(&self) -> &str {
        match self {
            QualityEvent::SwitchStarted { .. } => "Quality switch started",
            QualityEvent::Switched { .. } => "Quality switched",
            QualityEvent::SwitchFailed { .. } => "Quality switch failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus that buffers up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Publishes an event, dropping it silently when nobody listens.
    ///
    /// Control components use this on their hot paths: a backgrounded screen
    /// has no subscriber and that is not an error.
    pub fn publish(&self, event: CoreEvent) {
        if let Err(SendError(event)) = self.sender.send(event) {
            tracing::trace!(event = event.description(), "No subscribers for event");
        }
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::new(100);
/// let notices = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every matching event currently buffered.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
