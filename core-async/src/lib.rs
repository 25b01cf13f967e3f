//! Async runtime facade for the playback control core.
//!
//! Every `core-*` crate reaches Tokio through this crate so the executor
//! choice lives in one place. On top of the plain re-exports it adds
//! [`schedule`], the cancellable interval abstraction that drives position
//! polling for the comment overlay and skip segments.
//!
//! # Modules
//!
//! - `task`: Task spawning and execution
//! - `time`: Sleep, timeout, interval, wall-clock helpers
//! - `sync`: Channels, locks and [`CancellationToken`](sync::CancellationToken)
//! - `schedule`: Pausable, cancellable polling intervals
//!
//! # Examples
//!
//! ```rust
//! use core_async::schedule::IntervalSchedule;
//! use core_async::time::Duration;
//!
//! let mut poll = IntervalSchedule::new(Duration::from_millis(500));
//! poll.start(0);
//! assert_eq!(poll.poll_due(0), 1);
//! assert_eq!(poll.poll_due(499), 0);
//! assert_eq!(poll.poll_due(500), 1);
//!
//! poll.pause();
//! assert_eq!(poll.poll_due(10_000), 0);
//! ```

pub mod runtime;
pub mod schedule;
pub mod sync;
pub mod task;
pub mod time;

// Re-export commonly used types at crate root for convenience
pub use schedule::{IntervalSchedule, ScheduledInterval};
pub use sync::CancellationToken;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
