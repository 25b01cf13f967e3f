//! Cancellable scheduled intervals.
//!
//! Position polling (comment overlay sync, skip-segment detection) runs on a
//! fixed period that must stop while playback is paused or the screen is
//! hidden, and must stop for good when the screen is left. Two flavours are
//! provided:
//!
//! - [`IntervalSchedule`] is a plain state machine fed with explicit
//!   millisecond timestamps. The control loop asks it "is a poll due now?"
//!   on every frame, which keeps tests deterministic without a runtime.
//! - [`ScheduledInterval`] wraps a Tokio interval plus a
//!   [`CancellationToken`] for loops that want to `.await` the next tick.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScheduleState {
    Idle,
    Running { next_due_ms: u64 },
    Paused,
    Cancelled,
}

/// Deterministic polling interval driven by caller-supplied timestamps.
///
/// The first poll after [`start`](Self::start) or [`resume`](Self::resume) is
/// due immediately. Periods missed while the caller was not polling collapse
/// into a single due poll; the return value of [`poll_due`](Self::poll_due)
/// reports how many periods elapsed.
///
/// Cancellation is terminal: a cancelled schedule never fires again and
/// ignores `start`/`resume`.
#[derive(Debug, Clone)]
pub struct IntervalSchedule {
    period_ms: u64,
    state: ScheduleState,
}

impl IntervalSchedule {
    /// Creates an idle schedule. Periods shorter than 1ms are rounded up.
    pub fn new(period: Duration) -> Self {
        Self {
            period_ms: crate::time::as_millis_u64(period).max(1),
            state: ScheduleState::Idle,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Changes the period. A running schedule keeps its next deadline.
    pub fn set_period(&mut self, period: Duration) {
        self.period_ms = crate::time::as_millis_u64(period).max(1);
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.state != ScheduleState::Cancelled {
            self.state = ScheduleState::Running { next_due_ms: now_ms };
        }
    }

    pub fn pause(&mut self) {
        if matches!(self.state, ScheduleState::Running { .. }) {
            self.state = ScheduleState::Paused;
        }
    }

    /// Resumes a paused schedule; the next poll is due at `now_ms`.
    pub fn resume(&mut self, now_ms: u64) {
        if self.state == ScheduleState::Paused {
            self.state = ScheduleState::Running { next_due_ms: now_ms };
        }
    }

    pub fn cancel(&mut self) {
        self.state = ScheduleState::Cancelled;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ScheduleState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        self.state == ScheduleState::Paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == ScheduleState::Cancelled
    }

    /// Timestamp of the next due poll, `None` unless running.
    pub fn next_deadline(&self) -> Option<u64> {
        match self.state {
            ScheduleState::Running { next_due_ms } => Some(next_due_ms),
            _ => None,
        }
    }

    /// Returns the number of periods that elapsed up to `now_ms` and advances
    /// the deadline past them. `0` means nothing is due.
    pub fn poll_due(&mut self, now_ms: u64) -> u32 {
        let ScheduleState::Running { next_due_ms } = self.state else {
            return 0;
        };
        if now_ms < next_due_ms {
            return 0;
        }

        let elapsed = (now_ms - next_due_ms) / self.period_ms + 1;
        self.state = ScheduleState::Running {
            next_due_ms: next_due_ms.saturating_add(elapsed.saturating_mul(self.period_ms)),
        };
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }

    /// Convenience for callers that only care whether to poll.
    pub fn is_due(&mut self, now_ms: u64) -> bool {
        self.poll_due(now_ms) > 0
    }
}

/// Tokio-backed interval that can be paused and is bound to a cancellation token.
///
/// Missed ticks are skipped rather than bursted, matching the "poll the
/// latest position" use: catching up on stale positions is pointless.
#[derive(Debug)]
pub struct ScheduledInterval {
    interval: Interval,
    paused: bool,
    cancel: CancellationToken,
}

impl ScheduledInterval {
    pub fn new(period: Duration, cancel: CancellationToken) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            paused: false,
            cancel,
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes ticking; the first tick after resuming waits a full period.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.interval.reset();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Waits for the next tick.
    ///
    /// Returns `None` once the token is cancelled. While paused, only
    /// cancellation can complete the future, so callers `select!` it against
    /// whatever event resumes them.
    pub async fn tick(&mut self) -> Option<Instant> {
        if self.cancel.is_cancelled() {
            return None;
        }
        if self.paused {
            self.cancel.cancelled().await;
            return None;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            instant = self.interval.tick() => Some(instant),
        }
    }
}
