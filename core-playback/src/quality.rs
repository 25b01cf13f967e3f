//! # Quality Switching
//!
//! Swaps the stream tier of the playing video without losing its position.
//!
//! ## Flow
//!
//! 1. [`QualitySwitchCoordinator::switch_quality`] captures the resume position
//!    and issues a new [`RequestToken`].
//! 2. Stream resolution runs as a spawned task, off the driving loop.
//! 3. Its [`SwitchOutcome`] comes back over a channel and
//!    [`QualitySwitchCoordinator::apply_outcome`] finishes the switch on the
//!    driving loop: swap, seek, play.
//!
//! Only the latest token is honoured. A response carrying an older token is
//! dropped unprocessed, so the last request always wins.

use bridge_traits::{ResolvedStream, SharedStreamResolver};
use core_async::sync::mpsc;
use core_runtime::events::{CoreEvent, EventBus, QualityEvent};
use std::fmt;
use tracing::{debug, info, warn};

use crate::clock::PlaybackClock;
use crate::error::{ControlError, Result};

// ============================================================================
// Quality Catalogue
// ============================================================================

/// Tier used when nothing better is known.
pub const FALLBACK_QUALITY: u32 = 64;

/// Lowest tier that needs a premium account.
pub const VIP_MIN_QUALITY: u32 = 112;

/// Lowest tier that needs a signed-in account.
pub const LOGIN_MIN_QUALITY: u32 = 80;

/// Display name of a tier id.
pub fn quality_label(quality_id: u32) -> String {
    let label = match quality_id {
        127 => "8K",
        126 => "Dolby Vision",
        125 => "HDR",
        120 => "4K",
        116 => "1080P60",
        112 => "1080P+",
        80 => "1080P",
        74 => "720P60",
        64 => "720P",
        32 => "480P",
        16 => "360P",
        other => return format!("{}P", other),
    };
    label.to_string()
}

/// Exact match, else the highest tier below `target`, else the lowest offered.
pub fn best_matching_quality(available: &[u32], target: u32) -> Option<u32> {
    if available.contains(&target) {
        return Some(target);
    }
    available
        .iter()
        .copied()
        .filter(|&q| q <= target)
        .max()
        .or_else(|| available.iter().copied().min())
}

/// Checks whether the account may play `quality_id`.
pub fn check_permission(quality_id: u32, is_logged_in: bool, is_vip: bool) -> Result<()> {
    if quality_id >= VIP_MIN_QUALITY && !is_vip {
        return Err(ControlError::VipRequired(quality_id));
    }
    if quality_id >= LOGIN_MIN_QUALITY && !is_logged_in {
        return Err(ControlError::LoginRequired(quality_id));
    }
    Ok(())
}

/// Highest tier the account may play out of `available`.
pub fn max_available_quality(available: &[u32], is_logged_in: bool, is_vip: bool) -> u32 {
    if available.is_empty() {
        return FALLBACK_QUALITY;
    }
    available
        .iter()
        .copied()
        .filter(|&q| check_permission(q, is_logged_in, is_vip).is_ok())
        .max()
        .or_else(|| available.iter().copied().min())
        .unwrap_or(FALLBACK_QUALITY)
}

// ============================================================================
// Switch Requests
// ============================================================================

/// Monotonic id of a switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a switch request stands.
///
/// `Done` and `Failed` are idle states that remember how the last request
/// ended; only `Switching` gates the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    Switching,
    Done,
    Failed,
}

/// The latest switch request and where it got to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualitySwitchRequest {
    pub target_quality_id: u32,
    pub resume_at_ms: u64,
    pub state: SwitchState,
    pub token: RequestToken,
}

/// Result of a resolution task, delivered back to the driving loop.
#[derive(Debug)]
pub struct SwitchOutcome {
    pub token: RequestToken,
    pub target_quality_id: u32,
    pub result: Result<ResolvedStream>,
}

/// What [`QualitySwitchCoordinator::apply_outcome`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedSwitch {
    Switched {
        quality_id: u32,
        was_downgraded: bool,
        position_ms: u64,
    },
    Failed {
        reverted_to: u32,
    },
    /// Superseded by a newer request and dropped.
    Stale,
}

/// Orchestrates tier changes for the playing video.
pub struct QualitySwitchCoordinator {
    resolver: SharedStreamResolver,
    events: EventBus,
    video_id: Option<String>,
    next_token: u64,
    latest: Option<QualitySwitchRequest>,
    current_quality_id: u32,
    last_good_quality_id: u32,
    outcome_tx: mpsc::UnboundedSender<SwitchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<SwitchOutcome>,
}

impl QualitySwitchCoordinator {
    pub fn new(resolver: SharedStreamResolver, events: EventBus) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            resolver,
            events,
            video_id: None,
            next_token: 0,
            latest: None,
            current_quality_id: FALLBACK_QUALITY,
            last_good_quality_id: FALLBACK_QUALITY,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Starts tracking a new video. Responses for the previous one become stale.
    pub fn reset_for_video(&mut self, video_id: &str, quality_id: u32) {
        self.video_id = Some(video_id.to_string());
        self.current_quality_id = quality_id;
        self.last_good_quality_id = quality_id;
        self.latest = None;
        // Burn a token so nothing issued before the reset can match.
        self.next_token += 1;
    }

    /// Tier shown to the user; the target while a switch is in flight.
    pub fn current_quality_id(&self) -> u32 {
        self.current_quality_id
    }

    pub fn last_good_quality_id(&self) -> u32 {
        self.last_good_quality_id
    }

    pub fn latest_request(&self) -> Option<&QualitySwitchRequest> {
        self.latest.as_ref()
    }

    /// `true` while the latest request waits for its stream.
    pub fn is_switching(&self) -> bool {
        self.latest
            .as_ref()
            .is_some_and(|r| r.state == SwitchState::Switching)
    }

    /// Begins switching to `target_quality_id`.
    ///
    /// The resume position is captured now, before anything async happens.
    /// Resolution runs on a spawned task; collect its outcome with
    /// [`next_outcome`](Self::next_outcome) or [`try_next_outcome`](Self::try_next_outcome).
    pub fn switch_quality(
        &mut self,
        clock: &PlaybackClock,
        target_quality_id: u32,
    ) -> Result<RequestToken> {
        let video_id = self.video_id.clone().ok_or(ControlError::NoVideoLoaded)?;
        let resume_at_ms = clock.position_ms();

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        if let Some(previous) = self.latest.as_ref().filter(|r| r.state == SwitchState::Switching) {
            debug!(superseded = %previous.token, by = %token, "Quality switch superseded");
        }
        self.latest = Some(QualitySwitchRequest {
            target_quality_id,
            resume_at_ms,
            state: SwitchState::Switching,
            token,
        });
        self.current_quality_id = target_quality_id;

        info!(%token, target_quality_id, resume_at_ms, "Quality switch started");
        self.events
            .publish(CoreEvent::Quality(QualityEvent::SwitchStarted {
                token: token.value(),
                target_quality_id,
                resume_at_ms,
            }));

        let resolver = self.resolver.clone();
        let tx = self.outcome_tx.clone();
        core_async::spawn(async move {
            let result = resolver
                .resolve(&video_id, target_quality_id)
                .await
                .map_err(|e| ControlError::ResolveFailed {
                    quality_id: target_quality_id,
                    reason: e.to_string(),
                });
            // The coordinator may be gone already; nothing to report to then.
            let _ = tx.send(SwitchOutcome {
                token,
                target_quality_id,
                result,
            });
        });

        Ok(token)
    }

    /// Waits for the next resolution outcome.
    pub async fn next_outcome(&mut self) -> Option<SwitchOutcome> {
        self.outcome_rx.recv().await
    }

    /// Returns a resolution outcome if one is ready.
    pub fn try_next_outcome(&mut self) -> Option<SwitchOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    /// Finishes a switch on the driving loop.
    ///
    /// Stale outcomes are logged and dropped. A failure reverts to the last
    /// tier that played and emits exactly one `SwitchFailed`. Either way the
    /// coordinator is idle afterwards: the request ends `Done` or `Failed`.
    pub fn apply_outcome(
        &mut self,
        clock: &mut PlaybackClock,
        outcome: SwitchOutcome,
    ) -> AppliedSwitch {
        let Some(request) = self
            .latest
            .as_mut()
            .filter(|r| r.token == outcome.token && r.state == SwitchState::Switching)
        else {
            debug!(token = %outcome.token, "Discarding stale quality response");
            return AppliedSwitch::Stale;
        };
        let resume_at_ms = request.resume_at_ms;

        let swapped = outcome.result.and_then(|stream| {
            let quality_id = stream.actual_quality_id;
            clock
                .swap_source(stream.source, quality_id, resume_at_ms)
                .map(|position_ms| (quality_id, position_ms))
        });

        match swapped {
            Ok((quality_id, position_ms)) => {
                request.state = SwitchState::Done;
                let was_downgraded = quality_id < outcome.target_quality_id;
                self.current_quality_id = quality_id;
                self.last_good_quality_id = quality_id;

                info!(quality_id, was_downgraded, position_ms, "Quality switched");
                self.events
                    .publish(CoreEvent::Quality(QualityEvent::Switched {
                        quality_id,
                        was_downgraded,
                        resume_at_ms,
                    }));
                AppliedSwitch::Switched {
                    quality_id,
                    was_downgraded,
                    position_ms,
                }
            }
            Err(e) => {
                request.state = SwitchState::Failed;
                let reverted_to = self.last_good_quality_id;
                self.current_quality_id = reverted_to;
                clock.set_current_quality(reverted_to);

                warn!(
                    requested = outcome.target_quality_id,
                    reverted_to,
                    error = %e,
                    "Quality switch failed"
                );
                self.events
                    .publish(CoreEvent::Quality(QualityEvent::SwitchFailed {
                        requested_quality_id: outcome.target_quality_id,
                        reverted_to,
                        reason: e.to_string(),
                    }));
                AppliedSwitch::Failed { reverted_to }
            }
        }
    }

    /// Applies every outcome that is already waiting.
    pub fn drain_ready(&mut self, clock: &mut PlaybackClock) -> Vec<AppliedSwitch> {
        let mut applied = Vec::new();
        while let Some(outcome) = self.try_next_outcome() {
            applied.push(self.apply_outcome(clock, outcome));
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_cover_known_tiers() {
        assert_eq!(quality_label(127), "8K");
        assert_eq!(quality_label(116), "1080P60");
        assert_eq!(quality_label(64), "720P");
        assert_eq!(quality_label(48), "48P");
    }

    #[test]
    fn best_match_prefers_exact_then_lower() {
        let available = [16, 32, 64, 80];
        assert_eq!(best_matching_quality(&available, 64), Some(64));
        assert_eq!(best_matching_quality(&available, 74), Some(64));
        assert_eq!(best_matching_quality(&[64, 80], 32), Some(64));
        assert_eq!(best_matching_quality(&[], 80), None);
    }

    #[test]
    fn permissions_gate_high_tiers() {
        assert!(check_permission(64, false, false).is_ok());
        assert!(matches!(
            check_permission(80, false, false),
            Err(ControlError::LoginRequired(80))
        ));
        assert!(matches!(
            check_permission(112, true, false),
            Err(ControlError::VipRequired(112))
        ));
        assert!(check_permission(127, true, true).is_ok());
    }

    #[test]
    fn max_available_respects_account() {
        let available = [16, 32, 64, 80, 112, 120];
        assert_eq!(max_available_quality(&available, false, false), 64);
        assert_eq!(max_available_quality(&available, true, false), 80);
        assert_eq!(max_available_quality(&available, true, true), 120);
        assert_eq!(max_available_quality(&[], true, true), FALLBACK_QUALITY);
        assert_eq!(max_available_quality(&[112, 120], false, false), 112);
    }

    #[test]
    fn tokens_are_ordered() {
        assert!(RequestToken(2) > RequestToken(1));
        assert_eq!(RequestToken(7).to_string(), "#7");
    }
}
