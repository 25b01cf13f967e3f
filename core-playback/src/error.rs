//! # Control Error Types
//!
//! Errors raised inside the playback control surface.
//!
//! Most of these never reach the host as `Err`: component boundaries turn
//! them into degradations (overlay or skipping unavailable) or a single
//! [`QualityEvent::SwitchFailed`](core_runtime::events::QualityEvent::SwitchFailed)
//! notice. They still carry enough context for logs and tests.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur in playback control operations.
#[derive(Error, Debug)]
pub enum ControlError {
    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// A host bridge reported a failure.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// The comment track could not be fetched or parsed.
    #[error("Comment track unavailable: {0}")]
    TrackUnavailable(String),

    /// The skip segment list could not be fetched or parsed.
    #[error("Skip segments unavailable: {0}")]
    SegmentsUnavailable(String),

    // ========================================================================
    // Quality Switch Errors
    // ========================================================================
    /// The resolver could not produce a stream for the requested tier.
    #[error("Stream resolution failed for quality {quality_id}: {reason}")]
    ResolveFailed { quality_id: u32, reason: String },

    /// The player rejected the resolved stream.
    #[error("Source swap failed: {0}")]
    SwapFailed(String),

    /// The tier needs a signed-in account.
    #[error("Quality {0} requires login")]
    LoginRequired(u32),

    /// The tier needs a premium account.
    #[error("Quality {0} requires a VIP account")]
    VipRequired(u32),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Attempted operation when no video is loaded.
    #[error("No video loaded")]
    NoVideoLoaded,

    /// User settings are out of range.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ControlError::Bridge(err) => err.is_network(),
            ControlError::TrackUnavailable(_)
            | ControlError::SegmentsUnavailable(_)
            | ControlError::ResolveFailed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, ControlError::Bridge(err) if err.is_network())
    }

    /// Returns `true` if the failure is an account restriction rather than an outage.
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            ControlError::LoginRequired(_) | ControlError::VipRequired(_)
        )
    }
}

/// Result type for control operations.
pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_bridge_errors_are_transient() {
        let err = ControlError::from(BridgeError::Network("timeout".to_string()));
        assert!(err.is_transient());
        assert!(err.is_network_error());

        let err = ControlError::from(BridgeError::Parse("bad xml".to_string()));
        assert!(!err.is_transient());
        assert!(!err.is_network_error());
    }

    #[test]
    fn permission_errors_are_not_retried() {
        let err = ControlError::VipRequired(116);
        assert!(err.is_permission_error());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "Quality 116 requires a VIP account");
    }
}
