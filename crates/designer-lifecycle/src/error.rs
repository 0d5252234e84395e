//! Error types for the design lifecycle
//!
//! - Transition rejections are contract violations of the caller
//! - Persistence failures are surfaced to the user and leave state untouched

use crate::state::{DesignId, LifecycleAction, LifecycleState};

/// Errors raised by a persistence backend
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// No design with this id
    #[error("design not found: {0}")]
    NotFound(DesignId),

    /// Filesystem or transport failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored design could not be encoded or decoded
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Backend rejected the request
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend did not answer in time
    #[error("timed out after {after_ms}ms")]
    TimedOut {
        /// Timeout that elapsed
        after_ms: u64,
    },
}

impl From<serde_yaml::Error> for PersistenceError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The action is not allowed from the current state
    #[error("cannot {attempted} a design that is {from}")]
    TransitionRejected {
        /// State at the time of the call
        from: LifecycleState,
        /// Rejected action
        attempted: LifecycleAction,
    },

    /// The persistence round trip failed
    #[error("{operation} failed: {cause}")]
    PersistenceFailed {
        /// Action that was attempted
        operation: LifecycleAction,
        /// Backend failure
        #[source]
        cause: PersistenceError,
    },

    /// The caller addressed a different design than the one owned
    #[error("design id mismatch: lifecycle owns {expected}, got {actual}")]
    DesignIdMismatch {
        /// Id owned by the lifecycle
        expected: DesignId,
        /// Id passed by the caller
        actual: DesignId,
    },
}

impl LifecycleError {
    /// Whether the error signals a caller contract violation
    #[inline]
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::TransitionRejected { .. } | Self::DesignIdMismatch { .. }
        )
    }

    /// Whether retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailed { .. })
    }
}
