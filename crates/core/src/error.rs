//! Error types for residency transitions
//!
//! Only one condition is a recoverable error: starting a load while another
//! transition is in flight, or after the resource was released. "Nothing to
//! do" is not an error, and caller contract violations (unpinning without a
//! pin) panic instead of surfacing here.

use crate::state::LifecycleState;
use thiserror::Error;

/// Residency errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResidencyError {
    /// A transition could not start from the current state
    #[error("cannot start {operation} while resource is {state}")]
    Conflict {
        /// Operation that was rejected
        operation: &'static str,
        /// State that blocked it
        state: LifecycleState,
    },
}

/// Result type for residency operations
pub type Result<T> = std::result::Result<T, ResidencyError>;

impl ResidencyError {
    /// Create a conflict error
    pub fn conflict(operation: &'static str, state: LifecycleState) -> Self {
        ResidencyError::Conflict { operation, state }
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, ResidencyError::Conflict { .. })
    }

    /// Check if this error is retryable.
    ///
    /// A conflict against a transient state may succeed once the in-flight
    /// transition finishes. A released resource never comes back.
    pub fn is_retryable(&self) -> bool {
        match self {
            ResidencyError::Conflict { state, .. } => state.is_transient(),
        }
    }

    /// State observed when the operation was rejected
    pub fn state(&self) -> LifecycleState {
        match self {
            ResidencyError::Conflict { state, .. } => *state,
        }
    }
}
