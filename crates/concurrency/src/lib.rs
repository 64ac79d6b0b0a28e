//! Concurrency layer for residency
//!
//! This crate implements the residency lock for lazily loaded resources:
//! - ResidencyLock: state register, transitions, waits and gates in one monitor
//! - TransitionGuard: commit/rollback token for an in-flight load or release
//! - StateReadGuard: state-conditioned shared access
//! - PinGuard: scoped pin deferring terminal release
//! - ResidencyLockOptions: initial state and log label

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod guard;
pub mod lock;
pub mod options;

pub use access::{PinGuard, StateReadGuard};
pub use guard::{TransitionGuard, TransitionKind};
pub use lock::ResidencyLock;
pub use options::ResidencyLockOptions;

// Re-export core types for convenience
pub use residency_core::{
    is_data_loaded, is_not_released, LifecycleState, ResidencyError, ResidencySnapshot, Result,
    StatePredicate,
};
