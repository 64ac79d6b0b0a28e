//! Core types for residency
//!
//! This crate defines the plain data shared by the lock and its callers:
//! - LifecycleState: the five residency states and their classification
//! - Standard state predicates for state-gated reads
//! - ResidencyError: the conflict error returned by transition starts
//! - ResidencySnapshot: a serializable point-in-time view

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod state;

pub use error::{ResidencyError, Result};
pub use state::{
    is_data_loaded, is_not_released, LifecycleState, ResidencySnapshot, StatePredicate,
};
