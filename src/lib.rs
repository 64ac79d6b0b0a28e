//! # Residency
//!
//! Lifecycle lock for lazily loaded resources, such as data segments in a
//! storage or query engine, that many threads read while at most one thread
//! loads or releases them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use residency::prelude::*;
//!
//! let lock = ResidencyLock::new(LifecycleState::OnlyMeta);
//!
//! // Loader: start, do the work, report the outcome
//! if let Some(guard) = lock.start_load_data()? {
//!     let loaded = load_segment(&segment);
//!     guard.finish(&loaded);
//!     loaded?;
//! }
//!
//! // Reader: pin against teardown, read only while data is resident
//! if let Some(_pin) = lock.pin() {
//!     if let Some(_read) = lock.rlock_if(is_data_loaded) {
//!         search(&segment);
//!     }
//! }
//!
//! // Shutdown: waits for in-flight transitions and pins, then retires
//! if let Some(guard) = lock.start_release_all() {
//!     free_segment(&segment);
//!     guard.commit();
//! }
//! ```
//!
//! ## States
//!
//! - `OnlyMeta` → `DataLoading` → `DataLoaded` (or back on failure)
//! - `DataLoaded` → `DataReleasing` → `OnlyMeta` (or back on failure)
//! - `OnlyMeta | DataLoaded` → `Released` (terminal, never rolled back)
//!
//! ## Outcomes
//!
//! Transition starts distinguish three outcomes: a guard (work to do),
//! nothing (already there), and, for loads only, a [`ResidencyError`]
//! conflict. Caller bugs such as unpinning without a pin panic.

#![warn(missing_docs)]

pub mod prelude;

pub use residency_concurrency::{
    PinGuard, ResidencyLock, ResidencyLockOptions, StateReadGuard, TransitionGuard,
    TransitionKind,
};
pub use residency_core::{
    is_data_loaded, is_not_released, LifecycleState, ResidencyError, ResidencySnapshot, Result,
    StatePredicate,
};
