//! Convenient imports for residency.
//!
//! ```ignore
//! use residency::prelude::*;
//!
//! let lock = ResidencyLock::new(LifecycleState::DataLoaded);
//! let read = lock.rlock_if(is_data_loaded);
//! ```

// Lock and guards
pub use crate::{PinGuard, ResidencyLock, ResidencyLockOptions, StateReadGuard, TransitionGuard};

// Error handling
pub use crate::{ResidencyError, Result};

// States and predicates
pub use crate::{is_data_loaded, is_not_released, LifecycleState};
