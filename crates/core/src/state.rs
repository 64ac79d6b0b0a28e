//! Residency lifecycle states
//!
//! A resource moves between "metadata only", "data loaded" and "released".
//! Two transient states mark a transition in flight:
//!
//! ```text
//!              start_load_data            commit
//!   OnlyMeta ─────────────────► DataLoading ─────► DataLoaded
//!      ▲  ▲                         │ rollback          │  ▲
//!      │  └─────────────────────────┘                   │  │ rollback
//!      │            commit                              ▼  │
//!      └──────────────────────────────────────── DataReleasing
//!
//!   OnlyMeta | DataLoaded ──start_release_all──► Released (terminal)
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of a lazily loaded resource
///
/// Variants are ordered by how much of the resource is resident, which is
/// also the declaration order. `Released` has no outgoing transition.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LifecycleState {
    /// No data resident, metadata only (stable)
    #[default]
    OnlyMeta,
    /// A load is in flight (transient)
    DataLoading,
    /// Data resident (stable)
    DataLoaded,
    /// A partial release back to metadata is in flight (transient)
    DataReleasing,
    /// Fully torn down (terminal)
    Released,
}

impl LifecycleState {
    /// All states, in order
    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::OnlyMeta,
        LifecycleState::DataLoading,
        LifecycleState::DataLoaded,
        LifecycleState::DataReleasing,
        LifecycleState::Released,
    ];

    /// Check if a transition is in flight
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LifecycleState::DataLoading | LifecycleState::DataReleasing
        )
    }

    /// Check if the state is stable and not terminal
    pub fn is_stable(&self) -> bool {
        matches!(self, LifecycleState::OnlyMeta | LifecycleState::DataLoaded)
    }

    /// Check if the resource has been torn down
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Released)
    }

    /// Check if data is resident and readable
    pub fn is_data_resident(&self) -> bool {
        matches!(self, LifecycleState::DataLoaded)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::OnlyMeta => "OnlyMeta",
            LifecycleState::DataLoading => "DataLoading",
            LifecycleState::DataLoaded => "DataLoaded",
            LifecycleState::DataReleasing => "DataReleasing",
            LifecycleState::Released => "Released",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Predicate over the current state, checked atomically by `rlock_if`
pub type StatePredicate = fn(LifecycleState) -> bool;

/// Holds unless the resource has been released
pub fn is_not_released(state: LifecycleState) -> bool {
    state != LifecycleState::Released
}

/// Holds only while data is resident
pub fn is_data_loaded(state: LifecycleState) -> bool {
    state == LifecycleState::DataLoaded
}

/// Point-in-time view of a residency lock, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidencySnapshot {
    /// State at the time of the snapshot
    pub state: LifecycleState,
    /// Outstanding pins at the time of the snapshot
    pub pins: usize,
}

impl ResidencySnapshot {
    /// Check if terminal release could commit right now
    pub fn can_release_all(&self) -> bool {
        self.state.is_stable() && self.pins == 0
    }
}
