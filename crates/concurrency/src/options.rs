//! Residency lock configuration

use residency_core::LifecycleState;

/// Residency lock options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidencyLockOptions {
    /// State the lock starts in
    ///
    /// Must not be transient: no guard exists to finish a transition the
    /// lock was created in.
    pub initial_state: LifecycleState,
    /// Resource name attached to every log event (e.g. a segment id)
    pub label: Option<String>,
}

impl ResidencyLockOptions {
    /// Set the initial state
    pub fn with_initial_state(mut self, state: LifecycleState) -> Self {
        self.initial_state = state;
        self
    }

    /// Set the resource label used in log events
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
