//! Transition guards
//!
//! A `TransitionGuard` is handed out when a transition starts and must be
//! finalized exactly once when the caller's load or release work is done.
//! Finalizers take the guard by value, so finalizing twice does not compile.
//!
//! | Kind | In flight | Success | Failure |
//! |------|-----------|---------|---------|
//! | Load | DataLoading | DataLoaded | OnlyMeta |
//! | ReleaseData | DataReleasing | OnlyMeta | DataLoaded |
//! | ReleaseAll | - | Released | Released |
//!
//! A guard dropped without being finalized rolls back. This also covers the
//! caller's work panicking between start and finish.

use crate::lock::ResidencyLock;
use residency_core::LifecycleState;
use std::fmt;
use tracing::{error, warn};

/// Kind of transition a guard finalizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// `OnlyMeta` → `DataLoaded`
    Load,
    /// `DataLoaded` → `OnlyMeta`
    ReleaseData,
    /// Any stable state → `Released`, never rolled back
    ReleaseAll,
}

impl TransitionKind {
    /// Operation name used in errors and log events
    pub fn operation(&self) -> &'static str {
        match self {
            TransitionKind::Load => "load",
            TransitionKind::ReleaseData => "release data",
            TransitionKind::ReleaseAll => "release all",
        }
    }

    /// State held while the transition is in flight
    ///
    /// Release-all commits immediately and has no transient state.
    pub fn transient_state(&self) -> Option<LifecycleState> {
        match self {
            TransitionKind::Load => Some(LifecycleState::DataLoading),
            TransitionKind::ReleaseData => Some(LifecycleState::DataReleasing),
            TransitionKind::ReleaseAll => None,
        }
    }

    /// State committed on success
    pub fn success_state(&self) -> LifecycleState {
        match self {
            TransitionKind::Load => LifecycleState::DataLoaded,
            TransitionKind::ReleaseData => LifecycleState::OnlyMeta,
            TransitionKind::ReleaseAll => LifecycleState::Released,
        }
    }

    /// State restored on failure
    pub fn failure_state(&self) -> LifecycleState {
        match self {
            TransitionKind::Load => LifecycleState::OnlyMeta,
            TransitionKind::ReleaseData => LifecycleState::DataLoaded,
            TransitionKind::ReleaseAll => LifecycleState::Released,
        }
    }
}

/// Single-use token for an in-flight transition
///
/// While the guard is alive the lock holds the transition's transient state
/// and rejects or delays conflicting transitions.
#[must_use = "a transition guard must be finalized with commit, rollback, done or finish"]
pub struct TransitionGuard<'a> {
    lock: &'a ResidencyLock,
    kind: TransitionKind,
    finalized: bool,
}

impl<'a> TransitionGuard<'a> {
    pub(crate) fn new(lock: &'a ResidencyLock, kind: TransitionKind) -> Self {
        TransitionGuard {
            lock,
            kind,
            finalized: false,
        }
    }

    /// Kind of transition this guard finalizes
    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// State the lock moves to on [`commit`](TransitionGuard::commit)
    pub fn success_state(&self) -> LifecycleState {
        self.kind.success_state()
    }

    /// State the lock returns to on [`rollback`](TransitionGuard::rollback)
    pub fn failure_state(&self) -> LifecycleState {
        self.kind.failure_state()
    }

    /// Report success
    pub fn commit(self) {
        self.finalize(true);
    }

    /// Report failure and restore the prior stable state
    pub fn rollback(self) {
        self.finalize(false);
    }

    /// Finalize with an optional failure, committing when there is none
    pub fn done(self, failure: Option<&dyn std::error::Error>) {
        if let Some(err) = failure {
            self.log_failure(err);
        }
        self.finalize(failure.is_none());
    }

    /// Finalize from the outcome of the caller's work
    ///
    /// ```ignore
    /// if let Some(guard) = lock.start_load_data()? {
    ///     let loaded = loader.load(&segment);
    ///     guard.finish(&loaded);
    ///     loaded?;
    /// }
    /// ```
    pub fn finish<T, E: fmt::Display>(self, outcome: &std::result::Result<T, E>) {
        if let Err(err) = outcome {
            self.log_failure(err);
        }
        self.finalize(outcome.is_ok());
    }

    fn log_failure<D: fmt::Display>(&self, err: D) {
        warn!(
            resource = self.lock.label().unwrap_or("-"),
            operation = self.kind.operation(),
            error = %err,
            "Transition work failed"
        );
    }

    fn finalize(mut self, committed: bool) {
        self.finalized = true;
        self.lock.finish_transition(self.kind, committed);
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let panicking = std::thread::panicking();
        let message = abandon_message(self.kind, panicking);
        if panicking {
            warn!(
                resource = self.lock.label().unwrap_or("-"),
                operation = self.kind.operation(),
                "{}",
                message
            );
        } else {
            error!(
                resource = self.lock.label().unwrap_or("-"),
                operation = self.kind.operation(),
                "{}",
                message
            );
        }
        self.lock.finish_transition(self.kind, false);
    }
}

/// Log message for a guard dropped without being finalized
///
/// Release-all has already committed `Released`, so there is nothing to roll
/// back; dropping it only wakes waiters.
fn abandon_message(kind: TransitionKind, panicking: bool) -> &'static str {
    match (kind, panicking) {
        (TransitionKind::ReleaseAll, true) => {
            "Release-all guard dropped during panic, state stays Released"
        }
        (TransitionKind::ReleaseAll, false) => {
            "Release-all guard dropped without being finalized, state stays Released"
        }
        (_, true) => "Transition guard dropped during panic, rolling back",
        (_, false) => "Transition guard dropped without being finalized, rolling back",
    }
}

impl fmt::Debug for TransitionGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionGuard")
            .field("resource", &self.lock.label())
            .field("kind", &self.kind)
            .finish()
    }
}
