//! Guards for shared access and pins

use crate::lock::ResidencyLock;
use parking_lot::RwLockReadGuard;
use residency_core::LifecycleState;
use std::fmt;

/// Shared side of a lock's access gate, taken by [`ResidencyLock::rlock_if`]
///
/// While any read guard is alive no transition can start or finish, so the
/// state that satisfied the predicate stays current. Dropping the guard (or
/// calling [`unlock`](StateReadGuard::unlock)) releases it.
#[must_use = "dropping the guard releases shared access immediately"]
pub struct StateReadGuard<'a> {
    _reader: RwLockReadGuard<'a, ()>,
    state: LifecycleState,
}

impl<'a> StateReadGuard<'a> {
    pub(crate) fn new(reader: RwLockReadGuard<'a, ()>, state: LifecycleState) -> Self {
        StateReadGuard {
            _reader: reader,
            state,
        }
    }

    /// State that satisfied the predicate
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Release shared access
    pub fn unlock(self) {
        drop(self);
    }
}

impl fmt::Debug for StateReadGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateReadGuard")
            .field("state", &self.state)
            .finish()
    }
}

/// One pin on a resource, released on drop
///
/// Holding a pin defers `start_release_all` but does not block loads,
/// partial releases or readers.
#[must_use = "dropping the guard unpins immediately"]
pub struct PinGuard<'a> {
    lock: &'a ResidencyLock,
}

impl<'a> PinGuard<'a> {
    pub(crate) fn new(lock: &'a ResidencyLock) -> Self {
        PinGuard { lock }
    }

    /// Release the pin
    pub fn unpin(self) {
        drop(self);
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.lock.unpin();
    }
}

impl fmt::Debug for PinGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinGuard")
            .field("resource", &self.lock.label())
            .finish()
    }
}
