//! Residency lock
//!
//! Governs the residency lifecycle of one lazily loaded resource shared by many
//! readers and at most one loader/unloader at a time.
//!
//! ## Structure
//!
//! - **Register**: state + pin count behind one `Mutex`, with one `Condvar`
//!   broadcast on every change a waiter might care about. Each waiter re-checks
//!   its own predicate on wake.
//! - **Access gate**: an `RwLock<()>` whose shared side is handed out by
//!   [`ResidencyLock::rlock_if`]. Every state commit takes the exclusive side,
//!   so a state-gated reader never observes a transition mid-flight.
//!
//! ## Lock Order
//!
//! Access gate first, then register. Blocked operations hold only the register
//! while suspended and re-check their condition after re-acquiring the gate.
//!
//! ## Operation Summary
//!
//! | Operation | Blocks | Result |
//! |-----------|--------|--------|
//! | start_load_data | never | guard, no-op, or conflict |
//! | start_release_data | while a transition is in flight | guard or no-op |
//! | start_release_all | while in flight or pinned | guard or no-op |
//! | wait_until_loaded_or_released | until Loaded/Released | observed state |
//! | rlock_if | never (beyond a commit in progress) | read guard or none |
//! | pin_if_not_released / unpin | never | bool / panics on underflow |

use crate::access::{PinGuard, StateReadGuard};
use crate::guard::{TransitionGuard, TransitionKind};
use crate::options::ResidencyLockOptions;
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock, RwLockWriteGuard};
use residency_core::{LifecycleState, ResidencyError, ResidencySnapshot, Result};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// State register guarded by the lock's mutex
#[derive(Debug)]
struct Register {
    state: LifecycleState,
    pins: usize,
}

/// Synchronization primitive for a resource's residency lifecycle
///
/// One instance per resource. Transitions are started by `start_*` calls that
/// hand back a [`TransitionGuard`]; the caller performs the actual load or
/// release work and then finalizes the guard to commit or roll back.
///
/// # Thread Safety
///
/// All operations take `&self`. Share the lock through `Arc` or a reference
/// with a suitable lifetime.
///
/// A thread holding a [`StateReadGuard`] must not start or finalize a
/// transition on the same lock: commits wait for all readers to leave.
/// Taking further read guards while holding one is fine.
///
/// # Example
///
/// ```ignore
/// let lock = ResidencyLock::new(LifecycleState::OnlyMeta);
///
/// if let Some(guard) = lock.start_load_data()? {
///     let outcome = load_segment(&segment);
///     guard.finish(&outcome);
///     outcome?;
/// }
///
/// if let Some(_read) = lock.rlock_if(is_data_loaded) {
///     search(&segment);
/// }
/// ```
pub struct ResidencyLock {
    register: Mutex<Register>,
    changed: Condvar,
    access: RwLock<()>,
    label: Option<String>,
}

impl ResidencyLock {
    /// Create a lock in the given state with default options
    pub fn new(initial_state: LifecycleState) -> Self {
        Self::with_options(ResidencyLockOptions::default().with_initial_state(initial_state))
    }

    /// Create a lock from explicit options
    ///
    /// # Panics
    ///
    /// Panics if the initial state is transient (`DataLoading` or
    /// `DataReleasing`). No guard would exist to finish that transition.
    pub fn with_options(options: ResidencyLockOptions) -> Self {
        assert!(
            !options.initial_state.is_transient(),
            "residency lock cannot start in transient state {}",
            options.initial_state
        );
        ResidencyLock {
            register: Mutex::new(Register {
                state: options.initial_state,
                pins: 0,
            }),
            changed: Condvar::new(),
            access: RwLock::new(()),
            label: options.label,
        }
    }

    /// Resource label from the options, if any
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Current state
    ///
    /// The value may be stale as soon as it is returned. Use [`rlock_if`]
    /// to act on a state without racing a transition.
    ///
    /// [`rlock_if`]: ResidencyLock::rlock_if
    pub fn state(&self) -> LifecycleState {
        self.register.lock().state
    }

    /// Number of outstanding pins
    pub fn pin_count(&self) -> usize {
        self.register.lock().pins
    }

    /// Consistent view of state and pin count
    pub fn snapshot(&self) -> ResidencySnapshot {
        let reg = self.register.lock();
        ResidencySnapshot {
            state: reg.state,
            pins: reg.pins,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start loading data: `OnlyMeta` → `DataLoading`
    ///
    /// Never blocks on other transitions.
    ///
    /// # Returns
    /// - `Ok(Some(guard))` when the load started; the guard commits to
    ///   `DataLoaded` or rolls back to `OnlyMeta`
    /// - `Ok(None)` when data is already loaded
    /// - `Err(Conflict)` while another transition is in flight or after release
    pub fn start_load_data(&self) -> Result<Option<TransitionGuard<'_>>> {
        let (_writer, mut reg) = self.lock_for_commit();
        match reg.state {
            LifecycleState::OnlyMeta => {
                reg.state = LifecycleState::DataLoading;
                debug!(
                    resource = self.resource(),
                    from = %LifecycleState::OnlyMeta,
                    to = %reg.state,
                    "Load started"
                );
                Ok(Some(TransitionGuard::new(self, TransitionKind::Load)))
            }
            LifecycleState::DataLoaded => {
                debug!(resource = self.resource(), "Data already loaded, nothing to do");
                Ok(None)
            }
            state => Err(ResidencyError::conflict(TransitionKind::Load.operation(), state)),
        }
    }

    /// Start releasing data: `DataLoaded` → `DataReleasing`
    ///
    /// Blocks while a load or release is in flight, then decides on the
    /// settled state. Returns `None` when there is nothing to release
    /// (`OnlyMeta` or `Released`).
    pub fn start_release_data(&self) -> Option<TransitionGuard<'_>> {
        let kind = TransitionKind::ReleaseData;
        let (_writer, mut reg) = self.settle(|reg| !reg.state.is_transient());
        match reg.state {
            LifecycleState::DataLoaded => {
                reg.state = LifecycleState::DataReleasing;
                debug!(
                    resource = self.resource(),
                    from = %LifecycleState::DataLoaded,
                    to = %reg.state,
                    "Data release started"
                );
                Some(TransitionGuard::new(self, kind))
            }
            state => {
                debug!(resource = self.resource(), state = %state, "No data to release");
                None
            }
        }
    }

    /// Release the resource for good: `OnlyMeta | DataLoaded` → `Released`
    ///
    /// Blocks while a transition is in flight and while any pin is held.
    /// When a guard is returned the state is already `Released`; finalizing
    /// it only wakes waiters and cannot roll back. Returns `None` if the
    /// resource was already released.
    pub fn start_release_all(&self) -> Option<TransitionGuard<'_>> {
        let kind = TransitionKind::ReleaseAll;
        let (_writer, mut reg) = self.settle(|reg| match reg.state {
            LifecycleState::Released => true,
            state if state.is_transient() => false,
            _ => reg.pins == 0,
        });
        if reg.state.is_terminal() {
            debug!(resource = self.resource(), "Already released, nothing to do");
            return None;
        }

        let from = reg.state;
        reg.state = LifecycleState::Released;
        self.changed.notify_all();
        debug!(
            resource = self.resource(),
            from = %from,
            to = %reg.state,
            "Resource released"
        );
        Some(TransitionGuard::new(self, kind))
    }

    /// Finalize a transition started by this lock
    pub(crate) fn finish_transition(&self, kind: TransitionKind, committed: bool) {
        if kind == TransitionKind::ReleaseAll {
            let _reg = self.register.lock();
            self.changed.notify_all();
            if !committed {
                warn!(
                    resource = self.resource(),
                    "Release all reported failure, resource stays released"
                );
            }
            return;
        }

        let (_writer, mut reg) = self.lock_for_commit();
        let from = reg.state;
        debug_assert_eq!(Some(from), kind.transient_state());
        reg.state = if committed {
            kind.success_state()
        } else {
            kind.failure_state()
        };
        self.changed.notify_all();

        if committed {
            debug!(
                resource = self.resource(),
                operation = kind.operation(),
                from = %from,
                to = %reg.state,
                "Transition committed"
            );
        } else {
            warn!(
                resource = self.resource(),
                operation = kind.operation(),
                from = %from,
                to = %reg.state,
                "Transition rolled back"
            );
        }
    }

    // ========================================================================
    // Waiting
    // ========================================================================

    /// Block until data is loaded or the resource is released
    ///
    /// Does not change state. Returns the state that ended the wait.
    pub fn wait_until_loaded_or_released(&self) -> LifecycleState {
        let mut reg = self.register.lock();
        self.wait_while(&mut reg, |reg| !loaded_or_released(reg.state));
        reg.state
    }

    /// Like [`wait_until_loaded_or_released`], giving up after `timeout`
    ///
    /// Returns `None` if neither state was reached in time.
    ///
    /// [`wait_until_loaded_or_released`]: ResidencyLock::wait_until_loaded_or_released
    pub fn wait_until_loaded_or_released_for(&self, timeout: Duration) -> Option<LifecycleState> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return Some(self.wait_until_loaded_or_released()),
        };

        let mut reg = self.register.lock();
        while !loaded_or_released(reg.state) {
            if self.changed.wait_until(&mut reg, deadline).timed_out() {
                return loaded_or_released(reg.state).then_some(reg.state);
            }
        }
        Some(reg.state)
    }

    // ========================================================================
    // Shared Access and Pins
    // ========================================================================

    /// Take the shared access gate if `predicate` holds for the current state
    ///
    /// The check and the acquisition are atomic with respect to transitions:
    /// no state can be committed while the returned guard is alive. Nothing is
    /// held when the predicate fails.
    ///
    /// Readers do not queue behind a commit that is waiting for the gate, so
    /// this never suspends on another transition and a thread may hold several
    /// read guards at once.
    pub fn rlock_if<P>(&self, predicate: P) -> Option<StateReadGuard<'_>>
    where
        P: FnOnce(LifecycleState) -> bool,
    {
        let reader = self.access.read_recursive();
        let state = self.register.lock().state;
        if predicate(state) {
            Some(StateReadGuard::new(reader, state))
        } else {
            None
        }
    }

    /// Add a pin unless the resource is released
    ///
    /// Succeeds even while `start_release_all` waits for pins to drain. Each
    /// successful call must be matched by exactly one [`unpin`].
    ///
    /// [`unpin`]: ResidencyLock::unpin
    pub fn pin_if_not_released(&self) -> bool {
        let mut reg = self.register.lock();
        if reg.state.is_terminal() {
            return false;
        }
        reg.pins += 1;
        true
    }

    /// Drop a pin taken by [`pin_if_not_released`]
    ///
    /// # Panics
    ///
    /// Panics if no pin is outstanding. That is a caller bug and continuing
    /// would corrupt the pin count.
    ///
    /// [`pin_if_not_released`]: ResidencyLock::pin_if_not_released
    pub fn unpin(&self) {
        let mut reg = self.register.lock();
        if reg.pins == 0 {
            drop(reg);
            panic!(
                "unpin with no outstanding pin on resource {}",
                self.resource()
            );
        }
        reg.pins -= 1;
        if reg.pins == 0 {
            self.changed.notify_all();
        }
    }

    /// Pin the resource for the lifetime of the returned guard
    pub fn pin(&self) -> Option<PinGuard<'_>> {
        if self.pin_if_not_released() {
            Some(PinGuard::new(self))
        } else {
            None
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn resource(&self) -> &str {
        self.label.as_deref().unwrap_or("-")
    }

    fn lock_for_commit(&self) -> (RwLockWriteGuard<'_, ()>, MutexGuard<'_, Register>) {
        let writer = self.access.write();
        let reg = self.register.lock();
        (writer, reg)
    }

    /// Acquire the commit locks once `ready` holds
    fn settle<F>(&self, ready: F) -> (RwLockWriteGuard<'_, ()>, MutexGuard<'_, Register>)
    where
        F: Fn(&Register) -> bool,
    {
        loop {
            let (writer, mut reg) = self.lock_for_commit();
            if ready(&*reg) {
                return (writer, reg);
            }
            drop(writer);
            self.wait_while(&mut reg, |reg| !ready(reg));
        }
    }

    fn wait_while<F>(&self, reg: &mut MutexGuard<'_, Register>, blocked: F)
    where
        F: Fn(&Register) -> bool,
    {
        while blocked(&**reg) {
            self.changed.wait(reg);
        }
    }
}

fn loaded_or_released(state: LifecycleState) -> bool {
    matches!(state, LifecycleState::DataLoaded | LifecycleState::Released)
}

impl Default for ResidencyLock {
    fn default() -> Self {
        Self::new(LifecycleState::OnlyMeta)
    }
}

impl std::fmt::Debug for ResidencyLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ResidencyLock");
        s.field("label", &self.label);
        match self.register.try_lock() {
            Some(reg) => s.field("state", &reg.state).field("pins", &reg.pins),
            None => s.field("register", &format_args!("<locked>")),
        };
        s.finish()
    }
}
