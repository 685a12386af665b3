use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::ListError;
use crate::tracing_helpers::{debug_log, trace_log};

use super::cancel::{CancelToken, Interrupt};

/// The three operation categories the controller arbitrates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Read-only traversal. Compatible with other searchers and one inserter.
    Searcher,
    /// Prepends to the list. Excludes other inserters and deleters.
    Inserter,
    /// Unlinks anywhere in the list. Excludes everything.
    Deleter,
}

/// How waiting deleters are treated relative to newcomers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionPolicy {
    /// Broadcast wake-ups only. A steady stream of searchers or inserters
    /// can keep a deleter waiting forever.
    #[default]
    Broadcast,
    /// New searchers and inserters queue behind any waiting deleter, so a
    /// deleter is admitted as soon as the operations already inside drain.
    PreferDeleters,
}

/// Point-in-time copy of the admission counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdmissionSnapshot {
    pub searchers: usize,
    pub inserters: usize,
    pub deleters: usize,
    /// Deleters currently blocked in `enter_remove`.
    pub waiting_deleters: usize,
}

impl AdmissionSnapshot {
    /// Checks the compatibility matrix: at most one inserter, at most one
    /// deleter, and an active deleter excludes everyone else.
    pub fn is_consistent(&self) -> bool {
        self.inserters <= 1
            && self.deleters <= 1
            && (self.deleters == 0 || (self.searchers == 0 && self.inserters == 0))
    }
}

#[derive(Default)]
struct Counters {
    searchers: usize,
    inserters: usize,
    deleters: usize,
    waiting_deleters: usize,
}

impl Counters {
    fn blocks(&self, role: Role, policy: AdmissionPolicy) -> bool {
        let deleter_queued =
            policy == AdmissionPolicy::PreferDeleters && self.waiting_deleters != 0;
        match role {
            Role::Searcher => self.deleters != 0 || deleter_queued,
            Role::Inserter => self.inserters != 0 || self.deleters != 0 || deleter_queued,
            Role::Deleter => self.deleters != 0 || self.inserters != 0 || self.searchers != 0,
        }
    }

    fn active_mut(&mut self, role: Role) -> &mut usize {
        match role {
            Role::Searcher => &mut self.searchers,
            Role::Inserter => &mut self.inserters,
            Role::Deleter => &mut self.deleters,
        }
    }

    fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            searchers: self.searchers,
            inserters: self.inserters,
            deleters: self.deleters,
            waiting_deleters: self.waiting_deleters,
        }
    }
}

/// The counters and one wait-condition per role, all behind one mutex.
#[derive(Default)]
struct Gate {
    state: Mutex<Counters>,
    searchers: Condvar,
    inserters: Condvar,
    deleters: Condvar,
}

impl Gate {
    fn condvar(&self, role: Role) -> &Condvar {
        match role {
            Role::Searcher => &self.searchers,
            Role::Inserter => &self.inserters,
            Role::Deleter => &self.deleters,
        }
    }
}

impl Interrupt for Gate {
    fn interrupt(&self) {
        let _state = self.state.lock();
        self.searchers.notify_all();
        self.inserters.notify_all();
        self.deleters.notify_all();
    }
}

/// Admission control for searchers, inserters and deleters.
///
/// Each `enter_*` call blocks until its role is compatible with everything
/// already admitted, then returns an [`AdmissionGuard`]. Dropping the guard
/// performs the matching `leave_*` and wakes the roles that may now proceed.
///
/// Compatibility:
///
/// | active \ entering | searcher | inserter | deleter |
/// |-------------------|----------|----------|---------|
/// | searcher          | yes      | yes      | no      |
/// | inserter          | yes      | no       | no      |
/// | deleter           | no       | no       | no      |
///
/// Under [`AdmissionPolicy::Broadcast`] nothing prevents deleter starvation.
pub struct AdmissionController {
    gate: Arc<Gate>,
    policy: AdmissionPolicy,
}

impl AdmissionController {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            gate: Arc::new(Gate::default()),
            policy,
        }
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        self.gate.state.lock().snapshot()
    }

    /// Blocks while a deleter is active (or queued, under
    /// [`AdmissionPolicy::PreferDeleters`]).
    pub fn enter_search(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<AdmissionGuard<'_>, ListError> {
        self.enter(Role::Searcher, cancel)
    }

    /// Blocks while another inserter or a deleter is active.
    pub fn enter_insert(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<AdmissionGuard<'_>, ListError> {
        self.enter(Role::Inserter, cancel)
    }

    /// Blocks while anything else is active.
    pub fn enter_remove(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<AdmissionGuard<'_>, ListError> {
        self.enter(Role::Deleter, cancel)
    }

    /// Enters `role` without a cancellation point.
    pub fn admit(&self, role: Role) -> AdmissionGuard<'_> {
        let mut state = self.gate.state.lock();
        let admitted = self.wait_while_blocked(&mut state, role, None);
        debug_assert!(admitted, "uncancellable wait gave up");
        self.grant(&mut state, role)
    }

    /// Enters `role`, giving up with [`ListError::Cancelled`] if `cancel`
    /// fires while blocked. A cancelled wait leaves the counters untouched.
    pub fn enter(
        &self,
        role: Role,
        cancel: Option<&CancelToken>,
    ) -> Result<AdmissionGuard<'_>, ListError> {
        let mut state = self.gate.state.lock();
        if !self.wait_while_blocked(&mut state, role, cancel) {
            debug_log!(?role, "admission wait cancelled");
            return Err(ListError::Cancelled);
        }
        Ok(self.grant(&mut state, role))
    }

    fn grant(&self, state: &mut MutexGuard<'_, Counters>, role: Role) -> AdmissionGuard<'_> {
        *state.active_mut(role) += 1;
        debug_assert!(state.snapshot().is_consistent());
        trace_log!(?role, "admitted");
        AdmissionGuard {
            controller: self,
            role,
        }
    }

    /// Returns false if the wait was cancelled. Only blocks when `role` is
    /// currently incompatible, so an uncontended call never observes
    /// cancellation.
    fn wait_while_blocked(
        &self,
        state: &mut MutexGuard<'_, Counters>,
        role: Role,
        cancel: Option<&CancelToken>,
    ) -> bool {
        if !state.blocks(role, self.policy) {
            return true;
        }
        if role == Role::Deleter {
            state.waiting_deleters += 1;
        }

        // Registering under the state lock is fine: cancel() never holds the
        // registry while taking this lock.
        let mut registration = None;
        let admitted = loop {
            if !state.blocks(role, self.policy) {
                break true;
            }
            if let Some(token) = cancel {
                if registration.is_none() {
                    let waiter: Arc<dyn Interrupt> = self.gate.clone();
                    registration = Some(token.register(waiter));
                }
                if token.is_cancelled() {
                    break false;
                }
            }
            trace_log!(?role, "waiting for admission");
            self.gate.condvar(role).wait(state);
        };
        drop(registration);

        if role == Role::Deleter {
            state.waiting_deleters -= 1;
            if self.policy == AdmissionPolicy::PreferDeleters && state.waiting_deleters == 0 {
                // Newcomers may have queued behind this deleter.
                self.gate.searchers.notify_all();
                self.gate.inserters.notify_all();
            }
        }
        admitted
    }

    fn leave_search(&self) {
        let mut state = self.gate.state.lock();
        state.searchers -= 1;
        trace_log!(searchers = state.searchers, "searcher left, waking deleters");
        self.gate.deleters.notify_all();
    }

    fn leave_insert(&self) {
        let mut state = self.gate.state.lock();
        state.inserters -= 1;
        trace_log!("inserter left, waking deleters and inserters");
        self.gate.deleters.notify_all();
        self.gate.inserters.notify_all();
    }

    fn leave_remove(&self) {
        let mut state = self.gate.state.lock();
        state.deleters -= 1;
        trace_log!("deleter left, waking all waiters");
        self.gate.deleters.notify_all();
        self.gate.inserters.notify_all();
        self.gate.searchers.notify_all();
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(AdmissionPolicy::default())
    }
}

/// Proof of admission for one role. Dropping it leaves.
///
/// The release runs on every exit path, unwinding included.
#[must_use = "admission is released as soon as the guard is dropped"]
pub struct AdmissionGuard<'a> {
    controller: &'a AdmissionController,
    role: Role,
}

impl AdmissionGuard<'_> {
    pub fn role(&self) -> Role {
        self.role
    }
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        trace_log!(role = ?self.role, "leaving");
        match self.role {
            Role::Searcher => self.controller.leave_search(),
            Role::Inserter => self.controller.leave_insert(),
            Role::Deleter => self.controller.leave_remove(),
        }
    }
}
