use core::fmt::{self, Debug};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use spin::Mutex;

use crate::tracing_helpers::trace_log;

/// Something blocked on a condition that a cancelled token must wake.
///
/// Implementors are expected to take whatever lock guards their condition
/// before notifying, so a waiter that checked the token under that lock
/// cannot miss the wake-up.
pub(crate) trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// A cancellation signal shared between a blocked caller and whoever wants
/// to abort it.
///
/// Cloning a token yields another handle to the same signal. Once
/// cancelled a token stays cancelled.
///
/// # Examples
///
/// ```
/// use searcher_list::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    waiters: Mutex<HashMap<u64, Arc<dyn Interrupt>>>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every wait currently registered with it.
    ///
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        // Snapshot first: interrupting takes the waiter's own lock, which
        // must never be acquired while the registry is held.
        let waiters: Vec<Arc<dyn Interrupt>> =
            self.inner.waiters.lock().values().cloned().collect();
        trace_log!(waiters = waiters.len(), "cancel token fired");
        for waiter in waiters {
            waiter.interrupt();
        }
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any
    /// handle of this token.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a waiter to be interrupted on cancellation. The waiter is
    /// unregistered when the returned value is dropped.
    ///
    /// Register before checking [`is_cancelled`](Self::is_cancelled);
    /// checking first leaves a window where a cancellation is missed.
    pub(crate) fn register(&self, waiter: Arc<dyn Interrupt>) -> Registration<'_> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.waiters.lock().insert(id, waiter);
        Registration { token: self, id }
    }

    #[cfg(test)]
    pub(crate) fn registered(&self) -> usize {
        self.inner.waiters.lock().len()
    }
}

impl Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Keeps a waiter registered with a [`CancelToken`] for as long as it lives.
pub(crate) struct Registration<'a> {
    token: &'a CancelToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.token.inner.waiters.lock().remove(&self.id);
    }
}
