use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use super::list::SearcherList;


/// Spins until `pred` holds for the list, panicking after a generous
/// deadline.
pub(super) fn wait_until<T>(list: &SearcherList<T>, pred: impl Fn(&SearcherList<T>) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !pred(list) {
        assert!(Instant::now() < deadline, "condition never reached");
        thread::yield_now();
    }
}

/// A test item compared by `key`. An item being looked for may carry a hook that runs
/// whenever it is compared against a stored item.
#[derive(Clone)]
pub(super) struct Item {
    pub key: u32,
    pub hook: Option<Arc<Hook>>,
}

impl Item {
    pub fn plain(key: u32) -> Self {
        Self { key, hook: None }
    }

    pub fn hooked(key: u32, hook: Hook) -> Self {
        Self {
            key,
            hook: Some(Arc::new(hook)),
        }
    }
}

pub(super) enum Hook {
    /// Meets the test thread on `entered`, then parks on `release`.
    Stall { entered: Barrier, release: Barrier },
    /// Panics mid-comparison.
    Panic,
    /// Records which role is comparing and flags overlaps.
    Watch { deleter: bool, watch: Arc<Watch> },
}

impl Hook {
    pub fn stall() -> Self {
        Hook::Stall {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }
}

/// Counts comparisons in flight per role.
#[derive(Default)]
pub(super) struct Watch {
    searching: AtomicUsize,
    deleting: AtomicUsize,
    pub violations: AtomicUsize,
}

impl Watch {
    fn observe(&self, deleter: bool) {
        if deleter {
            let others = self.deleting.fetch_add(1, Ordering::SeqCst);
            if others != 0 || self.searching.load(Ordering::SeqCst) != 0 {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
            (0..64).for_each(|_| core::hint::spin_loop());
            self.deleting.fetch_sub(1, Ordering::SeqCst);
        } else {
            self.searching.fetch_add(1, Ordering::SeqCst);
            if self.deleting.load(Ordering::SeqCst) != 0 {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
            self.searching.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        match self.hook.as_deref() {
            Some(Hook::Stall { entered, release }) => {
                entered.wait();
                release.wait();
            }
            Some(Hook::Panic) => panic!("comparison fault"),
            Some(Hook::Watch { deleter, watch }) => watch.observe(*deleter),
            None => {}
        }
        self.key == other.key
    }
}
