use core::fmt::{self, Debug};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam_utils::CachePadded;

use crate::error::ListError;
use crate::sync::{AdmissionController, AdmissionPolicy, AdmissionSnapshot, CancelToken, Role};
use crate::tracing_helpers::{debug_log, trace_log};

use super::node::{Chain, Link, Node, release_chain};

/// A singly linked list shared by searchers, inserters and deleters.
///
/// - [`search`](Self::search) runs alongside other searches and at most
///   one insert.
/// - [`insert`](Self::insert) prepends; inserts exclude each other and
///   deletes.
/// - [`remove`](Self::remove) unlinks one matching item from anywhere and
///   runs alone.
///
/// Every operation blocks in the [`AdmissionController`] until its role is
/// compatible with what is already running. The `_cancellable` variants
/// give up with [`ListError::Cancelled`] if their token fires during that
/// wait.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use searcher_list::SearcherList;
///
/// let list = Arc::new(SearcherList::new());
/// let handles: Vec<_> = (0..4)
///     .map(|i| {
///         let list = Arc::clone(&list);
///         thread::spawn(move || list.insert(i).unwrap())
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(list.len(), 4);
/// assert_eq!(list.search(&2), Ok(true));
/// assert_eq!(list.remove(&2), Ok(true));
/// assert_eq!(list.search(&2), Ok(false));
/// ```
pub struct SearcherList<T> {
    /// Written only by an admitted inserter or deleter; read by searchers
    /// without any lock.
    head: CachePadded<Link<T>>,
    len: AtomicUsize,
    admission: AdmissionController,
    validator: Option<fn(&T) -> bool>,
}

impl<T> SearcherList<T> {
    /// Creates an empty list with the default policy and no validator.
    pub fn new() -> Self {
        SearcherListBuilder::new().build()
    }

    pub fn builder() -> SearcherListBuilder<T> {
        SearcherListBuilder::new()
    }

    /// Inserts `item` at the front of the list.
    ///
    /// # Errors
    /// [`ListError::InvalidArgument`] if the validator rejects `item`.
    pub fn insert(&self, item: T) -> Result<(), ListError> {
        self.insert_with(item, None)
    }

    /// Like [`insert`](Self::insert), but gives up with
    /// [`ListError::Cancelled`] if `cancel` fires while waiting for
    /// admission.
    pub fn insert_cancellable(&self, item: T, cancel: &CancelToken) -> Result<(), ListError> {
        self.insert_with(item, Some(cancel))
    }

    fn insert_with(&self, item: T, cancel: Option<&CancelToken>) -> Result<(), ListError> {
        self.validate(&item)?;
        let _admission = self.admission.enter_insert(cancel)?;
        self.push_front(item);
        Ok(())
    }

    /// Requires inserter admission.
    fn push_front(&self, item: T) {
        // Admission guarantees this is the only writer of the head: one
        // inserter at most, and no deleter alongside it. The load/store pair
        // therefore cannot lose an update. The store only has to publish the
        // fully built node to searchers that read the head without a lock,
        // which the atomic swap provides.
        let node = Arc::new(Node::new(item, self.head.load_full()));
        self.head.store(Some(node));
        self.len.fetch_add(1, Ordering::AcqRel);
        trace_log!("published new head");
    }

    /// Number of items. Exact whenever no insert or remove is in flight.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters of the operations currently admitted or waiting.
    pub fn admission(&self) -> AdmissionSnapshot {
        self.admission.snapshot()
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.admission.policy()
    }

    /// Removes every item. Runs with deleter admission.
    pub fn clear(&self) {
        let _admission = self.admission.admit(Role::Deleter);
        let chain = self.head.swap(None);
        self.len.store(0, Ordering::Release);
        release_chain(chain);
    }

    fn chain(&self) -> Chain<T> {
        Chain::new(self.head.load_full())
    }

    fn validate(&self, item: &T) -> Result<(), ListError> {
        match self.validator {
            Some(accepts) if !accepts(item) => {
                debug_log!("item rejected by validator");
                Err(ListError::InvalidArgument)
            }
            _ => Ok(()),
        }
    }
}

impl<T: PartialEq> SearcherList<T> {
    /// Returns whether an item equal to `item` is in the list.
    ///
    /// The walk starts from the head as it was at admission; items inserted
    /// during the walk may or may not be seen.
    ///
    /// # Errors
    /// [`ListError::InvalidArgument`] if the validator rejects `item`.
    pub fn search(&self, item: &T) -> Result<bool, ListError> {
        self.search_with(item, None)
    }

    /// Like [`search`](Self::search), but gives up with
    /// [`ListError::Cancelled`] if `cancel` fires while waiting for
    /// admission.
    pub fn search_cancellable(&self, item: &T, cancel: &CancelToken) -> Result<bool, ListError> {
        self.search_with(item, Some(cancel))
    }

    fn search_with(&self, item: &T, cancel: Option<&CancelToken>) -> Result<bool, ListError> {
        self.validate(item)?;
        let _admission = self.admission.enter_search(cancel)?;
        let found = self.chain().any(|node| item == node.item());
        Ok(found)
    }

    /// Removes one item equal to `item`, returning whether one was found.
    ///
    /// # Errors
    /// [`ListError::InvalidArgument`] if the validator rejects `item`.
    pub fn remove(&self, item: &T) -> Result<bool, ListError> {
        self.remove_with(item, None)
    }

    /// Like [`remove`](Self::remove), but gives up with
    /// [`ListError::Cancelled`] if `cancel` fires while waiting for
    /// admission.
    pub fn remove_cancellable(&self, item: &T, cancel: &CancelToken) -> Result<bool, ListError> {
        self.remove_with(item, Some(cancel))
    }

    fn remove_with(&self, item: &T, cancel: Option<&CancelToken>) -> Result<bool, ListError> {
        self.validate(item)?;
        let _admission = self.admission.enter_remove(cancel)?;
        Ok(self.unlink_first(item))
    }

    /// Requires deleter admission: nothing else touches the chain, so links
    /// are rewritten freely.
    fn unlink_first(&self, item: &T) -> bool {
        let Some(head) = self.head.load_full() else {
            return false;
        };
        if item == head.item() {
            self.head.store(head.next());
            self.len.fetch_sub(1, Ordering::AcqRel);
            trace_log!("unlinked head");
            return true;
        }

        let mut prev = head;
        while let Some(curr) = prev.next() {
            if item == curr.item() {
                prev.set_next(curr.next());
                self.len.fetch_sub(1, Ordering::AcqRel);
                trace_log!("unlinked interior node");
                return true;
            }
            prev = curr;
        }
        false
    }
}

impl<T: Clone> SearcherList<T> {
    /// Clones the items front to back (most recently inserted first).
    /// Runs with searcher admission.
    pub fn snapshot(&self) -> Vec<T> {
        let _admission = self.admission.admit(Role::Searcher);
        self.chain().map(|node| node.item().clone()).collect()
    }
}

impl<T> Default for SearcherList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SearcherList<T> {
    fn drop(&mut self) {
        release_chain(self.head.swap(None));
    }
}

impl<T> Debug for SearcherList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearcherList")
            .field("len", &self.len())
            .field("policy", &self.policy())
            .field("admission", &self.admission())
            .finish()
    }
}

impl<T> FromIterator<T> for SearcherList<T> {
    /// Inserts in iteration order, so the last item ends up at the front.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let list = Self::new();
        {
            let _admission = list.admission.admit(Role::Inserter);
            for item in iter {
                list.push_front(item);
            }
        }
        list
    }
}

/// Configures a [`SearcherList`].
///
/// # Examples
///
/// ```
/// use searcher_list::{AdmissionPolicy, ListError, SearcherList};
///
/// let list: SearcherList<String> = SearcherList::builder()
///     .with_policy(AdmissionPolicy::PreferDeleters)
///     .with_validator(|s: &String| !s.is_empty())
///     .build();
///
/// assert_eq!(list.insert(String::new()), Err(ListError::InvalidArgument));
/// assert_eq!(list.insert("a".to_string()), Ok(()));
/// ```
pub struct SearcherListBuilder<T> {
    policy: AdmissionPolicy,
    validator: Option<fn(&T) -> bool>,
}

impl<T> SearcherListBuilder<T> {
    pub fn new() -> Self {
        Self {
            policy: AdmissionPolicy::default(),
            validator: None,
        }
    }

    /// Sets how waiting deleters are treated. Defaults to
    /// [`AdmissionPolicy::Broadcast`].
    pub fn with_policy(mut self, policy: AdmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rejects items for which `accepts` returns false with
    /// [`ListError::InvalidArgument`], before any admission is requested.
    /// Applies to inserted items and to the items search/remove look for alike.
    pub fn with_validator(mut self, accepts: fn(&T) -> bool) -> Self {
        self.validator = Some(accepts);
        self
    }

    pub fn build(self) -> SearcherList<T> {
        SearcherList {
            head: CachePadded::new(ArcSwapOption::empty()),
            len: AtomicUsize::new(0),
            admission: AdmissionController::new(self.policy),
            validator: self.validator,
        }
    }
}

impl<T> Default for SearcherListBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
