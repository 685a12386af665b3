use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// An atomically published reference to a node, or `None` at the end of the
/// chain. Used both for the list head and for every `next` link.
pub(crate) type Link<T> = ArcSwapOption<Node<T>>;

/// A node in the chain. The item is fixed at construction; only `next` is
/// ever rewritten, and only by an admitted deleter.
pub(crate) struct Node<T> {
    item: T,
    next: Link<T>,
}

impl<T> Node<T> {
    pub(crate) fn new(item: T, next: Option<Arc<Node<T>>>) -> Self {
        Self {
            item,
            next: ArcSwapOption::new(next),
        }
    }

    pub(crate) fn item(&self) -> &T {
        &self.item
    }

    pub(crate) fn next(&self) -> Option<Arc<Node<T>>> {
        self.next.load_full()
    }

    /// Points this node past its current successor.
    ///
    /// Callers must hold deleter admission.
    pub(crate) fn set_next(&self, next: Option<Arc<Node<T>>>) {
        self.next.store(next);
    }
}

/// Walks a chain starting from a snapshot of some link.
pub(crate) struct Chain<T> {
    cursor: Option<Arc<Node<T>>>,
}

impl<T> Chain<T> {
    pub(crate) fn new(start: Option<Arc<Node<T>>>) -> Self {
        Self { cursor: start }
    }
}

impl<T> Iterator for Chain<T> {
    type Item = Arc<Node<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor.take()?;
        self.cursor = node.next();
        Some(node)
    }
}

/// Frees a detached chain one node at a time.
///
/// Letting the head `Arc` drop would recurse once per node through the
/// `next` links. Stops early at a node someone else still holds; that
/// holder frees the remainder.
pub(crate) fn release_chain<T>(mut cursor: Option<Arc<Node<T>>>) {
    while let Some(node) = cursor {
        cursor = match Arc::try_unwrap(node) {
            Ok(node) => node.next.swap(None),
            Err(_) => None,
        };
    }
}
