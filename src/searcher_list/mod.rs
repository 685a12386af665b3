//! The shared singly linked list.
//!
//! - [`list::SearcherList`]: the public operations, each wrapped in an
//!   admission guard.
//! - `node`: the chain of atomically linked nodes.
//!
//! ## Publication
//!
//! The head and every `next` link are `ArcSwapOption`s. Writers never race
//! each other: at most one inserter is admitted at a time and never next to a
//! deleter, and a deleter runs alone. The atomic store is there only so that
//! searchers, which read the head without taking any lock, see either the
//! old head or a fully initialized new node.

pub mod list;
mod node;

#[cfg(test)]
mod tests;

pub use list::{SearcherList, SearcherListBuilder};
