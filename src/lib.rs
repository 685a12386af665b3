//! A singly linked list shared by three kinds of threads.
//!
//! Searchers only examine the list and may run together. Inserters add to the
//! front; one insert may overlap any number of searches but never another
//! insert. Deleters remove items from anywhere in the list and run alone.
//!
//! ```
//! use searcher_list::SearcherList;
//!
//! let list = SearcherList::new();
//! assert_eq!(list.remove(&5), Ok(false));
//! list.insert(5).unwrap();
//! assert_eq!(list.search(&5), Ok(true));
//! assert_eq!(list.remove(&5), Ok(true));
//! assert_eq!(list.search(&5), Ok(false));
//! ```

mod tracing_helpers;

pub mod error;
pub mod searcher_list;
pub mod sync;

pub use error::ListError;
pub use searcher_list::{SearcherList, SearcherListBuilder};
pub use sync::{AdmissionPolicy, AdmissionSnapshot, CancelToken};
