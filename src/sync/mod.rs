//! Admission control and cancellation.
//!
//! - [`admission::AdmissionController`]: counts active searchers, inserters
//!   and deleters and blocks each role until it is compatible with what is
//!   already running.
//! - [`cancel::CancelToken`]: aborts a blocked admission wait without
//!   side effects.

pub mod admission;
pub mod cancel;


pub use admission::{AdmissionController, AdmissionGuard, AdmissionPolicy, AdmissionSnapshot, Role};
pub use cancel::CancelToken;
