use std::fmt as StdFmt;

/// Errors surfaced by [`SearcherList`](crate::SearcherList) operations.
///
/// Neither variant leaves any state behind: an invalid item is rejected
/// before admission is requested, and a cancelled wait never increments
/// its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListError {
    /// The item was rejected by the list's validator.
    InvalidArgument,

    /// The caller's [`CancelToken`](crate::CancelToken) fired while it was
    /// blocked waiting for admission.
    Cancelled,
}

impl StdFmt::Display for ListError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "item rejected by validator"),

            Self::Cancelled => write!(f, "cancelled while waiting for admission"),
        }
    }
}

impl std::error::Error for ListError {}
