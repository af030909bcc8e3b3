//! Error taxonomy shared by every syncell crate.
//!
//! Each variant corresponds to one of the error kinds a conforming
//! implementation must surface: an operation either succeeds or fails with
//! one of these, never a bare `String` or a panic on reachable input.

use std::io;
use thiserror::Error;

/// Result alias used throughout syncell.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, mutating, or committing a value
/// graph through a Manager.
#[derive(Debug, Error)]
pub enum Error {
    /// `Manager::read` (or `refresh`) was attempted but the backend holds no
    /// value yet.
    #[error("backend cell is empty")]
    EmptyCell,

    /// The optimistic compare-and-swap at commit time lost to a competing
    /// writer. Recoverable by refreshing and retrying.
    #[error("transaction conflict: a competing commit advanced the backend version")]
    TransactionConflict,

    /// The retry helper exhausted its configured attempt budget.
    #[error("retry exhausted after {attempts} attempt(s)")]
    RetryExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// The retry helper's wall-clock deadline elapsed before a commit
    /// succeeded.
    #[error("retry deadline elapsed")]
    RetryTimeout,

    /// A mutation was attempted on a wrapper that is no longer reachable
    /// from its Manager's root.
    #[error("mutation attempted on a detached wrapper")]
    DetachedMutation,

    /// An attempt was made to link the same live wrapper into two positions
    /// in the graph at once.
    #[error("wrapper is already linked at another position")]
    Aliasing,

    /// `Manager::refresh` was called while a transaction was open.
    #[error("refresh is not allowed while a transaction is open")]
    RefreshDuringTransaction,

    /// The backend surfaced an I/O or storage failure.
    #[error("backend I/O error: {0}")]
    BackendIo(#[from] io::Error),

    /// The codec failed to decode a blob, or was asked to encode a value it
    /// cannot represent.
    #[error("codec error: {0}")]
    Codec(String),

    /// Any other condition that does not fit the taxonomy above but must
    /// still be reported rather than panicking (e.g. a poisoned advisory
    /// lock on the file backend).
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the one error kind the retry helper is allowed to swallow
    /// and re-run the closure for.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::TransactionConflict)
    }
}
