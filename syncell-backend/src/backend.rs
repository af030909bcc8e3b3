//! The backend contract: a single versioned, atomically-written cell.
//!
//! A `Backend` is the only shared resource in the whole system. The Manager
//! never assumes anything about how a backend stores `(version, blob)` —
//! in-process, on a filesystem behind an advisory lock, or in an object
//! store with native CAS — only that the four operations below hold their
//! documented atomicity guarantees with respect to other participants on
//! the same cell.

use syncell_core::{Result, Version};

/// A versioned atomic cell, shared by every participant reading or writing
/// one logical value.
///
/// # Invariants
///
/// - `read` after a successful `write` or `try_write` (by any participant)
///   observes the newly installed `(version, blob)` or some strictly later
///   one.
/// - `try_write` is linearizable with respect to other `try_write`/`write`
///   calls on the same cell.
/// - `wait_for_change` may wake spuriously; callers must re-validate by
///   comparing versions, never assume the blob actually changed.
pub trait Backend: Send + Sync {
    /// Fetch the current `(version, blob)`, or `None` if the cell has never
    /// been written.
    fn read(&self) -> Result<Option<(Version, Vec<u8>)>>;

    /// Unconditionally replace the cell's contents, returning the new
    /// version. Used only for first-ever population or an intentional
    /// overwrite — most writers should prefer [`Backend::try_write`].
    fn write(&self, blob: Vec<u8>) -> Result<Version>;

    /// Compare-and-swap: install `blob` iff the cell's current version
    /// equals `expected` (or the cell is empty and `expected` is `None`).
    /// Returns `true` on success, `false` with no side effect on a mismatch.
    fn try_write(&self, blob: Vec<u8>, expected: Option<Version>) -> Result<bool>;

    /// Block until the cell's version has changed since the caller's last
    /// successful `wait_for_change` or `read`, or until the backend is
    /// asked to shut down.
    ///
    /// Returns `true` on an observed (possibly spurious) change, `false`
    /// only to signal permanent shutdown. Must be cancellable by
    /// [`Backend::shutdown`] from another thread.
    fn wait_for_change(&self) -> Result<bool>;

    /// Cooperatively unblock any thread currently parked in
    /// `wait_for_change` and cause future calls to return `false`
    /// immediately. Idempotent.
    fn shutdown(&self);
}
