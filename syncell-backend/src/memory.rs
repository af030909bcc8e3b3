//! An in-process reference backend.
//!
//! Useful for tests and for collapsing the whole system into a single
//! process during development. Every [`InMemoryBackend`] handle created via
//! [`InMemoryBackend::attach`] shares the same underlying cell, so it can
//! stand in for "independent participants" talking to one storage medium in
//! single-process tests (see spec §8 scenario 3, the concurrent-retry test).

use crate::Backend;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use syncell_core::{Result, Version};

struct Shared {
    cell: Mutex<Option<(u64, Vec<u8>)>>,
    changed: Condvar,
    shutdown: AtomicBool,
    counter: AtomicU64,
}

/// An in-memory, mutex-guarded versioned cell.
///
/// Cloning an `InMemoryBackend` (via [`Clone`]) yields a handle onto the
/// *same* cell that shares shutdown state but tracks its own
/// `wait_for_change` position, matching the backend contract's "since the
/// last change observed by this caller" wording.
#[derive(Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
    last_seen: Arc<AtomicU64>,
}

impl InMemoryBackend {
    /// Create a fresh, empty cell.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            cell: Mutex::new(None),
            changed: Condvar::new(),
            shutdown: AtomicBool::new(false),
            counter: AtomicU64::new(0),
        });
        InMemoryBackend {
            shared,
            last_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach a new handle to the same underlying cell, as a second
    /// "participant" would. The new handle's `wait_for_change` baseline is
    /// the cell's current version, so it is not woken by history that
    /// predates the attach.
    pub fn attach(&self) -> Self {
        let current = self.shared.counter.load(Ordering::SeqCst);
        InMemoryBackend {
            shared: Arc::clone(&self.shared),
            last_seen: Arc::new(AtomicU64::new(current)),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for InMemoryBackend {
    fn read(&self) -> Result<Option<(Version, Vec<u8>)>> {
        let cell = self.shared.cell.lock();
        Ok(cell
            .as_ref()
            .map(|(v, blob)| (Version::from_raw(*v), blob.clone())))
    }

    fn write(&self, blob: Vec<u8>) -> Result<Version> {
        let mut cell = self.shared.cell.lock();
        let version = self.shared.counter.fetch_add(1, Ordering::SeqCst) + 1;
        *cell = Some((version, blob));
        self.shared.changed.notify_all();
        Ok(Version::from_raw(version))
    }

    fn try_write(&self, blob: Vec<u8>, expected: Option<Version>) -> Result<bool> {
        let mut cell = self.shared.cell.lock();
        let matches = match (&*cell, expected) {
            (None, None) => true,
            (Some((current, _)), Some(exp)) => *current == exp.into_raw(),
            _ => false,
        };
        if !matches {
            return Ok(false);
        }
        let version = self.shared.counter.fetch_add(1, Ordering::SeqCst) + 1;
        *cell = Some((version, blob));
        self.shared.changed.notify_all();
        Ok(true)
    }

    fn wait_for_change(&self) -> Result<bool> {
        let mut cell = self.shared.cell.lock();
        loop {
            if self.shared.shutdown.load(Ordering::SeqCst) {
                return Ok(false);
            }
            let current = cell.as_ref().map(|(v, _)| *v).unwrap_or(0);
            if current != self.last_seen.load(Ordering::SeqCst) {
                self.last_seen.store(current, Ordering::SeqCst);
                return Ok(true);
            }
            self.shared.changed.wait(&mut cell);
        }
    }

    fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        // Hold the lock while notifying so a waiter parked just before this
        // call cannot miss the wakeup.
        let _cell = self.shared.cell.lock();
        self.shared.changed.notify_all();
    }
}
