//! The background worker that pulls externally-originated changes into a
//! Manager's cache (spec §4.7).

use crate::manager::Manager;
use std::sync::Weak;
use std::thread::{self, JoinHandle};

/// Spawn the watcher loop for `manager`. Holds only a [`Weak`] reference so
/// the thread never keeps the Manager alive on its own — it exits as soon as
/// the last strong reference is gone, or when [`Manager::shutdown`]
/// cancels the backend's `wait_for_change`.
pub(crate) fn spawn(manager: Weak<Manager>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let strong = match manager.upgrade() {
            Some(m) => m,
            None => break,
        };
        match strong.backend.wait_for_change() {
            Ok(true) => {
                let mut state = strong.state.lock();
                if state.in_transaction() {
                    tracing::debug!("watcher observed a change, deferring refresh");
                    state.pending_refresh = true;
                } else if let Err(e) = strong.refresh_locked(&mut state) {
                    tracing::warn!(error = %e, "watcher-driven refresh failed");
                }
            }
            Ok(false) => break,
            Err(e) => {
                tracing::error!(error = %e, "watcher wait_for_change failed, stopping");
                break;
            }
        }
    })
}
