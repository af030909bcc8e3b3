//! The per-participant coordinator: cache of root + version, the engine
//! mutex, and the read/refresh/write/snapshot/transaction surface (spec
//! §4.6).

use crate::arena::{Arena, Handle, NodeState};
use crate::link;
use crate::transaction::Transaction;
use crate::wrappers::{self, Node};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use syncell_backend::{Backend, FileBackend};
use syncell_codec::{Codec, NodeData};
use syncell_core::{Error, Result, Version};

/// Tunables for a [`Manager`], following this corpus's `*Config` struct +
/// `Default` + builder-style setters convention.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Poll interval handed to backends that can only poll for changes (see
    /// [`Manager::with_file_backend`]). Backends with a native blocking
    /// `wait_for_change` ignore this.
    pub watcher_poll_interval: Duration,
    /// Whether the background watcher thread is started at all. Tests that
    /// drive `refresh` manually can disable it to keep behavior
    /// single-threaded and deterministic.
    pub start_watcher: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            watcher_poll_interval: Duration::from_millis(100),
            start_watcher: true,
        }
    }
}

impl ManagerConfig {
    pub fn with_watcher_poll_interval(mut self, interval: Duration) -> Self {
        self.watcher_poll_interval = interval;
        self
    }

    pub fn with_watcher_enabled(mut self, enabled: bool) -> Self {
        self.start_watcher = enabled;
        self
    }
}

/// Per-transaction-frame bookkeeping used only to give a failed *nested*
/// transaction something to undo (spec §4.5). The outermost scope never
/// needs this: its failure path just re-reads the backend.
#[derive(Default)]
pub(crate) struct Frame {
    /// Handles whose dirty flag this frame flipped from clean to dirty.
    dirty_touched: Vec<Handle>,
    /// Handles detached while this frame was open. Spec §3 invariant 5
    /// (detached never clears) means a failed nested frame has nothing to
    /// undo here; the list exists so the intent is visible, not because
    /// anything reads it back.
    #[allow(dead_code)]
    detached_in_frame: Vec<Handle>,
}

/// Everything protected by the engine mutex (spec §5: "one mutex ... cache
/// (root + version), watcher coordination state, the active transaction
/// frame stack").
pub(crate) struct EngineState {
    pub(crate) arena: Arena<NodeState>,
    pub(crate) root: Option<Handle>,
    pub(crate) cached_version: Option<Version>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) baseline: Option<Version>,
    pub(crate) pending_refresh: bool,
}

impl EngineState {
    fn empty() -> Self {
        EngineState {
            arena: Arena::new(),
            root: None,
            cached_version: None,
            frames: Vec::new(),
            baseline: None,
            pending_refresh: false,
        }
    }

    pub(crate) fn in_transaction(&self) -> bool {
        !self.frames.is_empty()
    }

    /// The common `mark_dirty` hook from spec §4.3, routed through here so
    /// the active frame (if any) learns which nodes it newly dirtied.
    pub(crate) fn mark_dirty(&mut self, handle: Handle) -> Result<()> {
        let touched = link::mark_dirty(&mut self.arena, handle)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.dirty_touched.extend(touched);
        }
        Ok(())
    }

    /// Detach a subtree and note it against the active frame, if any.
    pub(crate) fn detach(&mut self, handle: Handle) {
        link::detach_subtree(&mut self.arena, handle);
        if let Some(frame) = self.frames.last_mut() {
            frame.detached_in_frame.push(handle);
        }
    }
}

/// The top-level entry point: owns the arena, the backend handle, the
/// codec, and the watcher thread.
pub struct Manager {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) state: Mutex<EngineState>,
    config: ManagerConfig,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Manager {
    /// Create a Manager over `backend`/`codec` with default configuration,
    /// starting its watcher thread immediately.
    pub fn new(backend: impl Backend + 'static, codec: impl Codec + 'static) -> Arc<Self> {
        Self::with_config(backend, codec, ManagerConfig::default())
    }

    /// Create a Manager with explicit configuration.
    pub fn with_config(
        backend: impl Backend + 'static,
        codec: impl Codec + 'static,
        config: ManagerConfig,
    ) -> Arc<Self> {
        let manager = Arc::new(Manager {
            backend: Arc::new(backend),
            codec: Arc::new(codec),
            state: Mutex::new(EngineState::empty()),
            config,
            watcher: Mutex::new(None),
        });
        if manager.config.start_watcher {
            // The watcher holds only a `Weak` handle: a strong `Arc<Manager>`
            // stashed in the thread closure would keep the Manager alive
            // forever, since `shutdown` (which stops the thread) is reached
            // through `Drop`.
            let handle = crate::watcher::spawn(Arc::downgrade(&manager));
            *manager.watcher.lock() = Some(handle);
        }
        manager
    }

    /// Convenience constructor wiring `config.watcher_poll_interval` into a
    /// fresh [`FileBackend`], for the common case of a file-backed Manager
    /// (spec §9: "the file backend should poll with a small interval").
    pub fn with_file_backend(
        data_path: impl AsRef<Path>,
        codec: impl Codec + 'static,
        config: ManagerConfig,
    ) -> Arc<Self> {
        let backend =
            FileBackend::new(data_path.as_ref()).with_poll_interval(config.watcher_poll_interval);
        Self::with_config(backend, codec, config)
    }

    /// Returns the cached root wrapper if the cache is known-current;
    /// otherwise performs a [`Manager::refresh`]. Fails with
    /// [`Error::EmptyCell`] if the backend holds no value yet.
    pub fn read(self: &Arc<Self>) -> Result<Node> {
        {
            let state = self.state.lock();
            if let Some(root) = state.root {
                return Ok(wrappers::make_node(self, &state.arena, root));
            }
        }
        self.refresh()
    }

    /// Re-reads the backend, decodes, and replaces the cached tree,
    /// detaching whatever the previous tree held. Disallowed while a
    /// transaction is open (spec §4.6).
    pub fn refresh(self: &Arc<Self>) -> Result<Node> {
        let mut state = self.state.lock();
        if state.in_transaction() {
            return Err(Error::RefreshDuringTransaction);
        }
        self.refresh_locked(&mut state)
    }

    /// Shared by `refresh()`, commit, and the watcher thread, all of which
    /// already hold the lock when they decide to apply a change.
    pub(crate) fn refresh_locked(self: &Arc<Self>, state: &mut EngineState) -> Result<Node> {
        let (version, blob) = self.backend.read()?.ok_or(Error::EmptyCell)?;
        let graph = self.codec.decode(&blob)?;
        if let Some(old_root) = state.root.take() {
            link::detach_subtree(&mut state.arena, old_root);
        }
        let new_root = link::build_node(&mut state.arena, graph)?;
        state.root = Some(new_root);
        state.cached_version = Some(version);
        state.pending_refresh = false;
        tracing::debug!(version = %version, "refreshed root from backend");
        Ok(wrappers::make_node(self, &state.arena, new_root))
    }

    /// Outside any transaction: unconditional write, updating the cache in
    /// place. Inside a transaction: replaces the root in buffered state
    /// (spec §4.6).
    pub fn write(self: &Arc<Self>, value: NodeData) -> Result<()> {
        let mut state = self.state.lock();
        if state.in_transaction() {
            if let Some(old) = state.root.take() {
                state.detach(old);
            }
            let new_root = link::build_node(&mut state.arena, value)?;
            state.root = Some(new_root);
            state.mark_dirty(new_root)?;
            return Ok(());
        }
        let blob = self.codec.encode(&value)?;
        let version = self.backend.write(blob)?;
        if let Some(old) = state.root.take() {
            state.detach(old);
        }
        let new_root = link::build_node(&mut state.arena, value)?;
        state.root = Some(new_root);
        state.cached_version = Some(version);
        Ok(())
    }

    /// Unconditional CAS bypassing the transaction machinery; an escape
    /// hatch per spec §4.6.
    pub fn try_write(self: &Arc<Self>, value: NodeData, expected: Option<Version>) -> Result<bool> {
        let blob = self.codec.encode(&value)?;
        let ok = self.backend.try_write(blob, expected)?;
        if ok {
            let mut state = self.state.lock();
            if let Some(old) = state.root.take() {
                state.detach(old);
            }
            let new_root = link::build_node(&mut state.arena, value)?;
            state.root = Some(new_root);
            if let Some((v, _)) = self.backend.read()? {
                state.cached_version = Some(v);
            }
        }
        Ok(ok)
    }

    /// An unwrapped deep copy of the current cached tree; mutations on the
    /// result never affect distributed state (spec §4.6).
    pub fn snapshot(&self) -> Result<NodeData> {
        let state = self.state.lock();
        let root = state.root.ok_or(Error::EmptyCell)?;
        Ok(link::snapshot_node(&state.arena, root))
    }

    /// Runs `f` inside a transaction scope, committing on `Ok` and rolling
    /// back on `Err` (spec §4.5/§4.6). Nesting is just calling this again
    /// from within an already-open transaction's closure.
    pub fn transaction<T>(self: &Arc<Self>, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let outermost = self.begin_transaction()?;
        let txn = Transaction::new(Arc::clone(self));
        match f(&txn) {
            Ok(value) => {
                let mut state = self.state.lock();
                if outermost {
                    self.commit_outermost(&mut state)?;
                } else {
                    state.frames.pop();
                }
                Ok(value)
            }
            Err(err) => {
                let mut state = self.state.lock();
                if outermost {
                    self.rollback_outermost(&mut state);
                } else {
                    Self::rollback_nested(&mut state);
                }
                Err(err)
            }
        }
    }

    /// Opens a transaction frame, returning whether it is the outermost one.
    /// Opening the outermost frame with no cached root (a Manager that has
    /// never read, or one whose cache a prior refresh failure left empty)
    /// refreshes from the backend first, so `txn.root()` inside the closure
    /// sees real data instead of a spurious [`Error::EmptyCell`]. A backend
    /// that is genuinely empty still surfaces that error here, before `f`
    /// ever runs and before any frame is pushed.
    fn begin_transaction(self: &Arc<Self>) -> Result<bool> {
        let mut state = self.state.lock();
        let outermost = !state.in_transaction();
        if outermost {
            if state.root.is_none() {
                self.refresh_locked(&mut state)?;
            }
            state.baseline = state.cached_version;
            tracing::debug!(baseline = ?state.baseline, "opened outermost transaction");
        } else {
            tracing::debug!(depth = state.frames.len() + 1, "opened nested transaction");
        }
        state.frames.push(Frame::default());
        Ok(outermost)
    }

    fn commit_outermost(self: &Arc<Self>, state: &mut EngineState) -> Result<()> {
        state.frames.pop();
        let baseline = state.baseline.take();
        // `root` can only be absent here if `f` ran to completion without
        // ever establishing one, which the refresh in `begin_transaction`
        // rules out for a non-empty backend; treat it as nothing to commit
        // rather than panicking on a state that an adversarial or future
        // caller could still reach.
        let Some(root) = state.root else {
            return Ok(());
        };
        let root_dirty = state
            .arena
            .get(root)
            .map(|n| n.dirty)
            .unwrap_or(false);
        if !root_dirty {
            if state.pending_refresh {
                self.refresh_locked(state)?;
            }
            return Ok(());
        }
        let blob = self.codec.encode(&link::snapshot_node(&state.arena, root))?;
        if self.backend.try_write(blob, baseline)? {
            tracing::info!("transaction committed");
            self.refresh_locked(state)?;
            Ok(())
        } else {
            tracing::warn!("transaction conflict at commit");
            if let Err(e) = self.refresh_locked(state) {
                tracing::warn!(error = %e, "refresh after conflicting commit failed");
            }
            Err(Error::TransactionConflict)
        }
    }

    fn rollback_outermost(self: &Arc<Self>, state: &mut EngineState) {
        state.frames.pop();
        state.baseline = None;
        if let Err(e) = self.refresh_locked(state) {
            tracing::warn!(error = %e, "refresh after rolled-back transaction failed");
        }
    }

    fn rollback_nested(state: &mut EngineState) {
        if let Some(frame) = state.frames.pop() {
            for handle in frame.dirty_touched {
                if let Some(node) = state.arena.get_mut(handle) {
                    node.dirty = false;
                }
            }
        }
    }

    /// True iff `handle` is reachable from the current root.
    pub fn is_linked(&self, handle: Handle) -> bool {
        let state = self.state.lock();
        state.arena.get(handle).map(|n| !n.detached).unwrap_or(false)
    }

    /// True iff `handle` has pending uncommitted mutations.
    pub fn is_dirty(&self, handle: Handle) -> bool {
        let state = self.state.lock();
        state.arena.get(handle).map(|n| n.dirty).unwrap_or(false)
    }

    /// Cooperatively stop the watcher thread and join it.
    pub fn shutdown(&self) {
        self.backend.shutdown();
        if let Some(handle) = self.watcher.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.backend.shutdown();
        if let Some(handle) = self.watcher.get_mut().take() {
            let _ = handle.join();
        }
    }
}
