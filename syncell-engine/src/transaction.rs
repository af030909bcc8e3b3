//! The scoped transaction handle passed into a [`Manager::transaction`]
//! closure (spec §4.5, §4.6).

use crate::link;
use crate::manager::Manager;
use crate::wrappers::{self, Node};
use std::sync::Arc;
use syncell_codec::NodeData;
use syncell_core::{Error, Result};

/// A handle to the transaction scope currently open on a [`Manager`].
///
/// There is deliberately no `commit`/`rollback` method here: the closure
/// passed to [`Manager::transaction`] commits by returning `Ok` and rolls
/// back by returning `Err`, mirroring how this corpus's own transactional
/// primitives are driven by a closure's result rather than an explicit call.
pub struct Transaction {
    manager: Arc<Manager>,
}

impl Transaction {
    pub(crate) fn new(manager: Arc<Manager>) -> Self {
        Transaction { manager }
    }

    /// The root wrapper as of this transaction's pinned baseline.
    pub fn root(&self) -> Result<Node> {
        let state = self.manager.state.lock();
        let root = state.root.ok_or(Error::EmptyCell)?;
        Ok(wrappers::make_node(&self.manager, &state.arena, root))
    }

    /// Replace the whole root within the buffered transaction state.
    pub fn write(&self, value: NodeData) -> Result<()> {
        let mut state = self.manager.state.lock();
        if let Some(old) = state.root.take() {
            state.detach(old);
        }
        let new_root = link::build_node(&mut state.arena, value)?;
        state.root = Some(new_root);
        state.mark_dirty(new_root)?;
        Ok(())
    }
}
