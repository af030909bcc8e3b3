//! # syncell
//!
//! Ordinary in-memory containers — mappings, sequences, sets, byte buffers,
//! and user-defined records — whose mutations are transparently replicated,
//! with strong atomicity and optimistic concurrency, across independent
//! participants sharing a pluggable storage medium.
//!
//! A participant reads a typed value, manipulates it with the usual
//! container operations inside a transaction, and at commit either observes
//! its changes land atomically for every other participant, or observes a
//! conflict and retries.
//!
//! # Quick start
//!
//! ```no_run
//! use syncell::{Manager, MsgpackCodec, InMemoryBackend, NodeData, Node, Value};
//!
//! fn main() -> syncell::Result<()> {
//!     let manager = Manager::new(InMemoryBackend::new(), MsgpackCodec);
//!     manager.write(NodeData::Map(vec![(Value::Str("count".into()), NodeData::Leaf(Value::Int(0)))]))?;
//!
//!     manager.transaction(|txn| {
//!         if let Node::Mapping(root) = txn.root()? {
//!             root.set(Value::Str("count".into()), Value::Int(1))?;
//!         }
//!         Ok(())
//!     })?;
//!
//!     assert_eq!(
//!         manager.snapshot()?,
//!         NodeData::Map(vec![(Value::Str("count".into()), NodeData::Leaf(Value::Int(1)))]),
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency under contention
//!
//! Wrap a transaction in [`retry`] to absorb [`Error::TransactionConflict`]
//! from a competing participant's commit:
//!
//! ```no_run
//! use syncell::{Manager, MsgpackCodec, InMemoryBackend, RetryPolicy, Node, Item, Value, retry};
//!
//! # fn main() -> syncell::Result<()> {
//! let manager = Manager::new(InMemoryBackend::new(), MsgpackCodec);
//! # manager.write(syncell::NodeData::empty_map())?;
//! let policy = RetryPolicy::default().with_max_attempts(10);
//! retry(&manager, policy, |txn| {
//!     if let Node::Mapping(root) = txn.root()? {
//!         let n = match root.get(&Value::Str("n".into())) {
//!             Some(Item::Leaf(Value::Int(n))) => n,
//!             _ => 0,
//!         };
//!         root.set(Value::Str("n".into()), Value::Int(n + 1))?;
//!     }
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! | Crate | Responsibility |
//! |---|---|
//! | [`syncell_core`] | Shared `Value`, `Version`, and `Error` types |
//! | [`syncell_backend`] | The `Backend` contract and in-memory/file reference implementations |
//! | [`syncell_codec`] | Opaque value-graph encode/decode (`NodeData` + `Codec`) |
//! | [`syncell_engine`] | The arena, link graph, wrapper types, Manager, transactions, watcher, retry |
//!
//! Only this crate's re-exported surface is public API; the split between
//! the crates above is an implementation detail, not something calling code
//! should depend on.

pub use syncell_backend::{Backend, FileBackend, InMemoryBackend};
pub use syncell_codec::{Codec, MsgpackCodec, NodeData};
pub use syncell_core::{Error, Result, Value, Version};
pub use syncell_engine::{
    retry, Assignable, ByteBuffer, Handle, Item, Manager, ManagerConfig, Mapping, Node, Record,
    RetryPolicy, Sequence, SetView, Transaction,
};
