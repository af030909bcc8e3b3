//! The transactional coordination engine: the arena, parent-link
//! bookkeeping, the Manager, the closure-driven transaction scope, the
//! background watcher, and the mutation-tracking wrapper types.
//!
//! This crate has no knowledge of any particular backend or wire format —
//! it is generic over [`syncell_backend::Backend`] and
//! [`syncell_codec::Codec`] trait objects, composed in [`Manager`].

mod arena;
mod link;
mod manager;
mod retry;
mod transaction;
mod watcher;
mod wrappers;

pub use arena::Handle;
pub use manager::{Manager, ManagerConfig};
pub use retry::{retry, RetryPolicy};
pub use transaction::Transaction;
pub use wrappers::{Assignable, ByteBuffer, Item, Mapping, Node, Record, Sequence, SetView};
