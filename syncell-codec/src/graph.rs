//! The plain, unwrapped value graph that a [`Codec`](crate::Codec) moves to
//! and from a byte blob.
//!
//! `NodeData` is what `Manager::snapshot` hands back to callers and what the
//! live wrapper arena decodes into and re-encodes from. It carries no
//! mutation-tracking state of its own.

use serde::{Deserialize, Serialize};
use syncell_core::Value;

/// One node of a value graph, fully materialized (no handles, no dirty
/// flags — see spec §3's five node variants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    /// An immutable leaf scalar.
    Leaf(Value),
    /// An ordered list of child nodes.
    Seq(Vec<NodeData>),
    /// An unordered key → child-node mapping. Stored as a `Vec` of pairs
    /// rather than a `HashMap` because `NodeData` itself is not `Hash` (a
    /// `Seq`/`Map`/`Set` value could appear as a map value but never as a
    /// key — only `Value` is hashable).
    Map(Vec<(Value, NodeData)>),
    /// An unordered collection of hashable leaf values.
    Set(Vec<Value>),
    /// A mutable byte buffer.
    Bytes(Vec<u8>),
    /// A named-field container.
    Record {
        /// User-chosen tag identifying the record's "type".
        type_tag: String,
        /// Ordered field table; order is preserved but not semantically
        /// significant.
        fields: Vec<(String, NodeData)>,
    },
}

impl NodeData {
    /// Convenience constructor for an empty sequence.
    pub fn empty_seq() -> Self {
        NodeData::Seq(Vec::new())
    }

    /// Convenience constructor for an empty mapping.
    pub fn empty_map() -> Self {
        NodeData::Map(Vec::new())
    }

    /// Returns a human-readable name of the node's variant, for error
    /// messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeData::Leaf(_) => "leaf",
            NodeData::Seq(_) => "sequence",
            NodeData::Map(_) => "mapping",
            NodeData::Set(_) => "set",
            NodeData::Bytes(_) => "bytes",
            NodeData::Record { .. } => "record",
        }
    }
}

impl From<Value> for NodeData {
    fn from(v: Value) -> Self {
        NodeData::Leaf(v)
    }
}
