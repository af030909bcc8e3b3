//! Opaque encode/decode of a value graph to/from a byte blob (spec §4.2).
//!
//! The codec is deliberately the *only* place that knows the wire format;
//! the engine never inspects a blob directly. Portability and schema
//! evolution are the codec's concerns, not the Manager's.

pub mod graph;
pub mod msgpack;

pub use graph::NodeData;
pub use msgpack::MsgpackCodec;

use syncell_core::Result;

/// Lossless encode/decode of a [`NodeData`] graph.
///
/// A conforming codec need not produce byte-identical output for
/// structurally-equal inputs (the engine never depends on that); it must
/// only round-trip every supported node variant and report decode failures
/// distinctly from other I/O errors.
pub trait Codec: Send + Sync {
    /// Serialize a value graph to bytes.
    fn encode(&self, graph: &NodeData) -> Result<Vec<u8>>;

    /// Deserialize bytes produced by `encode` back into a value graph.
    fn decode(&self, bytes: &[u8]) -> Result<NodeData>;
}
