//! The reference codec: MessagePack via `rmp-serde`, matching the wire
//! format the rest of this corpus uses for committed payloads.

use crate::{Codec, NodeData};
use syncell_core::{Error, Result};

/// A [`Codec`] backed by `rmp-serde`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgpackCodec;

impl Codec for MsgpackCodec {
    fn encode(&self, graph: &NodeData) -> Result<Vec<u8>> {
        rmp_serde::to_vec(graph).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<NodeData> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncell_core::Value;

    fn sample() -> NodeData {
        NodeData::Map(vec![
            (Value::Str("count".into()), NodeData::Leaf(Value::Int(1))),
            (
                Value::Str("items".into()),
                NodeData::Seq(vec![
                    NodeData::Leaf(Value::Str("a".into())),
                    NodeData::Bytes(vec![1, 2, 3]),
                    NodeData::Record {
                        type_tag: "point".into(),
                        fields: vec![
                            ("x".into(), NodeData::Leaf(Value::float(1.5))),
                            ("y".into(), NodeData::Leaf(Value::float(-2.0))),
                        ],
                    },
                ]),
            ),
            (
                Value::Str("tags".into()),
                NodeData::Set(vec![Value::Int(1), Value::Int(2)]),
            ),
        ])
    }

    #[test]
    fn round_trips_every_variant() {
        let codec = MsgpackCodec;
        let graph = sample();
        let bytes = codec.encode(&graph).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(graph, decoded);
    }

    #[test]
    fn round_trips_empty_containers() {
        let codec = MsgpackCodec;
        for graph in [
            NodeData::empty_seq(),
            NodeData::empty_map(),
            NodeData::Set(vec![]),
            NodeData::Bytes(vec![]),
        ] {
            let bytes = codec.encode(&graph).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), graph);
        }
    }

    #[test]
    fn decode_reports_codec_error_not_panic() {
        let codec = MsgpackCodec;
        let err = codec.decode(&[0xff, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
