//! Property: `decode(encode(g)) == g` for any value graph the engine can
//! produce (spec §8 round-trip laws).

use proptest::prelude::*;
use syncell_codec::{Codec, MsgpackCodec, NodeData};
use syncell_core::Value;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1e6f64..1e6f64).prop_map(Value::float),
        "[a-z]{0,8}".prop_map(Value::Str),
    ]
}

fn arb_graph() -> impl Strategy<Value = NodeData> {
    let leaf = arb_value().prop_map(NodeData::Leaf);
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(NodeData::Seq),
            prop::collection::vec((arb_value(), inner.clone()), 0..6).prop_map(NodeData::Map),
            prop::collection::vec(arb_value(), 0..6).prop_map(NodeData::Set),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(NodeData::Bytes),
            ("[a-z]{1,8}", prop::collection::vec(("[a-z]{1,6}", inner), 0..4)).prop_map(
                |(type_tag, fields)| NodeData::Record { type_tag, fields }
            ),
        ]
    })
}

proptest! {
    #[test]
    fn decode_of_encode_is_identity(graph in arb_graph()) {
        let codec = MsgpackCodec;
        let bytes = codec.encode(&graph).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        prop_assert_eq!(graph, decoded);
    }
}
