//! Black-box checks of the trace invariants a conforming engine must hold
//! under arbitrary operation sequences: linked/detached consistency, clean
//! trees after commit, recovery after a lost CAS race, and exactly-once CAS
//! per outermost transaction.

use syncell_backend::{Backend, InMemoryBackend};
use syncell_codec::{Codec, MsgpackCodec, NodeData};
use syncell_core::{Error, Value};
use syncell_engine::{Item, Manager, ManagerConfig, Node};

fn no_watcher() -> ManagerConfig {
    ManagerConfig::default().with_watcher_enabled(false)
}

fn seed(backend: &InMemoryBackend, graph: NodeData) {
    let codec = MsgpackCodec;
    backend.write(codec.encode(&graph).unwrap()).unwrap();
}

#[test]
fn linked_wrapper_reports_linked_and_clean_before_any_mutation() {
    let backend = InMemoryBackend::new();
    seed(
        &backend,
        NodeData::Map(vec![(Value::Str("x".into()), NodeData::Leaf(Value::Int(10)))]),
    );
    let manager = Manager::with_config(backend, MsgpackCodec, no_watcher());

    let root = manager.read().unwrap();
    let mapping = match root {
        Node::Mapping(m) => m,
        _ => panic!("expected a mapping root"),
    };
    assert!(mapping.is_linked());
    assert!(!mapping.is_dirty());
}

#[test]
fn detached_subtree_rejects_further_mutation_and_marks_all_descendants() {
    let backend = InMemoryBackend::new();
    seed(
        &backend,
        NodeData::Map(vec![(
            Value::Str("list".into()),
            NodeData::Seq(vec![
                NodeData::Leaf(Value::Int(1)),
                NodeData::Leaf(Value::Int(2)),
                NodeData::Leaf(Value::Int(3)),
            ]),
        )]),
    );
    let manager = Manager::with_config(backend, MsgpackCodec, no_watcher());

    let root = manager.read().unwrap();
    let mapping = match root {
        Node::Mapping(m) => m,
        _ => panic!("expected a mapping root"),
    };
    let list = match mapping.get(&Value::Str("list".into())) {
        Some(Item::Node(Node::Sequence(s))) => s,
        _ => panic!("expected a sequence child"),
    };
    assert!(list.is_linked());

    manager
        .transaction(|txn| {
            if let Node::Mapping(root) = txn.root()? {
                root.delete(&Value::Str("list".into()))?;
            }
            Ok(())
        })
        .unwrap();

    assert!(!list.is_linked());
    let err = list.append(Value::Int(4)).unwrap_err();
    assert!(matches!(err, Error::DetachedMutation));
}

#[test]
fn successful_commit_leaves_no_dirty_wrapper_in_the_live_tree() {
    let backend = InMemoryBackend::new();
    seed(&backend, NodeData::empty_map());
    let manager = Manager::with_config(backend, MsgpackCodec, no_watcher());

    manager
        .transaction(|txn| {
            if let Node::Mapping(root) = txn.root()? {
                root.set(Value::Str("a".into()), Value::Int(1))?;
            }
            Ok(())
        })
        .unwrap();

    let root = manager.read().unwrap();
    let mapping = match root {
        Node::Mapping(m) => m,
        _ => panic!("expected a mapping root"),
    };
    assert!(!mapping.is_dirty());
}

#[test]
fn lost_commit_race_is_recovered_by_the_next_refresh() {
    let backend = InMemoryBackend::new();
    seed(
        &backend,
        NodeData::Map(vec![(Value::Str("x".into()), NodeData::Leaf(Value::Int(10)))]),
    );
    let manager = Manager::with_config(backend.clone(), MsgpackCodec, no_watcher());
    manager.read().unwrap();

    let rival_codec = MsgpackCodec;
    let rival_blob = rival_codec
        .encode(&NodeData::Map(vec![(
            Value::Str("x".into()),
            NodeData::Leaf(Value::Int(11)),
        )]))
        .unwrap();
    backend.write(rival_blob).unwrap();

    let err = manager
        .transaction(|txn| {
            if let Node::Mapping(root) = txn.root()? {
                root.set(Value::Str("x".into()), Value::Int(99))?;
            }
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, Error::TransactionConflict));

    assert_eq!(
        manager.snapshot().unwrap(),
        NodeData::Map(vec![(Value::Str("x".into()), NodeData::Leaf(Value::Int(11)))]),
    );
}

#[test]
fn nested_transactions_cause_exactly_one_commit() {
    let backend = InMemoryBackend::new();
    seed(&backend, NodeData::empty_map());
    let version_before = backend.read().unwrap().unwrap().0;
    let manager = Manager::with_config(backend.clone(), MsgpackCodec, no_watcher());

    manager
        .transaction(|outer| {
            if let Node::Mapping(root) = outer.root()? {
                root.set(Value::Str("a".into()), Value::Int(1))?;
            }
            manager.transaction(|_inner| {
                if let Node::Mapping(root) = outer.root()? {
                    root.set(Value::Str("b".into()), Value::Int(2))?;
                }
                Ok(())
            })?;
            if let Node::Mapping(root) = outer.root()? {
                root.set(Value::Str("c".into()), Value::Int(3))?;
            }
            Ok(())
        })
        .unwrap();

    let version_after = backend.read().unwrap().unwrap().0;
    assert_eq!(
        version_after.into_raw() - version_before.into_raw(),
        1,
        "exactly one CAS should have reached the backend"
    );

    let mut snapshot = match manager.snapshot().unwrap() {
        NodeData::Map(pairs) => pairs,
        _ => panic!("expected a mapping"),
    };
    snapshot.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        snapshot,
        vec![
            (Value::Str("a".into()), NodeData::Leaf(Value::Int(1))),
            (Value::Str("b".into()), NodeData::Leaf(Value::Int(2))),
            (Value::Str("c".into()), NodeData::Leaf(Value::Int(3))),
        ]
    );
}
