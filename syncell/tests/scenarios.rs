//! The six literal end-to-end scenarios a conforming implementation must
//! reproduce: a single-participant mutation, a detected conflict, automatic
//! retry under real concurrency, a detached-mutation error, nested
//! transactions collapsing to one commit, and watcher-driven refresh.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use syncell::{
    Backend, Codec, InMemoryBackend, Item, Manager, ManagerConfig, MsgpackCodec, Node, NodeData, Value,
};

fn no_watcher() -> ManagerConfig {
    ManagerConfig::default().with_watcher_enabled(false)
}

#[test]
fn single_participant_mapping_mutation() {
    let manager = Manager::with_config(InMemoryBackend::new(), MsgpackCodec, no_watcher());
    manager
        .write(NodeData::Map(vec![(
            Value::Str("count".into()),
            NodeData::Leaf(Value::Int(0)),
        )]))
        .unwrap();
    let version_before = manager.read().unwrap().handle();

    manager
        .transaction(|txn| {
            if let Node::Mapping(root) = txn.root()? {
                root.set(Value::Str("count".into()), Value::Int(1))?;
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(
        manager.snapshot().unwrap(),
        NodeData::Map(vec![(Value::Str("count".into()), NodeData::Leaf(Value::Int(1)))]),
    );
    // The root was rebuilt at commit, so its handle (and thus identity)
    // strictly differs from the pre-transaction read.
    assert_ne!(manager.read().unwrap().handle(), version_before);
}

#[test]
fn detected_conflict_then_refresh_observes_the_winner() {
    let backend = InMemoryBackend::new();
    backend
        .write(
            MsgpackCodec
                .encode(&NodeData::Map(vec![(
                    Value::Str("x".into()),
                    NodeData::Leaf(Value::Int(10)),
                )]))
                .unwrap(),
        )
        .unwrap();
    let a = Manager::with_config(backend.clone(), MsgpackCodec, no_watcher());
    a.read().unwrap();

    // Participant B commits concurrently, bypassing A's cache entirely.
    backend
        .write(
            MsgpackCodec
                .encode(&NodeData::Map(vec![(
                    Value::Str("x".into()),
                    NodeData::Leaf(Value::Int(11)),
                )]))
                .unwrap(),
        )
        .unwrap();

    let err = a
        .transaction(|txn| {
            if let Node::Mapping(root) = txn.root()? {
                let current = match root.get(&Value::Str("x".into())) {
                    Some(Item::Leaf(Value::Int(n))) => n,
                    _ => 0,
                };
                root.set(Value::Str("x".into()), Value::Int(current + 1))?;
            }
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, syncell::Error::TransactionConflict));

    a.refresh().unwrap();
    assert_eq!(
        a.snapshot().unwrap(),
        NodeData::Map(vec![(Value::Str("x".into()), NodeData::Leaf(Value::Int(11)))]),
    );
}

#[test]
fn automatic_retry_under_concurrency_converges_to_the_right_total() {
    let backend = InMemoryBackend::new();
    backend
        .write(
            MsgpackCodec
                .encode(&NodeData::Map(vec![(
                    Value::Str("n".into()),
                    NodeData::Leaf(Value::Int(0)),
                )]))
                .unwrap(),
        )
        .unwrap();

    let successful_commits = Arc::new(AtomicUsize::new(0));
    let threads: Vec<_> = (0..5)
        .map(|_| {
            let manager = Manager::with_config(backend.clone(), MsgpackCodec, no_watcher());
            let successful_commits = Arc::clone(&successful_commits);
            thread::spawn(move || {
                let policy = syncell::RetryPolicy::default().with_max_attempts(10);
                syncell::retry(&manager, policy, |txn| {
                    if let Node::Mapping(root) = txn.root()? {
                        let current = match root.get(&Value::Str("n".into())) {
                            Some(Item::Leaf(Value::Int(n))) => n,
                            _ => 0,
                        };
                        root.set(Value::Str("n".into()), Value::Int(current + 1))?;
                    }
                    Ok(())
                })
                .unwrap();
                successful_commits.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(successful_commits.load(Ordering::SeqCst), 5);
    let (_, blob) = backend.read().unwrap().unwrap();
    let graph = MsgpackCodec.decode(&blob).unwrap();
    assert_eq!(
        graph,
        NodeData::Map(vec![(Value::Str("n".into()), NodeData::Leaf(Value::Int(5)))]),
    );
}

#[test]
fn detached_mutation_raises_after_deletion() {
    let manager = Manager::with_config(InMemoryBackend::new(), MsgpackCodec, no_watcher());
    manager
        .write(NodeData::Map(vec![(
            Value::Str("list".into()),
            NodeData::Seq(vec![
                NodeData::Leaf(Value::Int(1)),
                NodeData::Leaf(Value::Int(2)),
                NodeData::Leaf(Value::Int(3)),
            ]),
        )]))
        .unwrap();

    let root = manager.read().unwrap();
    let list = match root {
        Node::Mapping(m) => match m.get(&Value::Str("list".into())) {
            Some(Item::Node(Node::Sequence(s))) => s,
            _ => panic!("expected a sequence"),
        },
        _ => panic!("expected a mapping"),
    };

    manager
        .transaction(|txn| {
            if let Node::Mapping(root) = txn.root()? {
                root.delete(&Value::Str("list".into()))?;
            }
            Ok(())
        })
        .unwrap();

    let err = list.append(Value::Int(4)).unwrap_err();
    assert!(matches!(err, syncell::Error::DetachedMutation));
}

#[test]
fn nested_transaction_produces_a_single_commit() {
    let manager = Manager::with_config(InMemoryBackend::new(), MsgpackCodec, no_watcher());
    manager.write(NodeData::empty_map()).unwrap();

    manager
        .transaction(|outer| {
            if let Node::Mapping(root) = outer.root()? {
                root.set(Value::Str("a".into()), Value::Int(1))?;
            }
            manager.transaction(|inner| {
                if let Node::Mapping(root) = inner.root()? {
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

    let mut pairs = match manager.snapshot().unwrap() {
        NodeData::Map(pairs) => pairs,
        _ => panic!("expected a mapping"),
    };
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        pairs,
        vec![
            (Value::Str("a".into()), NodeData::Leaf(Value::Int(1))),
            (Value::Str("b".into()), NodeData::Leaf(Value::Int(2))),
            (Value::Str("c".into()), NodeData::Leaf(Value::Int(3))),
        ]
    );
}

#[test]
fn watcher_driven_refresh_observes_a_peers_commit_without_an_explicit_refresh() {
    let backend = InMemoryBackend::new();
    backend
        .write(
            MsgpackCodec
                .encode(&NodeData::Map(vec![(
                    Value::Str("x".into()),
                    NodeData::Leaf(Value::Int(1)),
                )]))
                .unwrap(),
        )
        .unwrap();

    let config = ManagerConfig::default().with_watcher_poll_interval(Duration::from_millis(10));
    let a = Manager::with_config(backend.clone(), MsgpackCodec, config);
    a.read().unwrap();

    let b = Manager::with_config(backend, MsgpackCodec, no_watcher());
    b.write(NodeData::Map(vec![(
        Value::Str("x".into()),
        NodeData::Leaf(Value::Int(2)),
    )]))
    .unwrap();

    // Give A's watcher thread a chance to observe B's write and refresh the
    // cache on its own.
    let mut observed = None;
    for _ in 0..50 {
        thread::sleep(Duration::from_millis(20));
        let snap = a.snapshot().unwrap();
        if snap == NodeData::Map(vec![(Value::Str("x".into()), NodeData::Leaf(Value::Int(2)))]) {
            observed = Some(snap);
            break;
        }
    }
    assert!(observed.is_some(), "watcher never picked up the peer's commit");
}
