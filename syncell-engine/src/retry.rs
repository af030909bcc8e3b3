//! Bounded-attempt / deadline-bounded re-invocation of a user closure inside
//! a transaction (spec §4.8).

use crate::manager::Manager;
use crate::transaction::Transaction;
use std::sync::Arc;
use std::time::{Duration, Instant};
use syncell_core::{Error, Result};

/// Retry bounds for [`retry`]. `Default` retries indefinitely on conflict,
/// matching spec §4.8's "with neither bound, retries indefinitely".
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Run `f` inside a transaction, reinvoking it on `TransactionConflict`
/// until `policy`'s attempt count or deadline is exhausted. Any other error
/// propagates immediately without retrying.
///
/// A Manager that has never read still makes progress here: opening the
/// outermost transaction on the first attempt refreshes from the backend
/// before `f` runs, so `EmptyCell` only escapes this loop when the backend
/// itself holds nothing to read, which is not a condition retrying fixes.
pub fn retry<T>(
    manager: &Arc<Manager>,
    policy: RetryPolicy,
    mut f: impl FnMut(&Transaction) -> Result<T>,
) -> Result<T> {
    let started = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match manager.transaction(|txn| f(txn)) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_conflict() => {
                if let Some(max) = policy.max_attempts {
                    if attempts >= max {
                        return Err(Error::RetryExhausted { attempts });
                    }
                }
                if let Some(deadline) = policy.deadline {
                    if started.elapsed() >= deadline {
                        return Err(Error::RetryTimeout);
                    }
                }
                tracing::debug!(attempts, "retrying after transaction conflict");
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerConfig;
    use syncell_backend::{Backend, InMemoryBackend};
    use syncell_codec::{Codec, MsgpackCodec, NodeData};
    use syncell_core::Value;

    fn seed(backend: &InMemoryBackend, graph: NodeData) {
        let codec = MsgpackCodec;
        backend.write(codec.encode(&graph).unwrap()).unwrap();
    }

    #[test]
    fn retry_exhausts_after_max_attempts_under_permanent_conflict() {
        let backend = InMemoryBackend::new();
        seed(
            &backend,
            NodeData::Map(vec![(Value::Str("n".into()), NodeData::Leaf(Value::Int(0)))]),
        );
        let manager =
            Manager::with_config(backend.clone(), MsgpackCodec, ManagerConfig::default().with_watcher_enabled(false));
        manager.read().unwrap();

        // A competing writer bumps the version on every attempt, so every
        // commit this closure makes loses the CAS race.
        let rival = backend.clone();
        let policy = RetryPolicy::default().with_max_attempts(3);
        let result: Result<()> = retry(&manager, policy, |_txn| {
            rival.write(b"\x90".to_vec()).ok();
            Err(Error::TransactionConflict)
        });
        assert!(matches!(result, Err(Error::RetryExhausted { attempts: 3 })));
    }

    #[test]
    fn non_conflict_errors_do_not_retry() {
        let backend = InMemoryBackend::new();
        seed(&backend, NodeData::empty_map());
        let manager =
            Manager::with_config(backend, MsgpackCodec, ManagerConfig::default().with_watcher_enabled(false));
        manager.read().unwrap();

        let mut calls = 0;
        let result: Result<()> = retry(&manager, RetryPolicy::default(), |_txn| {
            calls += 1;
            Err(Error::DetachedMutation)
        });
        assert!(matches!(result, Err(Error::DetachedMutation)));
        assert_eq!(calls, 1);
    }
}
