//! Integration tests for per-user advisory lock contention
//!
//! These tests verify that:
//! 1. Two concurrent acquirers of one uid never both succeed
//! 2. Contention is detected and reported as `AlreadyLocked`, fail-fast
//! 3. Locks are reusable after release
//! 4. Distinct uids do not contend

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;
use uuid::Uuid;

use nanobank::error::LockError;
use nanobank::lock::EntityLock;
use nanobank::retry::RetryPolicy;
use nanobank::store::MemoryStore;

fn test_lock(store: &Arc<MemoryStore>) -> EntityLock<MemoryStore> {
    nanobank::telemetry::init();
    EntityLock::new(
        Arc::clone(store),
        RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(10), 3),
    )
}

#[tokio::test]
async fn concurrent_acquire_has_exactly_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let lock = test_lock(&store);
    let uid = Uuid::new_v4().to_string();
    lock.ensure_exists(&uid).await.expect("ensure_exists failed");

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let lock = lock.clone();
        let uid = uid.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            lock.try_acquire(&uid).await
        }));
    }

    let mut successes = 0;
    let mut contended = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(()) => successes += 1,
            Err(LockError::AlreadyLocked(contended_uid)) => {
                assert_eq!(contended_uid, uid);
                contended += 1;
            }
            Err(other) => panic!("unexpected lock error: {other}"),
        }
    }

    assert_eq!(successes, 1, "exactly one acquirer must win");
    assert_eq!(contended, 1, "the loser must see AlreadyLocked");
    assert!(store.is_locked(&uid));
}

#[tokio::test]
async fn lock_is_reusable_across_acquire_release_cycles() {
    let store = Arc::new(MemoryStore::new());
    let lock = test_lock(&store);
    let uid = Uuid::new_v4().to_string();

    for _ in 0..3 {
        lock.try_acquire(&uid).await.expect("acquire failed");
        assert!(store.is_locked(&uid));
        lock.release(&uid).await.expect("release failed");
        assert!(!store.is_locked(&uid));
    }
}

#[tokio::test]
async fn distinct_uids_do_not_contend() {
    let store = Arc::new(MemoryStore::new());
    let lock = test_lock(&store);

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = Vec::new();
    for i in 0..4 {
        let lock = lock.clone();
        let barrier = Arc::clone(&barrier);
        let uid = format!("user-{i}");
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            lock.try_acquire(&uid).await
        }));
    }

    for handle in handles {
        handle
            .await
            .expect("task panicked")
            .expect("independent uids must all acquire");
    }
}

#[tokio::test]
async fn acquire_survives_transient_faults_within_budget() {
    let store = Arc::new(MemoryStore::new());
    let lock = test_lock(&store);
    let uid = Uuid::new_v4().to_string();

    store.fail_next_ops(2);
    lock.try_acquire(&uid).await.expect("retry should absorb 2 faults");
    assert!(store.is_locked(&uid));
}

#[tokio::test]
async fn acquire_surfaces_transient_fault_when_budget_exhausted() {
    let store = Arc::new(MemoryStore::new());
    let lock = test_lock(&store);
    let uid = Uuid::new_v4().to_string();

    // Policy allows 3 attempts; 3 faults exhaust it.
    store.fail_next_ops(3);
    let err = lock.try_acquire(&uid).await.unwrap_err();
    assert!(matches!(err, LockError::Store(_)));
    assert!(!store.is_locked(&uid));
}
