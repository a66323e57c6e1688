//! In-memory document store.
//!
//! Backend for tests and local development. A single mutex over the document
//! map makes every [`DocumentStore::run_transaction`] trivially serializable:
//! the decision function runs to completion while the map is held, so two
//! concurrent transactions on the same uid can never both observe the same
//! pre-state and both commit.
//!
//! Transient-fault injection lets tests exercise the retry paths without a
//! real flaky network: each injected fault consumes one store operation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{DocumentStore, TxnAction, TxnFn, TxnOutcome, UserDocument};

#[derive(Default)]
struct Inner {
    docs: HashMap<String, UserDocument>,
    faults_remaining: u32,
}

/// Mutex-backed store with the same observable semantics the production
/// document database guarantees on a single document.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` store operations fail with `StoreError::Transient`.
    pub fn fail_next_ops(&self, n: u32) {
        self.inner.lock().expect("store mutex poisoned").faults_remaining = n;
    }

    fn consume_fault(inner: &mut Inner) -> Result<(), StoreError> {
        if inner.faults_remaining > 0 {
            inner.faults_remaining -= 1;
            return Err(StoreError::Transient("injected fault".to_string()));
        }
        Ok(())
    }

    /// Current lock flag, for assertions. `false` for unknown uids.
    pub fn is_locked(&self, uid: &str) -> bool {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .docs
            .get(uid)
            .map(|d| d.locked)
            .unwrap_or(false)
    }
}

/// Overlay `incoming` onto `existing`, field by field. `applicant_id` is
/// merged only when present on the incoming document (an absent optional is
/// not sent on the wire, so a merge write cannot erase it); profile fields
/// are overlaid individually.
fn merge_into(existing: &mut UserDocument, incoming: &UserDocument) {
    existing.uid = incoming.uid.clone();
    existing.locked = incoming.locked;
    if incoming.applicant_id.is_some() {
        existing.applicant_id = incoming.applicant_id.clone();
    }
    for (k, v) in &incoming.profile {
        existing.profile.insert(k.clone(), v.clone());
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, uid: &str) -> Result<Option<UserDocument>, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        Self::consume_fault(&mut inner)?;
        Ok(inner.docs.get(uid).cloned())
    }

    async fn set_merge(&self, uid: &str, doc: &UserDocument) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        Self::consume_fault(&mut inner)?;
        match inner.docs.get_mut(uid) {
            Some(existing) => merge_into(existing, doc),
            None => {
                inner.docs.insert(uid.to_string(), doc.clone());
            }
        }
        Ok(())
    }

    async fn run_transaction(&self, uid: &str, f: TxnFn) -> Result<TxnOutcome, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        Self::consume_fault(&mut inner)?;
        let action = f(inner.docs.get(uid));
        match action {
            TxnAction::Write(doc) => {
                inner.docs.insert(uid.to_string(), doc);
                Ok(TxnOutcome::Committed)
            }
            TxnAction::ReadOnly => Ok(TxnOutcome::Committed),
            TxnAction::Abort(reason) => Ok(TxnOutcome::Aborted(reason)),
        }
    }
}
