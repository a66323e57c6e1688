//! Per-user advisory lock over the document store.
//!
//! Serializes a user's onboarding workflow across all server instances.
//! The lock lives in the user's own document (`locked: bool`) and is flipped
//! only inside a store transaction, so two concurrent acquirers can never
//! both observe `locked=false`. States per uid: `UNLOCKED → LOCKED →
//! UNLOCKED`, reusable.
//!
//! Contention is fail-fast: `try_acquire` surfaces `AlreadyLocked`
//! immediately — no blocking, no retry. Only transient store failures are
//! retried, under the lock's [`RetryPolicy`].
//!
//! There is no lease or expiry: a holder that crashes without releasing
//! strands that uid's onboarding flow. Callers must drive [`release`] on
//! every exit path of the section the lock guards.
//!
//! [`release`]: EntityLock::release

use std::sync::Arc;

use crate::error::LockError;
use crate::retry::RetryPolicy;
use crate::store::{DocumentStore, TxnAbort, TxnAction, TxnOutcome, UserDocument};

/// Advisory lock handle, generic over the store backend. Cheap to clone.
pub struct EntityLock<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S> Clone for EntityLock<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retry: self.retry.clone(),
        }
    }
}

impl<S: DocumentStore> EntityLock<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Create the user's document with `locked=false` if it does not exist.
    /// Idempotent; an existing document is left untouched, whatever its
    /// current lock state.
    pub async fn ensure_exists(&self, uid: &str) -> Result<(), LockError> {
        let outcome = self
            .retry
            .run(|| {
                let uid = uid.to_string();
                let store = Arc::clone(&self.store);
                async move {
                    let key = uid.clone();
                    store
                        .run_transaction(
                            &key,
                            Box::new(move |doc| match doc {
                                Some(_) => TxnAction::ReadOnly,
                                None => {
                                    tracing::debug!(uid = %uid, "user not found, creating");
                                    TxnAction::Write(UserDocument::new(&uid))
                                }
                            }),
                        )
                        .await
                }
            })
            .await?;
        debug_assert_eq!(outcome, TxnOutcome::Committed);
        Ok(())
    }

    /// Acquire the lock for `uid` in one atomic transaction.
    ///
    /// Reads the current flag; if set, aborts with
    /// [`LockError::AlreadyLocked`] (a structural duplicate-request signal,
    /// never retried); otherwise writes `locked=true`. An absent document is
    /// created locked, covering the race with a concurrent first reference.
    pub async fn try_acquire(&self, uid: &str) -> Result<(), LockError> {
        let outcome = self
            .retry
            .run(|| {
                let uid = uid.to_string();
                let store = Arc::clone(&self.store);
                async move {
                    let key = uid.clone();
                    store
                        .run_transaction(
                            &key,
                            Box::new(move |doc| match doc {
                                Some(d) if d.locked => TxnAction::Abort(TxnAbort::AlreadyLocked),
                                Some(d) => {
                                    let mut d = d.clone();
                                    d.locked = true;
                                    TxnAction::Write(d)
                                }
                                None => {
                                    let mut d = UserDocument::new(&uid);
                                    d.locked = true;
                                    TxnAction::Write(d)
                                }
                            }),
                        )
                        .await
                }
            })
            .await?;

        match outcome {
            TxnOutcome::Committed => {
                tracing::debug!(uid, "onboarding lock acquired");
                Ok(())
            }
            TxnOutcome::Aborted(TxnAbort::AlreadyLocked) => {
                tracing::debug!(uid, "onboarding lock contended");
                Err(LockError::AlreadyLocked(uid.to_string()))
            }
        }
    }

    /// Unconditionally clear the lock flag for `uid`.
    ///
    /// Must run on every exit path of the guarded section: success, error,
    /// and cancellation alike. Transient store failures are retried; a
    /// missed release strands the uid's onboarding flow.
    pub async fn release(&self, uid: &str) -> Result<(), LockError> {
        self.retry
            .run(|| {
                let uid = uid.to_string();
                let store = Arc::clone(&self.store);
                async move {
                    store
                        .run_transaction(
                            &uid,
                            Box::new(move |doc| match doc {
                                Some(d) => {
                                    let mut d = d.clone();
                                    d.locked = false;
                                    TxnAction::Write(d)
                                }
                                // Releasing a never-created uid is a no-op.
                                None => TxnAction::ReadOnly,
                            }),
                        )
                        .await
                }
            })
            .await?;
        tracing::debug!(uid, "onboarding lock released");
        Ok(())
    }
}
