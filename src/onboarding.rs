//! Onboarding coordination.
//!
//! `get_or_create_status` is the single entry point for the KYC
//! onboarding-status endpoint. It composes the per-user advisory lock, the
//! identity provider, and the retry policies into one serialized
//! get-or-create operation:
//!
//! 1. Ensure the user's document exists.
//! 2. `try_acquire` the lock; contention is rejected immediately as a
//!    duplicate request.
//! 3. Inside the critical section: create the provider applicant on first
//!    contact (never retried) and persist its id before anything else, then
//!    query the applicant's status.
//! 4. Release the lock on every exit path.
//!
//! The critical section runs on a spawned task. If the caller's request is
//! cancelled after acquisition, the section still runs to completion and the
//! lock is still released; dropping the caller's future cannot strand the
//! uid.
//!
//! Known limitation: a crash after applicant creation but before the id is
//! persisted orphans the external applicant. The provider offers no
//! idempotency key, so this window cannot be closed by retrying.

use std::sync::Arc;

use crate::error::OnboardingError;
use crate::lock::EntityLock;
use crate::retry::RetryPolicy;
use crate::store::DocumentStore;
use crate::sumsub::{ApplicantStatus, IdentityProvider};

pub struct OnboardingCoordinator<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    lock: EntityLock<S>,
    store_retry: RetryPolicy,
    provider_retry: RetryPolicy,
    level_name: String,
}

impl<S, P> Clone for OnboardingCoordinator<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            lock: self.lock.clone(),
            store_retry: self.store_retry.clone(),
            provider_retry: self.provider_retry.clone(),
            level_name: self.level_name.clone(),
        }
    }
}

impl<S, P> OnboardingCoordinator<S, P>
where
    S: DocumentStore + 'static,
    P: IdentityProvider + 'static,
{
    pub fn new(
        store: Arc<S>,
        provider: Arc<P>,
        store_retry: RetryPolicy,
        provider_retry: RetryPolicy,
        level_name: impl Into<String>,
    ) -> Self {
        let lock = EntityLock::new(Arc::clone(&store), store_retry.clone());
        Self {
            store,
            provider,
            lock,
            store_retry,
            provider_retry,
            level_name: level_name.into(),
        }
    }

    /// Get the user's current verification status, creating the provider
    /// applicant on first contact.
    ///
    /// At most one call per uid runs at a time across all server instances;
    /// a concurrent duplicate fails fast with
    /// [`OnboardingError::DuplicateRequest`]. Exactly one external applicant
    /// is ever created per uid.
    pub async fn get_or_create_status(&self, uid: &str) -> Result<ApplicantStatus, OnboardingError> {
        self.lock.ensure_exists(uid).await?;
        self.lock.try_acquire(uid).await?;

        // From here the lock is held. The guarded section and its release
        // run on their own task so cancellation of this future cannot skip
        // the release.
        let this = self.clone();
        let owned_uid = uid.to_string();
        let section = tokio::spawn(async move {
            let result = this.status_within_lock(&owned_uid).await;
            match (result, this.lock.release(&owned_uid).await) {
                (Ok(status), Ok(())) => Ok(status),
                (Ok(_), Err(release_err)) => Err(OnboardingError::from(release_err)),
                (Err(section_err), Ok(())) => Err(section_err),
                (Err(section_err), Err(release_err)) => {
                    // The section's error is the one the caller can act on;
                    // the failed release means the uid may now be stranded.
                    tracing::warn!(
                        uid = %owned_uid,
                        error = %release_err,
                        "failed to release onboarding lock after error"
                    );
                    Err(section_err)
                }
            }
        });

        section
            .await
            .map_err(|e| OnboardingError::Internal(e.to_string()))?
    }

    /// The lock-guarded body: resolve the applicant id, then query status.
    async fn status_within_lock(&self, uid: &str) -> Result<ApplicantStatus, OnboardingError> {
        let doc = self
            .store_retry
            .run(|| self.store.get(uid))
            .await?
            .ok_or_else(|| OnboardingError::Internal(format!("document for {uid} vanished")))?;

        let applicant_id = match doc.applicant_id.clone() {
            Some(id) => id,
            None => {
                // Non-idempotent: one attempt, no retry wrapper. An
                // ambiguous failure here must surface rather than risk a
                // second applicant.
                let id = self
                    .provider
                    .create_applicant(uid, &self.level_name)
                    .await?;

                // Persist before the status query. We hold the lock, so a
                // merge write of the document we just read cannot race.
                let mut updated = doc;
                updated.applicant_id = Some(id.clone());
                self.store_retry
                    .run(|| self.store.set_merge(uid, &updated))
                    .await?;
                id
            }
        };

        let status = self
            .provider_retry
            .run(|| self.provider.get_applicant_status(&applicant_id))
            .await?;
        tracing::debug!(uid, applicant_id = %applicant_id, review_status = %status.review_status, "onboarding status resolved");
        Ok(status)
    }
}
