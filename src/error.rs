//! Error taxonomy for the onboarding core.
//!
//! Every failure mode maps to exactly one variant, and retryability is a
//! property of the variant, not of where the error was caught:
//!
//! ```text
//! StoreError::Transient       → retryable (bounded backoff)
//! StoreError::InvalidDocument → not retryable
//! LockError::AlreadyLocked    → not retryable (expected contention)
//! ProviderError::Http         → retryable iff timeout/connect
//! ProviderError::Api          → retryable iff 5xx
//! ReduceError::*              → never retryable (caller bug or bad data)
//! ```
//!
//! `thiserror` for enum derivation — no manual `Display` impls.

use thiserror::Error;

/// Retryability predicate consumed by [`crate::retry::RetryPolicy`].
///
/// Implemented on error types, not on operations: an operation is wrapped in
/// the policy only at call sites verified idempotent, and the policy then
/// asks the error itself whether another attempt could help.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

// ---------------------------------------------------------------------------
// StoreError — document store failures
// ---------------------------------------------------------------------------

/// Failures from the document store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Infrastructure hiccup (connection reset, contention abort, timeout).
    /// Safe to retry: store writes in this crate are conditional
    /// read-modify-writes, so a repeated attempt re-reads current state.
    #[error("transient document store failure: {0}")]
    Transient(String),

    /// The stored document does not decode into the expected shape.
    #[error("invalid document for user {uid}: {reason}")]
    InvalidDocument { uid: String, reason: String },
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

// ---------------------------------------------------------------------------
// LockError — advisory lock outcomes
// ---------------------------------------------------------------------------

/// Failures from [`crate::lock::EntityLock`].
#[derive(Debug, Error)]
pub enum LockError {
    /// Another onboarding call holds the lock for this uid. This is a
    /// structural signal of a legitimate duplicate request, not a fault —
    /// it is surfaced immediately and never retried.
    #[error("onboarding already in progress for user {0}")]
    AlreadyLocked(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Retryable for LockError {
    fn is_transient(&self) -> bool {
        match self {
            LockError::AlreadyLocked(_) => false,
            LockError::Store(e) => e.is_transient(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderError — identity-verification API failures
// ---------------------------------------------------------------------------

/// Failures from the external identity-verification provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status. The body is kept
    /// for logging; it is never parsed for control flow.
    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// A 2xx response that does not carry the field we need.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl Retryable for ProviderError {
    fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(e) => e.is_timeout() || e.is_connect(),
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::MalformedResponse(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ReduceError — CDC reduction failures
// ---------------------------------------------------------------------------

/// Failures from [`crate::cdc::reduce_records`]. Reduction fails loudly
/// rather than guessing an ordering; no partial output is ever returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReduceError {
    /// A `created` value could not be normalized to a timestamp.
    #[error("cannot order records: field '{field}' has non-timestamp value {found}")]
    TypeMismatch { field: String, found: String },

    /// A record is missing the group-key field or `created`.
    #[error("record is missing required field '{field}'")]
    MissingField { field: String },
}

// ---------------------------------------------------------------------------
// OnboardingError — coordinator-level outcomes
// ---------------------------------------------------------------------------

/// Failures surfaced by [`crate::onboarding::OnboardingCoordinator`].
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// A concurrent onboarding request for the same uid is in flight.
    /// Rejected immediately and cheaply — never queued or merged.
    #[error("duplicate onboarding request for user {0}")]
    DuplicateRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The critical-section task failed to complete (panic or runtime
    /// shutdown). The lock state for the uid is unknown at this point.
    #[error("onboarding critical section aborted: {0}")]
    Internal(String),
}

impl From<LockError> for OnboardingError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::AlreadyLocked(uid) => OnboardingError::DuplicateRequest(uid),
            LockError::Store(e) => OnboardingError::Store(e),
        }
    }
}
