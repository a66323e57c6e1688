//! Document store boundary.
//!
//! One document per user, keyed by uid, holding the onboarding lock flag and
//! the external applicant id. The store is eventually consistent for plain
//! reads but must offer serializable isolation for the single-document
//! transactional read-modify-write — that transaction is the only correct
//! place to flip the lock flag, because multiple server instances race on it
//! and an in-process mutex cannot help.
//!
//! The production backend is an external document database; [`MemoryStore`]
//! is the in-memory backend used by tests and local development.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// The per-user document: `{uid, locked, applicant_id}` plus whatever
/// profile fields the rest of the system keeps alongside. Unknown fields are
/// preserved verbatim so this subsystem never clobbers them on write.
///
/// Invariants: at most one holder of `locked=true` per uid at any instant;
/// created lazily with `locked=false`; never deleted by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub uid: String,

    #[serde(default)]
    pub locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,

    /// Profile fields owned by other subsystems, carried through untouched.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl UserDocument {
    /// Fresh document for a first-seen uid.
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            locked: false,
            applicant_id: None,
            profile: Map::new(),
        }
    }
}

/// Decision returned by a transaction function.
pub enum TxnAction {
    /// Commit this document as the new state.
    Write(UserDocument),
    /// Commit nothing; surface a typed abort to the caller.
    Abort(TxnAbort),
    /// Commit nothing; the read alone was the point.
    ReadOnly,
}

/// Typed abort reasons. Aborts are expected control flow (the document's
/// current state ruled the write out), distinct from [`StoreError`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnAbort {
    /// The lock flag was already set.
    AlreadyLocked,
}

/// What a committed (or aborted) transaction resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOutcome {
    Committed,
    Aborted(TxnAbort),
}

/// Decision function executed inside a transaction. Synchronous by design:
/// it sees one consistent snapshot of the document and must not perform I/O.
pub type TxnFn = Box<dyn FnOnce(Option<&UserDocument>) -> TxnAction + Send>;

/// Minimal store surface this subsystem needs.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Plain read. `None` when the uid has never been seen.
    async fn get(&self, uid: &str) -> Result<Option<UserDocument>, StoreError>;

    /// Merge write: creates the document if absent, otherwise overlays the
    /// given document's fields without dropping fields it does not mention.
    async fn set_merge(&self, uid: &str, doc: &UserDocument) -> Result<(), StoreError>;

    /// Run `f` against the current document under serializable isolation on
    /// that one document, then atomically commit the returned write, if any.
    /// Two concurrent transactions on the same uid never both observe the
    /// same pre-state and both commit.
    async fn run_transaction(&self, uid: &str, f: TxnFn) -> Result<TxnOutcome, StoreError>;
}
