//! nanobank - onboarding and CDC core
//!
//! The two subsystems of the lending backend with real concurrency and
//! consistency requirements:
//!
//! - **CDC reduction** ([`cdc`]): loans, applications and vouches are stored
//!   as append-only version logs; [`cdc::reduce_records`] reconstructs the
//!   current snapshot of every entity from an unordered, duplicate-tolerant
//!   record set.
//! - **Serialized onboarding** ([`onboarding`]): the KYC provider's
//!   create-applicant call is not idempotent, so onboarding is serialized
//!   per user with a distributed advisory lock ([`lock`]) held in the user's
//!   own document ([`store`]) and driven by
//!   [`onboarding::OnboardingCoordinator`].
//!
//! HTTP routing, authentication, wallet management and amortization math
//! live elsewhere; this crate sees them only as trait boundaries.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nanobank::config::SumsubConfig;
//! use nanobank::onboarding::OnboardingCoordinator;
//! use nanobank::retry::RetryPolicy;
//! use nanobank::store::MemoryStore;
//! use nanobank::sumsub::SumsubClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SumsubConfig::from_env()?;
//! let level = config.level_name.clone();
//! let coordinator = OnboardingCoordinator::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SumsubClient::new(config)?),
//!     RetryPolicy::store_default(),
//!     RetryPolicy::provider_default(),
//!     level,
//! );
//! let status = coordinator.get_or_create_status("user-1").await?;
//! println!("{}", status.review_status);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// CDC record reduction for read endpoints
pub mod cdc;

// Bounded exponential backoff
pub mod retry;

// Document store boundary and backends
pub mod store;

// Per-user advisory locking
pub mod lock;

// Sumsub identity-verification integration
pub mod sumsub;

// The serialized get-or-create onboarding flow
pub mod onboarding;

// Environment configuration
pub mod config;

// Tracing setup
pub mod telemetry;

pub use cdc::{reduce_records, VersionedRecord};
pub use error::{LockError, OnboardingError, ProviderError, ReduceError, StoreError};
pub use lock::EntityLock;
pub use onboarding::OnboardingCoordinator;
pub use retry::RetryPolicy;
pub use store::{DocumentStore, MemoryStore, UserDocument};
pub use sumsub::{ApplicantStatus, IdentityProvider, SumsubClient};
