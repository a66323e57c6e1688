//! Sumsub (identity verification) integration
//!
//! This module provides:
//! - API types for the applicant status surface
//! - The `IdentityProvider` trait the onboarding coordinator depends on
//! - A signed HTTP client for the Sumsub REST API
//!
//! Reference: https://developers.sumsub.com/api-reference/

pub mod client;
pub mod types;

pub use client::SumsubClient;
pub use types::{ApplicantStatus, ReviewResult};

use async_trait::async_trait;

use crate::error::ProviderError;

/// The provider operations the onboarding flow needs.
///
/// `create_applicant` is **not idempotent**: the provider allocates a new
/// applicant per call and documents no idempotency key. Callers must never
/// wrap it in a retry policy; an ambiguous failure (request processed,
/// response lost) would mint a duplicate external applicant.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an applicant for `external_user_id` at the given verification
    /// level, returning the provider-assigned applicant id.
    async fn create_applicant(
        &self,
        external_user_id: &str,
        level_name: &str,
    ) -> Result<String, ProviderError>;

    /// Current verification status of an applicant. Read-only and safe to
    /// retry.
    async fn get_applicant_status(&self, applicant_id: &str)
        -> Result<ApplicantStatus, ProviderError>;
}
