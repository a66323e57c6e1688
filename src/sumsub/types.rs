//! Sumsub API payload types
//!
//! Only the surfaces the onboarding flow touches are mapped: applicant
//! creation, applicant status, and SDK access tokens.
//!
//! Reference: https://developers.sumsub.com/api-reference/
//!
//! Date fields (`createDate`, `reviewDate`, `startDate`) arrive in Sumsub's
//! own format (`2020-06-24 05:11:02+0000`), not RFC 3339, and are carried as
//! strings rather than parsed.

use serde::{Deserialize, Serialize};

/// Applicant review status as returned by
/// `GET /resources/applicants/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantStatus {
    pub create_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// Lifecycle stage: `init`, `pending`, `prechecked`, `queued`,
    /// `completed`, `onHold`.
    pub review_status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_result: Option<ReviewResult>,
}

/// Verdict attached once a review completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// `GREEN` (approved) or `RED` (rejected).
    pub review_answer: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reject_labels: Vec<String>,

    /// `RETRY` (resubmission allowed) or `FINAL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_reject_type: Option<String>,
}

/// Body for `POST /resources/applicants?levelName={level}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateApplicantRequest {
    pub external_user_id: String,
}

/// Response to applicant creation; only the id matters here.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateApplicantResponse {
    pub id: String,
}

/// Response to `POST /resources/accessTokens`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub token: String,
}
