//! Environment-driven configuration.
//!
//! Credentials come from the environment (they live in the deployment's
//! secret store, never in code); the base URL and verification level are
//! overridable for sandbox vs. production dashboards.

use std::env;
use std::time::Duration;

/// Sumsub sandbox/production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.sumsub.com";

/// Verification level configured in the Sumsub dashboard.
pub const DEFAULT_LEVEL_NAME: &str = "basic-kyc-level";

/// Per-request timeout, matching the service's historical setting.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything the Sumsub client needs to sign and send requests.
#[derive(Debug, Clone)]
pub struct SumsubConfig {
    pub base_url: String,
    pub app_token: String,
    pub secret_key: String,
    pub level_name: String,
    pub request_timeout: Duration,
}

impl SumsubConfig {
    /// Read configuration from the environment. Fails with the name of the
    /// first missing required variable.
    ///
    /// Required: `SUMSUB_APP_TOKEN`, `SUMSUB_SECRET_KEY`.
    /// Optional: `SUMSUB_BASE_URL`, `SUMSUB_LEVEL_NAME`.
    pub fn from_env() -> Result<Self, MissingConfig> {
        Ok(Self {
            base_url: env::var("SUMSUB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            app_token: require("SUMSUB_APP_TOKEN")?,
            secret_key: require("SUMSUB_SECRET_KEY")?,
            level_name: env::var("SUMSUB_LEVEL_NAME")
                .unwrap_or_else(|_| DEFAULT_LEVEL_NAME.to_string()),
            request_timeout: REQUEST_TIMEOUT,
        })
    }
}

/// A required environment variable was unset or empty.
#[derive(Debug, thiserror::Error)]
#[error("missing required environment variable {0}")]
pub struct MissingConfig(pub &'static str);

fn require(name: &'static str) -> Result<String, MissingConfig> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(MissingConfig(name)),
    }
}
