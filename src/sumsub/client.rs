//! Sumsub API client
//!
//! Signed HTTP client for the Sumsub REST API. Every request carries the
//! app-token headers and an HMAC-SHA256 signature over
//! `ts + METHOD + path_with_query + body`, per the Sumsub signing scheme.

use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::{AccessTokenResponse, CreateApplicantRequest, CreateApplicantResponse};
use super::{ApplicantStatus, IdentityProvider};
use crate::config::SumsubConfig;
use crate::error::ProviderError;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 over `ts + METHOD + path_with_query + body`.
///
/// The path must include the encoded query string: the server reconstructs
/// the same byte sequence on its side.
fn sign(secret: &str, ts: u64, method: &str, path_and_query: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(ts.to_string().as_bytes());
    mac.update(method.as_bytes());
    mac.update(path_and_query.as_bytes());
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub struct SumsubClient {
    client: Client,
    config: SumsubConfig,
}

impl SumsubClient {
    pub fn new(config: SumsubConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    /// The verification level this deployment onboards users at.
    pub fn level_name(&self) -> &str {
        &self.config.level_name
    }

    /// Send a signed request and decode the 2xx JSON body. Non-2xx becomes
    /// `ProviderError::Api` with the body captured for logging.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<String>,
    ) -> Result<T, ProviderError> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let body_bytes = body.as_deref().unwrap_or("").as_bytes().to_vec();
        let signature = sign(
            &self.config.secret_key,
            ts,
            method.as_str(),
            path_and_query,
            &body_bytes,
        );

        let url = format!("{}{}", self.config.base_url, path_and_query);
        let mut request = self
            .client
            .request(method, &url)
            .header("X-App-Token", &self.config.app_token)
            .header("X-App-Access-Ts", ts.to_string())
            .header("X-App-Access-Sig", signature);
        if body.is_some() {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body_bytes);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "sumsub request failed");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            ProviderError::MalformedResponse(format!("{url}: {e}"))
        })
    }

    /// Generate an SDK access token bound to `uid`, for the frontend
    /// verification widget. `ttl_in_secs` defaults to 600 server-side.
    pub async fn generate_access_token(
        &self,
        uid: &str,
        ttl_in_secs: Option<u32>,
    ) -> Result<String, ProviderError> {
        let mut path = format!(
            "/resources/accessTokens?userId={}&levelName={}",
            uid, self.config.level_name
        );
        if let Some(ttl) = ttl_in_secs {
            path.push_str(&format!("&ttlInSecs={ttl}"));
        }
        let response: AccessTokenResponse =
            self.request_json(Method::POST, &path, None).await?;
        Ok(response.token)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SumsubClient {
    async fn create_applicant(
        &self,
        external_user_id: &str,
        level_name: &str,
    ) -> Result<String, ProviderError> {
        let path = format!("/resources/applicants?levelName={level_name}");
        let body = serde_json::to_string(&CreateApplicantRequest {
            external_user_id: external_user_id.to_string(),
        })
        .map_err(|e| ProviderError::MalformedResponse(format!("request encoding: {e}")))?;

        let response: CreateApplicantResponse =
            self.request_json(Method::POST, &path, Some(body)).await?;
        tracing::info!(
            external_user_id,
            applicant_id = %response.id,
            "created sumsub applicant"
        );
        Ok(response.id)
    }

    async fn get_applicant_status(
        &self,
        applicant_id: &str,
    ) -> Result<ApplicantStatus, ProviderError> {
        let path = format!("/resources/applicants/{applicant_id}/status");
        let status: ApplicantStatus = self.request_json(Method::GET, &path, None).await?;
        tracing::debug!(
            applicant_id,
            review_status = %status.review_status,
            "fetched applicant status"
        );
        Ok(status)
    }
}
