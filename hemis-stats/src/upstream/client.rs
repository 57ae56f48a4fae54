//! reqwest-backed HEMIS client
//!
//! Bearer-token auth, a per-request timeout and optional client-side pacing so a
//! burst of count queries does not trip the upstream rate limit on its own.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use hemis_common::config::UpstreamConfig;
use reqwest::StatusCode;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;

use super::{HemisApi, UpstreamError};

const USER_AGENT: &str = concat!("hemis-stats/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HEMIS REST API client
pub struct HemisClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl HemisClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let rate_limiter = NonZeroU32::new(config.requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HemisApi for HemisClient {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, UpstreamError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = format!("{}{}", self.base_url, endpoint);
        tracing::trace!(url = %url, ?params, "HEMIS request");

        let mut request = self.http_client.get(&url).query(params);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Transport(e.to_string())
            }
        })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status(status.as_u16(), error_text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
