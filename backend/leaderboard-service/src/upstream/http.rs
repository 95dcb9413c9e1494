//! HTTP client for the upstream stats API

use super::{ApiLocator, Resource, StatsSource, UpstreamError};
use crate::config::UpstreamConfig;
use crate::error::LeaderboardError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

const API_KEY_HEADER: &str = "x-api-key";

/// Stats source backed by the upstream HTTP+JSON API
pub struct HttpStatsSource {
    client: Client,
    locator: ApiLocator,
}

impl HttpStatsSource {
    /// Build a client carrying the configured static headers
    pub fn new(config: &UpstreamConfig) -> Result<Self, LeaderboardError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| LeaderboardError::Client(format!("invalid user agent: {}", e)))?,
        );
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key)
                .map_err(|e| LeaderboardError::Client(format!("invalid api key: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LeaderboardError::Client(e.to_string()))?;

        Ok(Self {
            client,
            locator: config.locator.clone(),
        })
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn get(&self, resource: &Resource) -> Result<Value, UpstreamError> {
        let url = self
            .locator
            .resolve(resource)
            .map_err(|e| UpstreamError::InvalidResource(e.to_string()))?;

        debug!(url = %url, "Upstream request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited);
        }
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))
    }
}
