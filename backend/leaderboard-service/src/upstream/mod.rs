//! Upstream stats service access
//!
//! Everything that knows the upstream's wire shape lives here: the resource
//! locator, the HTTP source and the payload normalizer.

pub mod http;
pub mod locator;
pub mod normalize;

pub use http::HttpStatsSource;
pub use locator::{ApiLocator, LocatorError};
pub use normalize::{normalize_hiscores, normalize_player};

use async_trait::async_trait;
use resilience::{FailureKind, Retryable, TimeoutError};
use serde_json::Value;
use stats_cache::CacheKey;
use thiserror::Error;

/// A cacheable upstream resource: cache key plus path relative to the API root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub key: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Resource {
    /// `players/{username}`
    pub fn player(username: &str) -> Self {
        let username = username.trim().to_lowercase();
        Self {
            key: CacheKey::player(&username),
            path: format!("players/{}", urlencoding::encode(&username)),
            query: Vec::new(),
        }
    }

    /// `groups/{id}/hiscores?metric={metric}&limit={limit}`
    pub fn group_hiscores(group_id: u64, metric: &str, limit: usize) -> Self {
        Self {
            key: CacheKey::group_hiscores(group_id, metric, limit),
            path: format!("groups/{}/hiscores", group_id),
            query: vec![
                ("metric".to_string(), metric.to_lowercase()),
                ("limit".to_string(), limit.to_string()),
            ],
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Request limiter closed")]
    Shutdown,
}

impl Retryable for UpstreamError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            UpstreamError::RateLimited => FailureKind::RateLimited,
            UpstreamError::Status(code) if *code >= 500 || *code == 408 => FailureKind::Transient,
            UpstreamError::Status(_) => FailureKind::Permanent,
            UpstreamError::Transport(_)
            | UpstreamError::Malformed(_)
            | UpstreamError::Timeout(_) => FailureKind::Transient,
            UpstreamError::InvalidResource(_) | UpstreamError::Shutdown => FailureKind::Permanent,
        }
    }
}

/// Read-only source of raw stats payloads
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn get(&self, resource: &Resource) -> Result<Value, UpstreamError>;
}
