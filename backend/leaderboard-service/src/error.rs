//! Startup errors
//!
//! Runtime failures never surface as errors: fetch failures become
//! [`FetchFailure`](crate::services::FetchFailure) values and category
//! failures become [`BoardOutcome::Unavailable`](crate::models::BoardOutcome).

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

pub type Result<T> = std::result::Result<T, LeaderboardError>;
