pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod upstream;

pub use config::Config;
pub use error::LeaderboardError;
pub use services::{
    BatchOrchestrator, EligibilityValidator, FetchLayer, LeaderboardAssembler, LeaderboardService,
};
