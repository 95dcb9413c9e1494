pub mod assembler;
pub mod eligibility;
pub mod fetch;
pub mod leaderboard;
pub mod orchestrator;

pub use assembler::{rank, LeaderboardAssembler};
pub use eligibility::{Eligibility, EligibilityValidator};
pub use fetch::{FetchFailure, FetchLayer, Payload};
pub use leaderboard::LeaderboardService;
pub use orchestrator::{BatchOrchestrator, Resolution};
