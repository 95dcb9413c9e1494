use crate::models::{Category, SKILLS};
use crate::upstream::{ApiLocator, LocatorError};
use resilience::{BackoffPolicy, RetryConfig, ServiceConfig, TimeoutConfig};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "LEADERBOARD_";

/// Upper bound for every configured duration (10 years)
const MAX_DURATION_SECS: u64 = 10 * 365 * 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment error: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Invalid upstream location: {0}")]
    Locator(#[from] LocatorError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub eligibility: EligibilityConfig,
    pub orchestrator: OrchestratorConfig,
    pub leaderboard: LeaderboardConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub locator: ApiLocator,
    pub group_id: u64,
    pub user_agent: String,
    pub api_key: Option<String>,
    pub service: ServiceConfig,
    /// Permits shared by every outstanding upstream call
    pub concurrency_limit: usize,
    pub coalesce_requests: bool,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub data_ttl: Duration,
    pub verdict_ttl: Duration,
    /// How long expired payloads are kept as a stale fallback
    pub stale_retention: Duration,
}

#[derive(Debug, Clone)]
pub struct EligibilityConfig {
    pub restricted: Vec<String>,
    /// Inclusive upper bound for every restricted category
    pub threshold: i64,
    /// Admit entities whose eligibility cannot be determined
    pub fail_open: bool,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct LeaderboardConfig {
    pub categories: Vec<Category>,
    pub display_size: usize,
    /// Hiscores entries requested per category
    pub candidate_limit: usize,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub run_once: bool,
}

fn default_base_url() -> String {
    "https://api.wiseoldman.net".to_string()
}
fn default_api_version() -> String {
    "v2".to_string()
}
fn default_user_agent() -> String {
    concat!("leaderboard-service/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_verdict_ttl_secs() -> u64 {
    3600
}
fn default_stale_retention_secs() -> u64 {
    86_400
}
fn default_concurrency_limit() -> usize {
    5
}
fn default_batch_size() -> usize {
    10
}
fn default_batch_delay_ms() -> u64 {
    250
}
fn default_candidate_limit() -> usize {
    50
}
fn default_display_size() -> usize {
    10
}
fn default_rate_limit_retries() -> u32 {
    5
}
fn default_rate_limit_base_ms() -> u64 {
    1000
}
fn default_rate_limit_max_ms() -> u64 {
    30_000
}
fn default_rate_limit_jitter() -> f64 {
    0.2
}
fn default_transient_retries() -> u32 {
    2
}
fn default_transient_delay_ms() -> u64 {
    500
}
fn default_restricted() -> Vec<String> {
    ["attack", "strength", "ranged", "magic"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_threshold() -> i64 {
    2
}
fn default_true() -> bool {
    true
}
fn default_skills() -> Vec<String> {
    SKILLS.iter().map(|s| s.to_string()).collect()
}
/// Boss boards built when `LEADERBOARD_BOSSES` is unset.
///
/// Candidates come from per-metric group hiscores, so the board list has to
/// be known before any member data is read. Boards are no longer derived from
/// whichever bosses the eligible members happen to have kills in; set
/// `LEADERBOARD_BOSSES` to cover other bosses.
fn default_bosses() -> Vec<String> {
    [
        "barrows_chests",
        "bryophyta",
        "chaos_elemental",
        "crazy_archaeologist",
        "deranged_archaeologist",
        "giant_mole",
        "hespori",
        "kalphite_queen",
        "king_black_dragon",
        "obor",
        "sarachnis",
        "scurrius",
        "skotizo",
        "tempoross",
        "wintertodt",
        "zalcano",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_refresh_interval_secs() -> u64 {
    86_400
}

/// Flat environment view, `LEADERBOARD_` prefix stripped
#[derive(Debug, Deserialize)]
struct EnvConfig {
    group_id: u64,
    #[serde(default = "default_base_url")]
    api_base_url: String,
    #[serde(default = "default_api_version")]
    api_version: String,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    cache_ttl_secs: u64,
    #[serde(default = "default_verdict_ttl_secs")]
    verdict_ttl_secs: u64,
    #[serde(default = "default_stale_retention_secs")]
    stale_retention_secs: u64,
    #[serde(default = "default_concurrency_limit")]
    concurrency_limit: usize,
    #[serde(default)]
    coalesce_requests: bool,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    batch_delay_ms: u64,
    #[serde(default = "default_candidate_limit")]
    candidate_limit: usize,
    #[serde(default = "default_display_size")]
    display_size: usize,
    #[serde(default = "default_rate_limit_retries")]
    rate_limit_retries: u32,
    #[serde(default = "default_rate_limit_base_ms")]
    rate_limit_base_ms: u64,
    #[serde(default = "default_rate_limit_max_ms")]
    rate_limit_max_ms: u64,
    #[serde(default = "default_rate_limit_jitter")]
    rate_limit_jitter: f64,
    #[serde(default = "default_transient_retries")]
    transient_retries: u32,
    #[serde(default = "default_transient_delay_ms")]
    transient_delay_ms: u64,
    #[serde(default = "default_restricted")]
    restricted_categories: Vec<String>,
    #[serde(default = "default_threshold")]
    threshold: i64,
    #[serde(default = "default_true")]
    fail_open: bool,
    #[serde(default = "default_skills")]
    skills: Vec<String>,
    #[serde(default = "default_bosses")]
    bosses: Vec<String>,
    #[serde(default = "default_refresh_interval_secs")]
    refresh_interval_secs: u64,
    #[serde(default)]
    run_once: bool,
}

impl Config {
    /// Load from the process environment (and `.env` when present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let raw: EnvConfig = envy::prefixed(ENV_PREFIX).from_env()?;
        raw.try_into()
    }

    /// Load from explicit `(NAME, value)` pairs, prefix included
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: EnvConfig = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        raw.try_into()
    }
}

fn positive(field: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn seconds(field: &'static str, value: u64) -> Result<Duration, ConfigError> {
    if value > MAX_DURATION_SECS {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{}s exceeds the {}s limit", value, MAX_DURATION_SECS),
        });
    }
    Ok(Duration::from_secs(value))
}

fn millis(field: &'static str, value: u64) -> Result<Duration, ConfigError> {
    if value / 1000 > MAX_DURATION_SECS {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{}ms exceeds the {}s limit", value, MAX_DURATION_SECS),
        });
    }
    Ok(Duration::from_millis(value))
}

fn names(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl TryFrom<EnvConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: EnvConfig) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&raw.rate_limit_jitter) {
            return Err(ConfigError::Invalid {
                field: "rate_limit_jitter",
                reason: format!("{} is outside 0.0..=1.0", raw.rate_limit_jitter),
            });
        }
        if raw.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }

        let mut rate_limited = BackoffPolicy::exponential(
            raw.rate_limit_retries,
            millis("rate_limit_base_ms", raw.rate_limit_base_ms)?,
            millis("rate_limit_max_ms", raw.rate_limit_max_ms)?,
        );
        rate_limited.jitter = raw.rate_limit_jitter;

        let mut categories: Vec<Category> = names(raw.skills)
            .iter()
            .map(|name| Category::skill(name))
            .collect();
        categories.extend(names(raw.bosses).iter().map(|name| Category::counter(name)));
        if categories.is_empty() {
            return Err(ConfigError::Invalid {
                field: "skills/bosses",
                reason: "no categories configured".to_string(),
            });
        }

        let api_key = raw.api_key.filter(|key| !key.trim().is_empty());

        Ok(Config {
            upstream: UpstreamConfig {
                locator: ApiLocator::new(&raw.api_base_url, &raw.api_version)?,
                group_id: raw.group_id,
                user_agent: raw.user_agent,
                api_key,
                service: ServiceConfig {
                    timeout: TimeoutConfig {
                        duration: millis("request_timeout_ms", raw.request_timeout_ms)?,
                    },
                    retry: RetryConfig {
                        rate_limited,
                        transient: BackoffPolicy::fixed(
                            raw.transient_retries,
                            millis("transient_delay_ms", raw.transient_delay_ms)?,
                        ),
                    },
                },
                concurrency_limit: positive("concurrency_limit", raw.concurrency_limit)?,
                coalesce_requests: raw.coalesce_requests,
            },
            cache: CacheConfig {
                data_ttl: seconds("cache_ttl_secs", raw.cache_ttl_secs)?,
                verdict_ttl: seconds("verdict_ttl_secs", raw.verdict_ttl_secs)?,
                stale_retention: seconds("stale_retention_secs", raw.stale_retention_secs)?,
            },
            eligibility: EligibilityConfig {
                restricted: names(raw.restricted_categories),
                threshold: raw.threshold,
                fail_open: raw.fail_open,
            },
            orchestrator: OrchestratorConfig {
                batch_size: positive("batch_size", raw.batch_size)?,
                batch_delay: millis("batch_delay_ms", raw.batch_delay_ms)?,
            },
            leaderboard: LeaderboardConfig {
                categories,
                display_size: positive("display_size", raw.display_size)?,
                candidate_limit: positive("candidate_limit", raw.candidate_limit)?,
            },
            refresh: RefreshConfig {
                interval: seconds("refresh_interval_secs", raw.refresh_interval_secs)?,
                run_once: raw.run_once,
            },
        })
    }
}
