//! Unified cache key schema
//!
//! Key format: v{VERSION}:{namespace}:{identifier}[:sub_key]

/// Cache schema version - increment when changing key formats or payload shapes
pub const CACHE_VERSION: u32 = 1;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Player details
    /// Format: v1:player:{username}
    pub fn player(username: &str) -> String {
        format!("v{}:player:{}", CACHE_VERSION, normalize(username))
    }

    /// Group hiscores for one metric
    /// Format: v1:hiscores:{group_id}:{metric}:{limit}
    pub fn group_hiscores(group_id: u64, metric: &str, limit: usize) -> String {
        format!(
            "v{}:hiscores:{}:{}:{}",
            CACHE_VERSION,
            group_id,
            normalize(metric),
            limit
        )
    }

    /// Eligibility verdict for a player
    /// Format: v1:verdict:{username}
    pub fn verdict(username: &str) -> String {
        format!("v{}:verdict:{}", CACHE_VERSION, normalize(username))
    }
}

/// Usernames are case-insensitive upstream; `Zezima` and ` zezima` share a key.
fn normalize(part: &str) -> String {
    part.trim().to_lowercase()
}
