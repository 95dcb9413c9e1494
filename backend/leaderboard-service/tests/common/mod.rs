#![allow(dead_code)]

use async_trait::async_trait;
use leaderboard_service::upstream::{Resource, StatsSource, UpstreamError};
use leaderboard_service::Config;
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const GROUP_ID: &str = "2763";

/// Config with a fast retry policy and no inter-batch delay.
/// `overrides` are `(NAME, value)` pairs without the prefix.
pub fn config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("GROUP_ID", GROUP_ID),
        ("SKILLS", "overall,attack"),
        ("BOSSES", "zulrah"),
        ("BATCH_DELAY_MS", "0"),
        ("RATE_LIMIT_BASE_MS", "10"),
        ("RATE_LIMIT_MAX_MS", "100"),
        ("TRANSIENT_DELAY_MS", "10"),
        ("RUN_ONCE", "true"),
    ]
    .iter()
    .map(|(k, v)| (format!("LEADERBOARD_{}", k), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(format!("LEADERBOARD_{}", k), v.to_string());
    }
    Config::from_vars(vars).unwrap()
}

/// Player details payload with the four restricted skills plus overall
pub fn player(name: &str, combat: [i64; 4], overall: (i64, i64)) -> Value {
    json!({
        "username": name.to_lowercase(),
        "displayName": name,
        "latestSnapshot": { "data": {
            "skills": {
                "overall": { "level": overall.0, "experience": overall.1 },
                "attack": { "level": combat[0], "experience": 0 },
                "strength": { "level": combat[1], "experience": 0 },
                "ranged": { "level": combat[2], "experience": 0 },
                "magic": { "level": combat[3], "experience": 0 }
            },
            "bosses": { "zulrah": { "kills": 0 } }
        }}
    })
}

/// Hiscores payload for a skill, in the given order
pub fn skill_hiscores(rows: &[(&str, i64, i64)]) -> Value {
    Value::Array(
        rows.iter()
            .map(|(name, level, xp)| {
                json!({
                    "player": { "username": name.to_lowercase(), "displayName": name },
                    "data": { "type": "skill", "level": level, "experience": xp }
                })
            })
            .collect(),
    )
}

/// Hiscores payload for a boss, in the given order
pub fn boss_hiscores(rows: &[(&str, i64)]) -> Value {
    Value::Array(
        rows.iter()
            .map(|(name, kills)| {
                json!({
                    "player": { "username": name.to_lowercase(), "displayName": name },
                    "data": { "type": "boss", "kills": kills }
                })
            })
            .collect(),
    )
}

/// In-memory upstream keyed by resource path (plus metric for hiscores)
#[derive(Default)]
pub struct FakeSource {
    routes: Mutex<HashMap<String, Result<Value, UpstreamError>>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    max_latency_ms: u64,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Responses take a random 0..max_ms to arrive
    pub fn with_latency(max_ms: u64) -> Self {
        Self {
            max_latency_ms: max_ms,
            ..Self::default()
        }
    }

    pub fn player(self, name: &str, payload: Value) -> Self {
        self.route(format!("players/{}", name.to_lowercase()), Ok(payload))
    }

    pub fn hiscores(self, metric: &str, payload: Value) -> Self {
        self.route(format!("hiscores/{}", metric), Ok(payload))
    }

    pub fn failing_hiscores(self, metric: &str, error: UpstreamError) -> Self {
        self.route(format!("hiscores/{}", metric), Err(error))
    }

    fn route(self, key: String, response: Result<Value, UpstreamError>) -> Self {
        self.routes.lock().unwrap().insert(key, response);
        self
    }

    pub fn set_player(&self, name: &str, payload: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("players/{}", name.to_lowercase()), Ok(payload));
    }

    pub fn set_hiscores(&self, metric: &str, response: Result<Value, UpstreamError>) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("hiscores/{}", metric), response);
    }

    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn route_key(resource: &Resource) -> String {
        if resource.path.ends_with("/hiscores") {
            let metric = resource
                .query
                .iter()
                .find(|(k, _)| k == "metric")
                .map(|(_, v)| v.as_str())
                .unwrap_or_default();
            format!("hiscores/{}", metric)
        } else {
            resource.path.clone()
        }
    }
}

#[async_trait]
impl StatsSource for FakeSource {
    async fn get(&self, resource: &Resource) -> Result<Value, UpstreamError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        let key = Self::route_key(resource);
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        if self.max_latency_ms > 0 {
            let delay = rand::thread_rng().gen_range(0..self.max_latency_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(Err(UpstreamError::Status(404)))
    }
}
