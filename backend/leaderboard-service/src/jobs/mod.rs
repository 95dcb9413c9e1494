// ============================================
// Leaderboard Refresh Job
// ============================================
//
// Rebuilds every configured board on an interval and hands the result to a
// publisher. Rendering (chat messages, embeds) belongs to the publisher; the
// bundled one only logs.
//
// Workflow per pass:
// 1. Build all boards through the shared LeaderboardService
// 2. Publish them
// 3. Purge cache entries past their stale retention
// 4. Report cache counters when a metrics registry is attached

use crate::config::RefreshConfig;
use crate::models::{BoardOutcome, CategoryBoard};
use crate::services::LeaderboardService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Consumer of freshly built boards
#[async_trait]
pub trait BoardPublisher: Send + Sync {
    async fn publish(&self, boards: &[CategoryBoard]) -> anyhow::Result<()>;
}

/// Writes each board to the log as structured JSON rows
pub struct LogPublisher;

#[async_trait]
impl BoardPublisher for LogPublisher {
    async fn publish(&self, boards: &[CategoryBoard]) -> anyhow::Result<()> {
        for board in boards {
            match &board.outcome {
                BoardOutcome::Ranked(rows) => info!(
                    category = %board.category.name,
                    rows = %serde_json::to_string(rows)?,
                    "Leaderboard"
                ),
                BoardOutcome::Empty => {
                    info!(category = %board.category.name, "No qualifying entries")
                }
                BoardOutcome::Unavailable(reason) => warn!(
                    category = %board.category.name,
                    reason = %reason,
                    "Leaderboard unavailable"
                ),
            }
        }
        Ok(())
    }
}

/// Refresh pass statistics
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ranked: u32,
    pub empty: u32,
    pub unavailable: u32,
    pub purged: usize,
    pub published: bool,
    /// Cumulative cache counters, by metric name
    pub cache_counters: Vec<(String, f64)>,
    pub total_duration_ms: u64,
}

/// Sum every counter family in `registry` across its labels
fn counter_totals(registry: &Registry) -> Vec<(String, f64)> {
    registry
        .gather()
        .iter()
        .map(|family| {
            let total = family
                .get_metric()
                .iter()
                .map(|metric| metric.get_counter().get_value())
                .sum();
            (family.get_name().to_string(), total)
        })
        .collect()
}

pub struct RefreshJob {
    service: Arc<LeaderboardService>,
    publisher: Arc<dyn BoardPublisher>,
    config: RefreshConfig,
    metrics: Option<Registry>,
}

impl RefreshJob {
    pub fn new(
        service: Arc<LeaderboardService>,
        publisher: Arc<dyn BoardPublisher>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            service,
            publisher,
            config,
            metrics: None,
        }
    }

    /// Report the counters registered on `registry` after every pass
    pub fn with_metrics(mut self, registry: Registry) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Run passes until `run_once` is set or the service shuts down.
    /// Returns the stats of the last completed pass.
    pub async fn run(&self) -> PassStats {
        let cancel = self.service.cancellation();
        loop {
            let stats = self.run_single_pass().await;

            info!(
                ranked = stats.ranked,
                empty = stats.empty,
                unavailable = stats.unavailable,
                duration_ms = stats.total_duration_ms,
                "Leaderboard refresh pass completed"
            );

            if self.config.run_once || cancel.is_cancelled() {
                return stats;
            }

            info!(
                interval_secs = self.config.interval.as_secs(),
                "Sleeping until next pass"
            );
            tokio::select! {
                _ = cancel.cancelled() => return stats,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    pub async fn run_single_pass(&self) -> PassStats {
        let start = Instant::now();
        let mut stats = PassStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let boards = self.service.build_all().await;
        for board in &boards {
            match board.outcome {
                BoardOutcome::Ranked(_) => stats.ranked += 1,
                BoardOutcome::Empty => stats.empty += 1,
                BoardOutcome::Unavailable(_) => stats.unavailable += 1,
            }
        }

        match self.publisher.publish(&boards).await {
            Ok(()) => stats.published = true,
            Err(e) => error!(error = %e, "Failed to publish leaderboards"),
        }

        stats.purged = self.service.purge_stale();
        if let Some(registry) = &self.metrics {
            stats.cache_counters = counter_totals(registry);
            for (metric, value) in &stats.cache_counters {
                info!(metric = %metric, value, "Cache counter");
            }
        }
        stats.completed_at = Some(Utc::now());
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        stats
    }
}
