use super::assembler::LeaderboardAssembler;
use super::eligibility::EligibilityValidator;
use super::fetch::FetchLayer;
use super::orchestrator::BatchOrchestrator;
use crate::config::Config;
use crate::error::Result;
use crate::models::{BoardOutcome, Category, CategoryBoard, ResolveStats};
use crate::upstream::{normalize_hiscores, HttpStatsSource, Resource, StatsSource};
use chrono::Utc;
use futures::future::join_all;
use stats_cache::TtlCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Long-lived owner of the caches, limiter and pipeline stages.
///
/// Built once at startup and shared by reference; `shutdown` cancels every
/// outstanding retry loop and batch.
pub struct LeaderboardService {
    fetch: FetchLayer,
    validator: Arc<EligibilityValidator>,
    orchestrator: BatchOrchestrator,
    assembler: LeaderboardAssembler,
    categories: Vec<Category>,
    group_id: u64,
    candidate_limit: usize,
    display_size: usize,
    stale_retention: Duration,
    cancel: CancellationToken,
}

impl LeaderboardService {
    /// Build against the configured HTTP upstream
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = HttpStatsSource::new(&config.upstream)?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    pub fn with_source(config: &Config, source: Arc<dyn StatsSource>) -> Self {
        let cancel = CancellationToken::new();
        let limiter = Arc::new(Semaphore::new(config.upstream.concurrency_limit));

        let mut fetch = FetchLayer::new(
            source,
            TtlCache::new(config.cache.data_ttl),
            limiter,
            config.upstream.service.clone(),
            cancel.clone(),
        );
        if config.upstream.coalesce_requests {
            fetch = fetch.with_coalescing();
        }

        let validator = Arc::new(EligibilityValidator::new(
            fetch.clone(),
            config.cache.verdict_ttl,
            config.eligibility.clone(),
        ));
        let orchestrator =
            BatchOrchestrator::new(validator.clone(), config.orchestrator.clone(), cancel.clone());

        Self {
            fetch,
            validator,
            orchestrator,
            assembler: LeaderboardAssembler::new(config.leaderboard.display_size),
            categories: config.leaderboard.categories.clone(),
            group_id: config.upstream.group_id,
            candidate_limit: config.leaderboard.candidate_limit,
            display_size: config.leaderboard.display_size,
            stale_retention: config.cache.stale_retention,
            cancel,
        }
    }

    pub fn fetch_layer(&self) -> &FetchLayer {
        &self.fetch
    }

    pub fn validator(&self) -> &EligibilityValidator {
        &self.validator
    }

    /// Candidates -> qualifying subset -> ranked rows for one category
    pub async fn build_board(&self, category: &Category) -> CategoryBoard {
        let board = |outcome, stats| CategoryBoard {
            category: category.clone(),
            outcome,
            stats,
            generated_at: Utc::now(),
        };

        let resource =
            Resource::group_hiscores(self.group_id, &category.name, self.candidate_limit);
        let raw = match self.fetch.fetch(&resource).await {
            Ok(raw) => raw,
            Err(failure) => {
                warn!(category = %category.name, error = %failure, "Category unavailable");
                return board(
                    BoardOutcome::Unavailable(failure.to_string()),
                    ResolveStats::default(),
                );
            }
        };

        let Some(candidates) = normalize_hiscores(&raw, category) else {
            warn!(category = %category.name, "Hiscores payload is not a list");
            return board(
                BoardOutcome::Unavailable("unexpected hiscores payload".to_string()),
                ResolveStats::default(),
            );
        };

        let resolution = self
            .orchestrator
            .resolve_category(&candidates, self.display_size)
            .await;
        if self.cancel.is_cancelled() {
            return board(
                BoardOutcome::Unavailable("shutting down".to_string()),
                resolution.stats,
            );
        }

        let rows = self.assembler.assemble(&resolution.qualifying, category);
        let outcome = if rows.is_empty() {
            BoardOutcome::Empty
        } else {
            BoardOutcome::Ranked(rows)
        };
        board(outcome, resolution.stats)
    }

    /// Every configured category. Categories run concurrently; the shared
    /// limiter still bounds upstream calls, and one failing category never
    /// holds back the others.
    pub async fn build_all(&self) -> Vec<CategoryBoard> {
        let boards = join_all(self.categories.iter().map(|c| self.build_board(c))).await;

        let unavailable = boards
            .iter()
            .filter(|b| matches!(b.outcome, BoardOutcome::Unavailable(_)))
            .count();
        info!(
            categories = boards.len(),
            unavailable, "Leaderboards built"
        );
        boards
    }

    /// Drop cached payloads and verdicts past their stale retention
    pub fn purge_stale(&self) -> usize {
        self.fetch.cache().purge_expired(self.stale_retention)
            + self.validator.verdicts().purge_expired(Duration::ZERO)
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn shutdown(&self) {
        info!("Leaderboard service shutting down");
        self.cancel.cancel();
        self.fetch.limiter().close();
    }
}
