use super::eligibility::{Eligibility, EligibilityValidator};
use crate::config::OrchestratorConfig;
use crate::models::{Entity, ResolveStats};
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Qualifying entities in candidate order, plus what it took to find them
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub qualifying: Vec<Entity>,
    pub stats: ResolveStats,
}

/// Walks a category's candidates in batches until enough qualify
pub struct BatchOrchestrator {
    validator: Arc<EligibilityValidator>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(
        validator: Arc<EligibilityValidator>,
        config: OrchestratorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            validator,
            config,
            cancel,
        }
    }

    /// Validate `candidates` batch by batch, stopping once `required_count`
    /// have qualified or candidates run out. Output keeps candidate order no
    /// matter which validation finishes first.
    pub async fn resolve_category(
        &self,
        candidates: &[Entity],
        required_count: usize,
    ) -> Resolution {
        let mut resolution = Resolution {
            qualifying: Vec::with_capacity(required_count.min(candidates.len())),
            stats: ResolveStats::default(),
        };
        if required_count == 0 {
            return resolution;
        }

        let batch_size = self.config.batch_size.max(1);
        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.batch_delay) => {}
                }
            }
            if self.cancel.is_cancelled() {
                break;
            }

            // join_all yields results in input order
            let outcomes = join_all(batch.iter().map(|c| self.validator.check(&c.id))).await;
            resolution.stats.batches += 1;

            for (candidate, outcome) in batch.iter().zip(outcomes) {
                resolution.stats.examined += 1;
                match outcome {
                    Eligibility::Eligible => resolution.stats.eligible += 1,
                    Eligibility::Ineligible => resolution.stats.rejected += 1,
                    Eligibility::Indeterminate => resolution.stats.indeterminate += 1,
                }

                if resolution.qualifying.len() < required_count
                    && self.validator.rules().admits(outcome)
                {
                    resolution.qualifying.push(candidate.clone());
                }
            }

            debug!(
                batch = index,
                qualifying = resolution.qualifying.len(),
                required = required_count,
                "Batch validated"
            );

            if resolution.qualifying.len() >= required_count {
                break;
            }
        }

        info!(
            examined = resolution.stats.examined,
            qualifying = resolution.qualifying.len(),
            rejected = resolution.stats.rejected,
            indeterminate = resolution.stats.indeterminate,
            "Category resolved"
        );
        resolution
    }
}
