//! Eligibility validation
//!
//! An entity qualifies when none of the restricted categories exceeds the
//! threshold. Determinate verdicts are cached with their own TTL; outcomes
//! that could not be determined are never cached so the next pass retries.

use super::fetch::FetchLayer;
use crate::config::EligibilityConfig;
use crate::models::{EligibilityVerdict, Entity};
use crate::upstream::{normalize_player, Resource};
use chrono::Utc;
use stats_cache::{CacheKey, TtlCache};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible,
    /// Data unobtainable or a restricted category missing
    Indeterminate,
}

impl EligibilityConfig {
    /// Apply the fail policy to an outcome
    pub fn admits(&self, outcome: Eligibility) -> bool {
        match outcome {
            Eligibility::Eligible => true,
            Eligibility::Ineligible => false,
            Eligibility::Indeterminate => self.fail_open,
        }
    }

    /// Judge a fully normalized entity.
    ///
    /// Any restricted value above the threshold rejects immediately, even if
    /// other restricted categories are missing.
    pub fn evaluate(&self, entity: &Entity) -> Eligibility {
        let mut missing = false;
        for category in &self.restricted {
            let value = entity
                .skill(category)
                .map(|s| s.level)
                .or_else(|| entity.counter(category));
            match value {
                Some(value) if value > self.threshold => return Eligibility::Ineligible,
                Some(_) => {}
                None => missing = true,
            }
        }

        if missing {
            Eligibility::Indeterminate
        } else {
            Eligibility::Eligible
        }
    }
}

pub struct EligibilityValidator {
    fetch: FetchLayer,
    verdicts: TtlCache<EligibilityVerdict>,
    rules: EligibilityConfig,
}

impl EligibilityValidator {
    pub fn new(fetch: FetchLayer, verdict_ttl: Duration, rules: EligibilityConfig) -> Self {
        Self {
            fetch,
            verdicts: TtlCache::new(verdict_ttl),
            rules,
        }
    }

    pub fn rules(&self) -> &EligibilityConfig {
        &self.rules
    }

    pub fn verdicts(&self) -> &TtlCache<EligibilityVerdict> {
        &self.verdicts
    }

    pub async fn check(&self, entity_id: &str) -> Eligibility {
        let key = CacheKey::verdict(entity_id);
        if let Some(verdict) = self.verdicts.get_fresh(&key) {
            return if verdict.eligible {
                Eligibility::Eligible
            } else {
                Eligibility::Ineligible
            };
        }

        let raw = match self.fetch.fetch(&Resource::player(entity_id)).await {
            Ok(raw) => raw,
            Err(failure) => {
                debug!(entity = %entity_id, error = %failure, "Eligibility indeterminate: no data");
                return Eligibility::Indeterminate;
            }
        };

        let Some(entity) = normalize_player(&raw) else {
            debug!(entity = %entity_id, "Eligibility indeterminate: payload without identity");
            return Eligibility::Indeterminate;
        };

        let outcome = self.rules.evaluate(&entity);
        if outcome != Eligibility::Indeterminate {
            self.verdicts.insert(
                key,
                EligibilityVerdict {
                    entity_id: entity.id.clone(),
                    eligible: outcome == Eligibility::Eligible,
                    checked_at: Utc::now(),
                },
            );
        } else {
            debug!(entity = %entity_id, "Eligibility indeterminate: restricted category missing");
        }
        outcome
    }

    pub async fn is_eligible(&self, entity_id: &str) -> bool {
        self.rules.admits(self.check(entity_id).await)
    }
}
