//! Cache-aside fetch layer
//!
//! Fronts the upstream with a TTL cache. Misses go upstream under the shared
//! request limiter with the configured retry and timeout policy. When the
//! upstream cannot deliver, an expired entry is served instead of failing.
//!
//! Concurrent misses on one key each call upstream unless coalescing is
//! enabled; payloads are idempotent so the duplicate writes are harmless.

use crate::upstream::{Resource, StatsSource, UpstreamError};
use dashmap::DashMap;
use resilience::{with_retry, with_timeout, ServiceConfig};
use serde_json::Value;
use stats_cache::{Lookup, TtlCache};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Neither fresh nor stale data could be produced for `key`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No data for {key}: {reason}")]
pub struct FetchFailure {
    pub key: String,
    pub reason: String,
}

pub type Payload = Arc<Value>;

#[derive(Clone)]
pub struct FetchLayer {
    source: Arc<dyn StatsSource>,
    cache: TtlCache<Payload>,
    limiter: Arc<Semaphore>,
    service: ServiceConfig,
    cancel: CancellationToken,
    inflight: Option<Arc<DashMap<String, Arc<Mutex<()>>>>>,
}

impl FetchLayer {
    pub fn new(
        source: Arc<dyn StatsSource>,
        cache: TtlCache<Payload>,
        limiter: Arc<Semaphore>,
        service: ServiceConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            cache,
            limiter,
            service,
            cancel,
            inflight: None,
        }
    }

    /// Make concurrent misses on the same key share one upstream call
    pub fn with_coalescing(mut self) -> Self {
        self.inflight = Some(Arc::new(DashMap::new()));
        self
    }

    pub fn cache(&self) -> &TtlCache<Payload> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<Semaphore> {
        &self.limiter
    }

    pub async fn fetch(&self, resource: &Resource) -> Result<Payload, FetchFailure> {
        if let Some(value) = self.cache.get_fresh(&resource.key) {
            return Ok(value);
        }

        let Some(inflight) = &self.inflight else {
            return self.fetch_upstream(resource).await;
        };

        let lock = inflight
            .entry(resource.key.clone())
            .or_default()
            .value()
            .clone();
        let _guard = lock.lock().await;

        // Another caller may have filled the entry while we waited
        if let Some(value) = self.cache.get_fresh(&resource.key) {
            return Ok(value);
        }

        let result = self.fetch_upstream(resource).await;
        inflight.remove(&resource.key);
        result
    }

    async fn fetch_upstream(&self, resource: &Resource) -> Result<Payload, FetchFailure> {
        let key = &resource.key;
        let outcome = with_retry(&self.service.retry, &self.cancel, || {
            self.call_once(resource)
        })
        .await;

        match outcome {
            Ok(value) => {
                let value = Arc::new(value);
                self.cache.insert(key.clone(), value.clone());
                Ok(value)
            }
            Err(err) => match self.cache.peek(key) {
                Lookup::Fresh(value) => {
                    debug!(key = %key, error = %err, "Entry refreshed concurrently; using it");
                    Ok(value)
                }
                Lookup::Stale(value) => {
                    warn!(key = %key, error = %err, "Serving stale data after upstream failure");
                    self.cache.note_stale_serve(key);
                    Ok(value)
                }
                Lookup::Missing => {
                    warn!(key = %key, error = %err, "Upstream fetch failed with nothing cached");
                    Err(FetchFailure {
                        key: key.clone(),
                        reason: err.to_string(),
                    })
                }
            },
        }
    }

    /// One upstream attempt: holds a limiter permit only for the call itself,
    /// never across backoff sleeps.
    async fn call_once(&self, resource: &Resource) -> Result<Value, UpstreamError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| UpstreamError::Shutdown)?;

        debug!(key = %resource.key, "Upstream call");
        with_timeout(self.service.timeout.duration, self.source.get(resource)).await
    }
}
