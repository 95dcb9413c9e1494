//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    stale_serves: CounterVec,
    writes: CounterVec,
    evictions: CounterVec,
}

fn counter(name: &str, help: &str) -> CounterVec {
    CounterVec::new(Opts::new(name, help), &["namespace"]).expect("valid metric definition")
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: counter("stats_cache_hits_total", "Lookups served by a live entry"),
            misses: counter(
                "stats_cache_misses_total",
                "Lookups with no live entry (absent or expired)",
            ),
            stale_serves: counter(
                "stats_cache_stale_serves_total",
                "Expired entries served after the upstream failed",
            ),
            writes: counter("stats_cache_writes_total", "Entries stored or replaced"),
            evictions: counter(
                "stats_cache_evictions_total",
                "Expired entries dropped by purge",
            ),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.stale_serves.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.evictions.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Extract the namespace from a cache key for metrics labeling
fn extract_namespace(key: &str) -> &str {
    // Format: v{N}:{namespace}:...
    key.split(':').nth(1).unwrap_or("unknown")
}

/// Cache metrics wrapper
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self, key: &str) {
        get_metrics()
            .hits
            .with_label_values(&[extract_namespace(key)])
            .inc();
    }

    pub fn record_miss(&self, key: &str) {
        get_metrics()
            .misses
            .with_label_values(&[extract_namespace(key)])
            .inc();
    }

    pub fn record_stale_serve(&self, key: &str) {
        get_metrics()
            .stale_serves
            .with_label_values(&[extract_namespace(key)])
            .inc();
    }

    pub fn record_write(&self, key: &str) {
        get_metrics()
            .writes
            .with_label_values(&[extract_namespace(key)])
            .inc();
    }

    pub fn record_evictions(&self, namespace: &str, count: usize) {
        get_metrics()
            .evictions
            .with_label_values(&[namespace])
            .inc_by(count as f64);
    }
}
