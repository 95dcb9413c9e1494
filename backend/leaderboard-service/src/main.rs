use anyhow::Context;
use leaderboard_service::{
    jobs::{LogPublisher, RefreshJob},
    Config, LeaderboardService,
};
use prometheus::Registry;
use stats_cache::CacheMetrics;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    // Missing or invalid configuration aborts startup
    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        group_id = config.upstream.group_id,
        upstream = %config.upstream.locator.base(),
        categories = config.leaderboard.categories.len(),
        concurrency = config.upstream.concurrency_limit,
        "Starting leaderboard-service"
    );

    let service = Arc::new(
        LeaderboardService::from_config(&config).context("Failed to build leaderboard service")?,
    );

    let shutdown = service.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                shutdown.shutdown();
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let registry = Registry::new();
    CacheMetrics::register(&registry).context("Failed to register cache metrics")?;

    let job = RefreshJob::new(service.clone(), Arc::new(LogPublisher), config.refresh.clone())
        .with_metrics(registry);
    let stats = job.run().await;

    info!(
        ranked = stats.ranked,
        empty = stats.empty,
        unavailable = stats.unavailable,
        "leaderboard-service stopped"
    );
    service.shutdown();
    Ok(())
}
