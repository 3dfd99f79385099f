//! Featured mod cache janitor
//!
//! Runs the startup sweep of the featured mod file cache: files not accessed within
//! the configured lifetime are deleted before new downloads start to accumulate.

mod error;
mod types;

use crate::error::Result;
use crate::types::SweepSummary;
use mod_file_cache::{CacheConfig, ModFileCache};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("mod_cache_janitor=info".parse()?)
        .add_directive("mod_file_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    info!("Starting featured mod cache janitor...");

    let config = CacheConfig::from_env();
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Cache lifetime: {} days", config.lifetime_days);
    if let Some(timeout) = config.lock_timeout {
        info!("Disk lock timeout: {:?}", timeout);
    }

    let cache = ModFileCache::new(config);
    let report = cache.init().await;
    if !report.is_clean() {
        warn!(
            failures = report.failures.len(),
            aborted = report.is_aborted(),
            "Cache sweep finished with errors"
        );
    }

    let summary = SweepSummary::new(cache.config(), report, cache.lock_stats());
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}
