//! Core types for the cache janitor

use mod_file_cache::{CacheConfig, LockStats, SweepReport};
use serde::Serialize;
use std::path::PathBuf;

/// Machine-readable result of the startup sweep, written to stdout
#[derive(Debug, Serialize)]
pub struct SweepSummary {
    pub cache_dir: PathBuf,
    pub lifetime_days: u32,
    pub scanned: usize,
    pub evicted: usize,
    pub retained: usize,
    pub bytes_reclaimed: u64,
    pub aborted: bool,
    pub failures: Vec<String>,
    pub lock: LockStats,
}

impl SweepSummary {
    pub fn new(config: &CacheConfig, report: &SweepReport, lock: LockStats) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            lifetime_days: config.lifetime_days,
            scanned: report.scanned,
            evicted: report.evicted,
            retained: report.retained,
            bytes_reclaimed: report.bytes_reclaimed,
            aborted: report.is_aborted(),
            failures: report.failures.iter().map(|f| f.to_string()).collect(),
            lock,
        }
    }
}
