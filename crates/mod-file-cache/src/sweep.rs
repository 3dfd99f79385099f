//! Age-based eviction of unused cache files
//!
//! The sweep walks the whole cache root and judges every regular file on its own:
//! lock, read the last-access time, delete if older than the configured lifetime,
//! unlock. Per-file failures are recorded and the walk goes on; only a cache root
//! that cannot be listed at all aborts it. Directories are never removed.

use crate::cache::ModFileCache;
use crate::error::{SweepError, SweepStage};
use crate::types::SweepReport;
use chrono::{DateTime, Duration, Local};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

enum Verdict {
    Evicted(u64),
    Retained,
    /// Gone before it could be judged, or not a regular file
    Skipped,
}

/// True if a file last accessed at `last_access` has outlived `lifetime_days` at `now`.
///
/// The boundary is strict: an entry expiring exactly at `now` is kept.
pub fn is_expired(last_access: DateTime<Local>, lifetime_days: u32, now: DateTime<Local>) -> bool {
    last_access
        .checked_add_signed(Duration::days(i64::from(lifetime_days)))
        .map_or(false, |expires_at| expires_at < now)
}

fn record(failures: &mut Vec<SweepError>, failure: SweepError) {
    warn!(error = %failure, "Failed to clean cache entry");
    failures.push(failure);
}

/// Collect every non-directory entry below `root`.
///
/// Fails only if `root` itself cannot be listed. Symlinked directories are not followed.
async fn collect_files(root: &Path, failures: &mut Vec<SweepError>) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if dir.as_path() == root => return Err(e),
            Err(e) => {
                record(failures, SweepError::partial(&dir, SweepStage::Enumerate, e));
                continue;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => match entry.file_type().await {
                    Ok(file_type) if file_type.is_dir() => pending.push(entry.path()),
                    Ok(_) => files.push(entry.path()),
                    Err(e) => record(
                        failures,
                        SweepError::partial(entry.path(), SweepStage::Enumerate, e),
                    ),
                },
                Ok(None) => break,
                Err(e) => {
                    record(failures, SweepError::partial(&dir, SweepStage::Enumerate, e));
                    break;
                }
            }
        }
    }

    Ok(files)
}

impl ModFileCache {
    /// Evict every file under the cache root whose last access plus the configured
    /// lifetime lies before `now`.
    ///
    /// Best effort: failures end up in the returned report and the log.
    pub async fn sweep(&self, now: DateTime<Local>) -> SweepReport {
        let root = self.cache_dir();
        let mut report = SweepReport::default();

        let files = match collect_files(root, &mut report.failures).await {
            Ok(files) => files,
            Err(e) => {
                let failure = SweepError::Aborted {
                    root: root.to_path_buf(),
                    source: Box::new(e),
                };
                error!(error = %failure, "Cleaning featured mod files cache failed");
                report.failures.push(failure);
                return report;
            }
        };

        for path in files {
            match self.evaluate(&path, now).await {
                Ok(Verdict::Evicted(bytes)) => {
                    report.scanned += 1;
                    report.evicted += 1;
                    report.bytes_reclaimed += bytes;
                }
                Ok(Verdict::Retained) => {
                    report.scanned += 1;
                    report.retained += 1;
                }
                Ok(Verdict::Skipped) => {}
                Err(failure) => {
                    report.scanned += 1;
                    record(&mut report.failures, failure);
                }
            }
        }

        info!(
            scanned = report.scanned,
            evicted = report.evicted,
            retained = report.retained,
            freed_mb = report.bytes_reclaimed / (1024 * 1024),
            failures = report.failures.len(),
            "Cache sweep complete"
        );

        report
    }

    async fn evaluate(&self, path: &Path, now: DateTime<Local>) -> Result<Verdict, SweepError> {
        let _guard = self.lock().await.map_err(|e| {
            SweepError::partial(
                path,
                SweepStage::Lock,
                io::Error::new(io::ErrorKind::TimedOut, e.to_string()),
            )
        })?;

        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Verdict::Skipped),
            Err(e) => return Err(SweepError::partial(path, SweepStage::Inspect, e)),
        };
        if !metadata.is_file() {
            return Ok(Verdict::Skipped);
        }

        let last_access = metadata
            .accessed()
            .or_else(|_| metadata.modified())
            .map(DateTime::<Local>::from)
            .map_err(|e| SweepError::partial(path, SweepStage::Inspect, e))?;

        if !is_expired(last_access, self.config().lifetime_days, now) {
            debug!(path = %path.display(), last_access = %last_access, "Keeping cached file");
            return Ok(Verdict::Retained);
        }

        info!(path = %path.display(), last_access = %last_access, "Deleting cached file");
        match fs::remove_file(path).await {
            Ok(()) => Ok(Verdict::Evicted(metadata.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Verdict::Skipped),
            Err(e) => Err(SweepError::partial(path, SweepStage::Delete, e)),
        }
    }
}
