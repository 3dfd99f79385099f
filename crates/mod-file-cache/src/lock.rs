//! Process-wide disk lock
//!
//! A single mutex serializes every disk operation issued through the cache: copy-in,
//! copy-out and each per-file step of the sweep. Access goes through [`DiskLockGuard`],
//! which releases on drop, so an early `?` return cannot leak the lock.

use crate::error::{CacheError, Result};
use crate::types::LockStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

static GLOBAL: OnceLock<Arc<DiskLock>> = OnceLock::new();

#[derive(Debug, Default)]
pub struct DiskLock {
    mutex: Mutex<()>,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl DiskLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock shared by every cache in this process
    pub fn global() -> Arc<DiskLock> {
        GLOBAL.get_or_init(|| Arc::new(DiskLock::new())).clone()
    }

    /// Wait for the lock
    pub async fn acquire(&self) -> DiskLockGuard<'_> {
        let guard = self.mutex.lock().await;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        DiskLockGuard {
            _guard: guard,
            releases: &self.releases,
        }
    }

    /// Wait for the lock, giving up after `timeout`
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<DiskLockGuard<'_>> {
        tokio::time::timeout(timeout, self.acquire())
            .await
            .map_err(|_| CacheError::LockTimeout(timeout))
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}

/// Held access to the disk; released when dropped
pub struct DiskLockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    releases: &'a AtomicU64,
}

impl Drop for DiskLockGuard<'_> {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }
}
