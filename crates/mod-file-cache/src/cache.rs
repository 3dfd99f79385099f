//! Featured mod file cache
//!
//! Entries are plain files under the cache root, named after the descriptor they hold
//! (see [`crate::naming`]). The store keeps no in-memory index; every call looks at the
//! filesystem, so the tree itself is the catalog and survives restarts.

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::fsops::{copy_replacing, create_parent_dirs, set_accessed};
use crate::lock::{DiskLock, DiskLockGuard};
use crate::naming;
use crate::types::{CachedFileDescriptor, LockStats, SweepReport};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub struct ModFileCache {
    config: CacheConfig,
    lock: Arc<DiskLock>,
    /// Set once the startup sweep has finished
    startup_sweep: OnceCell<SweepReport>,
}

impl ModFileCache {
    /// Create a cache sharing the process-wide disk lock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_lock(config, DiskLock::global())
    }

    pub fn with_lock(config: CacheConfig, lock: Arc<DiskLock>) -> Self {
        Self {
            config,
            lock,
            startup_sweep: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    /// Create the cache root if needed and run the startup sweep.
    ///
    /// The sweep runs once per cache; concurrent callers wait for that run and later
    /// calls return its report. Sweep failures are logged and recorded in the report,
    /// never returned as errors.
    pub async fn init(&self) -> &SweepReport {
        self.startup_sweep
            .get_or_init(|| async move {
                if let Err(e) = fs::create_dir_all(self.cache_dir()).await {
                    warn!(cache_dir = ?self.cache_dir(), error = %e, "Could not create cache directory");
                }
                info!(
                    cache_dir = ?self.cache_dir(),
                    lifetime_days = self.config.lifetime_days,
                    "Cache initialized, sweeping unused files"
                );
                self.sweep(Local::now()).await
            })
            .await
    }

    /// Whether the startup sweep has completed
    pub fn is_initialized(&self) -> bool {
        self.startup_sweep.initialized()
    }

    /// Path the entry for `descriptor` lives at. Pure, no I/O.
    pub fn cached_file_path(&self, descriptor: &CachedFileDescriptor) -> PathBuf {
        naming::cached_file_path(self.cache_dir(), descriptor)
    }

    /// True if a regular file exists at the entry's path.
    ///
    /// Not locked; the entry may still vanish before a following copy.
    pub async fn is_cached(&self, descriptor: &CachedFileDescriptor) -> bool {
        fs::metadata(self.cached_file_path(descriptor))
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false)
    }

    /// Copy the cached file for `descriptor` to `target`, overwriting it
    pub async fn copy_from_cache(
        &self,
        descriptor: &CachedFileDescriptor,
        target: &Path,
    ) -> Result<u64> {
        let cache_path = self.cached_file_path(descriptor);
        self.copy_cached_file(&cache_path, target).await
    }

    /// Copy an already resolved cache file to `target`, overwriting it.
    ///
    /// Missing parent directories of `target` are created.
    pub async fn copy_cached_file(&self, cache_path: &Path, target: &Path) -> Result<u64> {
        let _guard = self.lock().await?;

        let metadata = fs::metadata(cache_path)
            .await
            .map_err(|e| CacheError::from_cache_access(cache_path, e))?;
        if !metadata.is_file() {
            return Err(CacheError::NotFound(cache_path.to_path_buf()));
        }

        create_parent_dirs(target)
            .await
            .map_err(|e| CacheError::io(target, e))?;
        let copied = copy_replacing(cache_path, target)
            .await
            .map_err(|e| CacheError::io(target, e))?;

        self.mark_used(cache_path).await;
        debug!(cache_path = %cache_path.display(), target = %target.display(), bytes = copied, "Copied file from cache");

        Ok(copied)
    }

    /// Copy `source` into the cache as the entry for `descriptor`.
    ///
    /// Returns the entry's path. An existing entry is replaced.
    pub async fn store(&self, descriptor: &CachedFileDescriptor, source: &Path) -> Result<PathBuf> {
        let cache_path = self.cached_file_path(descriptor);
        let _guard = self.lock().await?;

        create_parent_dirs(&cache_path)
            .await
            .map_err(|e| CacheError::io(&cache_path, e))?;
        let copied = copy_replacing(source, &cache_path)
            .await
            .map_err(|e| CacheError::io(source, e))?;

        self.mark_used(&cache_path).await;
        debug!(cache_path = %cache_path.display(), bytes = copied, "Stored file in cache");

        Ok(cache_path)
    }

    /// Delete the entry for `descriptor`. Returns false if there was none.
    pub async fn remove(&self, descriptor: &CachedFileDescriptor) -> Result<bool> {
        let cache_path = self.cached_file_path(descriptor);
        let _guard = self.lock().await?;

        match fs::remove_file(&cache_path).await {
            Ok(()) => {
                debug!(cache_path = %cache_path.display(), "Removed cached file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(cache_path, e)),
        }
    }

    pub fn lock_stats(&self) -> LockStats {
        self.lock.stats()
    }

    pub(crate) async fn lock(&self) -> Result<DiskLockGuard<'_>> {
        match self.config.lock_timeout {
            Some(timeout) => self.lock.acquire_timeout(timeout).await,
            None => Ok(self.lock.acquire().await),
        }
    }

    /// Stamp the entry's access time so eviction sees the use even on mounts that do
    /// not record reads.
    async fn mark_used(&self, cache_path: &Path) {
        if let Err(e) = set_accessed(cache_path, SystemTime::now()).await {
            warn!(cache_path = %cache_path.display(), error = %e, "Failed to update access time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn icbm() -> CachedFileDescriptor {
        CachedFileDescriptor::new("fa", "123", "7", "abc123", "icbm.zip")
    }

    fn new_cache(dir: &TempDir) -> ModFileCache {
        ModFileCache::with_lock(
            CacheConfig::new(dir.path().join("cache"), 30),
            Arc::new(DiskLock::new()),
        )
    }

    fn write_source(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_is_cached_after_store() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"archive");

        assert!(!cache.is_cached(&icbm()).await);

        let stored = cache.store(&icbm(), &source).await.unwrap();
        assert_eq!(stored, dir.path().join("cache/fa/123.7.abc123.icbm.zip"));
        assert!(cache.is_cached(&icbm()).await);
        assert_eq!(std::fs::read(&stored).unwrap(), b"archive");
    }

    #[tokio::test]
    async fn test_directory_is_not_cached() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        std::fs::create_dir_all(cache.cached_file_path(&icbm())).unwrap();

        assert!(!cache.is_cached(&icbm()).await);
    }

    #[tokio::test]
    async fn test_copy_overwrites_and_creates_parents() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"fresh bytes");
        cache.store(&icbm(), &source).await.unwrap();

        let target = dir.path().join("game/gamedata/mods/nested/icbm.zip");
        let copied = cache.copy_from_cache(&icbm(), &target).await.unwrap();
        assert_eq!(copied, 11);
        assert_eq!(std::fs::read(&target).unwrap(), b"fresh bytes");

        std::fs::write(&target, b"stale").unwrap();
        cache.copy_from_cache(&icbm(), &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"fresh bytes");
    }

    #[tokio::test]
    async fn test_copy_from_explicit_path() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"data");
        let cache_path = cache.store(&icbm(), &source).await.unwrap();

        let target = dir.path().join("out/icbm.zip");
        cache.copy_cached_file(&cache_path, &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_store_keeps_entry_named_like_a_staging_file() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let partial = CachedFileDescriptor::new("fa", "123", "7", "abc123", "icbm.zip.partial");
        let first = write_source(&dir, "first.zip", b"first entry");
        let second = write_source(&dir, "second.zip", b"second entry");

        let partial_path = cache.store(&partial, &first).await.unwrap();
        cache.store(&icbm(), &second).await.unwrap();

        assert!(cache.is_cached(&partial).await);
        assert_eq!(std::fs::read(&partial_path).unwrap(), b"first entry");
        assert_eq!(
            std::fs::read(cache.cached_file_path(&icbm())).unwrap(),
            b"second entry"
        );
    }

    #[tokio::test]
    async fn test_copy_out_keeps_neighbouring_user_file() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"archive");
        cache.store(&icbm(), &source).await.unwrap();

        std::fs::create_dir_all(dir.path().join("game")).unwrap();
        let user_file = write_source(&dir, "game/icbm.zip.partial", b"user data");

        cache
            .copy_from_cache(&icbm(), &dir.path().join("game/icbm.zip"))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&user_file).unwrap(), b"user data");
        assert_eq!(std::fs::read(dir.path().join("game/icbm.zip")).unwrap(), b"archive");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_only_entry_can_be_copied_out() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"archive");
        let cache_path = cache.store(&icbm(), &source).await.unwrap();

        let mut permissions = std::fs::metadata(&cache_path).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&cache_path, permissions).unwrap();

        let target = dir.path().join("game/icbm.zip");
        cache.copy_from_cache(&icbm(), &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"archive");
    }

    #[tokio::test]
    async fn test_copy_missing_entry_is_not_found() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);

        let err = cache
            .copy_from_cache(&icbm(), &dir.path().join("out/icbm.zip"))
            .await
            .unwrap_err();
        match err {
            CacheError::NotFound(path) => assert_eq!(path, cache.cached_file_path(&icbm())),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_copy_fails_when_target_parent_is_a_file() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"data");
        cache.store(&icbm(), &source).await.unwrap();
        let blocker = write_source(&dir, "blocker", b"");

        let err = cache
            .copy_from_cache(&icbm(), &blocker.join("sub/icbm.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }

    #[tokio::test]
    async fn test_lock_released_on_success_and_failure() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"data");
        cache.store(&icbm(), &source).await.unwrap();
        let missing = CachedFileDescriptor::new("fa", "999", "1", "ffff", "gone.zip");

        for i in 0..5 {
            let target = dir.path().join(format!("out/{i}.zip"));
            cache.copy_from_cache(&icbm(), &target).await.unwrap();
            assert!(cache.copy_from_cache(&missing, &target).await.is_err());
        }

        let stats = cache.lock_stats();
        // one store plus ten copies
        assert_eq!(stats.acquisitions, 11);
        assert_eq!(stats.acquisitions, stats.releases);
    }

    #[tokio::test]
    async fn test_lock_timeout_surfaces_as_error() {
        let dir = tempdir().unwrap();
        let lock = Arc::new(DiskLock::new());
        let cache = ModFileCache::with_lock(
            CacheConfig::new(dir.path().join("cache"), 30)
                .with_lock_timeout(Duration::from_millis(20)),
            lock.clone(),
        );

        let held = lock.acquire().await;
        let err = cache
            .copy_from_cache(&icbm(), &dir.path().join("out.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::LockTimeout(_)));
        drop(held);

        let stats = cache.lock_stats();
        assert_eq!(stats.acquisitions, 1);
        assert_eq!(stats.releases, 1);
    }

    #[tokio::test]
    async fn test_copy_refreshes_access_time() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"data");
        let cache_path = cache.store(&icbm(), &source).await.unwrap();

        let long_ago = SystemTime::now() - Duration::from_secs(90 * 24 * 60 * 60);
        set_accessed(&cache_path, long_ago).await.unwrap();

        cache
            .copy_from_cache(&icbm(), &dir.path().join("out.zip"))
            .await
            .unwrap();

        let accessed = std::fs::metadata(&cache_path).unwrap().accessed().unwrap();
        assert!(accessed > long_ago + Duration::from_secs(24 * 60 * 60));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        let source = write_source(&dir, "download.zip", b"data");
        cache.store(&icbm(), &source).await.unwrap();

        assert!(cache.remove(&icbm()).await.unwrap());
        assert!(!cache.is_cached(&icbm()).await);
        assert!(!cache.remove(&icbm()).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_copies_to_different_targets() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(new_cache(&dir));
        let payload = vec![7u8; 256 * 1024];
        let source = write_source(&dir, "download.zip", &payload);
        cache.store(&icbm(), &source).await.unwrap();

        let targets = [dir.path().join("a/icbm.zip"), dir.path().join("b/icbm.zip")];
        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|target| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.copy_from_cache(&icbm(), &target).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), payload.len() as u64);
        }
        for target in &targets {
            assert_eq!(std::fs::read(target).unwrap(), payload);
        }

        let stats = cache.lock_stats();
        assert_eq!(stats.acquisitions, 3);
        assert_eq!(stats.releases, 3);
    }

    #[tokio::test]
    async fn test_init_creates_root_once() {
        let dir = tempdir().unwrap();
        let cache = new_cache(&dir);
        assert!(!cache.is_initialized());

        let report = cache.init().await;
        assert!(report.is_clean());
        assert_eq!(report.scanned, 0);
        assert!(cache.is_initialized());
        assert!(cache.cache_dir().is_dir());

        let first: *const SweepReport = cache.init().await;
        let second: *const SweepReport = cache.init().await;
        assert_eq!(first, second);
    }
}
