use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CACHE_DIR: &str = "./cache/featured-mods";
const DEFAULT_LIFETIME_DAYS: u32 = 30;

/// Cache configuration, captured once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory of the cache tree
    pub cache_dir: PathBuf,
    /// Files not accessed for this many days are evicted by the startup sweep.
    /// `0` evicts everything last accessed before the sweep started.
    pub lifetime_days: u32,
    /// Upper bound on waiting for the disk lock; `None` waits indefinitely
    pub lock_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            lifetime_days: DEFAULT_LIFETIME_DAYS,
            lock_timeout: None,
        }
    }
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>, lifetime_days: u32) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            lifetime_days,
            lock_timeout: None,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let cache_dir = env::var("MOD_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR));

        let lifetime_days = env::var("MOD_CACHE_LIFETIME_DAYS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_LIFETIME_DAYS);

        let lock_timeout = env::var("MOD_CACHE_LOCK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Self {
            cache_dir,
            lifetime_days,
            lock_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from("./cache/featured-mods"));
        assert_eq!(config.lifetime_days, 30);
        assert_eq!(config.lock_timeout, None);
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::new("/tmp/mods", 0).with_lock_timeout(Duration::from_secs(2));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/mods"));
        assert_eq!(config.lifetime_days, 0);
        assert_eq!(config.lock_timeout, Some(Duration::from_secs(2)));
    }
}
