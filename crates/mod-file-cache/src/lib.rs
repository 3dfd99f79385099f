//! Disk-backed cache for featured mod files
//!
//! Files are stored under `<root>/<group>/<id>.<version>.<hash>.<name>` so a file already
//! downloaded for a given mod version and checksum is copied from disk instead of
//! fetched again. A startup sweep evicts files that have not been accessed within the
//! configured number of days. All disk access is serialized by a process-wide lock.

mod cache;
pub mod config;
pub mod error;
mod fsops;
pub mod lock;
pub mod naming;
mod sweep;
mod types;

pub use cache::ModFileCache;
pub use config::CacheConfig;
pub use error::{CacheError, Result, SweepError, SweepStage};
pub use lock::{DiskLock, DiskLockGuard};
pub use naming::{cached_file_path, parse_cached_file_name, read_hash};
pub use sweep::is_expired;
pub use types::{CachedFileDescriptor, CachedFileName, LockStats, SweepReport};
