//! Cache types

use crate::error::SweepError;
use serde::{Deserialize, Serialize};

/// Identity of a featured mod file, as handed out by the file API.
///
/// The five fields are the only inputs to path derivation, so two descriptors that
/// compare equal always map to the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedFileDescriptor {
    group: String,
    id: String,
    version: String,
    #[serde(alias = "md5")]
    content_hash: String,
    name: String,
}

impl CachedFileDescriptor {
    pub fn new(
        group: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
        content_hash: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
            version: version.into(),
            content_hash: content_hash.into(),
            name: name.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Fields recovered from an encoded cache file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFileName {
    pub id: String,
    pub version: String,
    pub content_hash: String,
    pub name: String,
}

/// Counters kept by the disk lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStats {
    pub acquisitions: u64,
    pub releases: u64,
}

/// Outcome of one sweep over the cache tree
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Regular files evaluated
    pub scanned: usize,
    pub evicted: usize,
    pub retained: usize,
    pub bytes_reclaimed: u64,
    pub failures: Vec<SweepError>,
}

impl SweepReport {
    /// True when the cache root could not be walked at all
    pub fn is_aborted(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f, SweepError::Aborted { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
