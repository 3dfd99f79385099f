//! Error types for the mod file cache

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Errors returned synchronously to callers of cache operations
#[derive(Debug)]
pub enum CacheError {
    /// The cache file was absent when the operation touched it
    NotFound(PathBuf),
    /// A filesystem call failed on `path`
    Io {
        path: PathBuf,
        source: Box<io::Error>,
    },
    /// The disk lock could not be acquired within the configured timeout
    LockTimeout(Duration),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Maps a failed access to a cache file, turning `NotFound` into [`CacheError::NotFound`]
    pub(crate) fn from_cache_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            CacheError::NotFound(path)
        } else {
            CacheError::io(path, source)
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound(path) => write!(f, "Cached file not found: {}", path.display()),
            CacheError::Io { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
            CacheError::LockTimeout(timeout) => {
                write!(f, "Timed out after {:?} waiting for the disk lock", timeout)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Which step of the per-file sweep failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStage {
    Enumerate,
    Lock,
    Inspect,
    Delete,
}

impl fmt::Display for SweepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            SweepStage::Enumerate => "enumerate",
            SweepStage::Lock => "lock",
            SweepStage::Inspect => "inspect",
            SweepStage::Delete => "delete",
        };
        f.write_str(stage)
    }
}

/// Non-fatal failures recorded by the startup sweep.
///
/// These never propagate past [`crate::ModFileCache::init`]; they are collected in the
/// [`crate::SweepReport`] and logged.
#[derive(Debug)]
pub enum SweepError {
    /// A single entry (or subdirectory) could not be handled; the walk went on
    Partial {
        path: PathBuf,
        stage: SweepStage,
        source: Box<io::Error>,
    },
    /// The cache root itself could not be enumerated; nothing was evaluated
    Aborted { root: PathBuf, source: Box<io::Error> },
}

impl SweepError {
    pub(crate) fn partial(path: impl Into<PathBuf>, stage: SweepStage, source: io::Error) -> Self {
        SweepError::Partial {
            path: path.into(),
            stage,
            source: Box::new(source),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            SweepError::Partial { path, .. } => path,
            SweepError::Aborted { root, .. } => root,
        }
    }
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Partial {
                path,
                stage,
                source,
            } => write!(
                f,
                "Sweep could not {} {}: {}",
                stage,
                path.display(),
                source
            ),
            SweepError::Aborted { root, source } => {
                write!(f, "Sweep of {} aborted: {}", root.display(), source)
            }
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::Partial { source, .. } => Some(source.as_ref()),
            SweepError::Aborted { source, .. } => Some(source.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_not_found_display() {
        let err = CacheError::NotFound(PathBuf::from("/cache/fa/1.2.abc.x.zip"));
        assert_eq!(
            format!("{}", err),
            "Cached file not found: /cache/fa/1.2.abc.x.zip"
        );
    }

    #[test]
    fn test_cache_access_maps_not_found() {
        let err = CacheError::from_cache_access(
            "/cache/missing",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, CacheError::NotFound(_)));

        let err = CacheError::from_cache_access(
            "/cache/denied",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, CacheError::Io { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_lock_timeout_display() {
        let err = CacheError::LockTimeout(Duration::from_secs(5));
        assert_eq!(
            format!("{}", err),
            "Timed out after 5s waiting for the disk lock"
        );
    }

    #[test]
    fn test_sweep_partial_display() {
        let err = SweepError::partial(
            "/cache/fa/file",
            SweepStage::Delete,
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );
        assert_eq!(
            format!("{}", err),
            "Sweep could not delete /cache/fa/file: read-only"
        );
        assert_eq!(err.path(), std::path::Path::new("/cache/fa/file"));
    }

    #[test]
    fn test_sweep_aborted_has_source() {
        let err = SweepError::Aborted {
            root: PathBuf::from("/cache"),
            source: Box::new(io::Error::new(io::ErrorKind::NotFound, "missing")),
        };
        assert!(format!("{}", err).contains("aborted"));
        assert!(err.source().is_some());
    }
}
