//! Filesystem helpers shared by copy-in, copy-out and the sweep

use std::io;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

/// Copy `source` over `target`, replacing any existing file.
///
/// Bytes land in a freshly created, uniquely named file next to `target` and are
/// renamed into place, so `target` is either the old content or the complete new
/// content, and no other file in that directory is touched. The staged file is
/// created with default permissions rather than the source's.
pub(crate) async fn copy_replacing(source: &Path, target: &Path) -> io::Result<u64> {
    let source = source.to_path_buf();
    let target = target.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut reader = std::fs::File::open(&source)?;
        // dropped (and deleted) on any early return
        let mut staged = tempfile::Builder::new()
            .prefix(".mod-cache-")
            .suffix(".partial")
            .tempfile_in(dir)?;
        let copied = io::copy(&mut reader, staged.as_file_mut())?;
        staged.persist(&target).map_err(|e| e.error)?;

        Ok(copied)
    })
    .await
    .map_err(io::Error::other)?
}

/// Create `path`'s parent directory (any depth) if it has one
pub(crate) async fn create_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

/// Overwrite the last-access time of `path`, leaving its modification time alone
pub(crate) async fn set_accessed(path: &Path, at: SystemTime) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        // futimens only needs ownership, so a read-only entry can still be stamped
        #[cfg(unix)]
        let file = std::fs::File::open(&path)?;
        #[cfg(not(unix))]
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        file.set_times(std::fs::FileTimes::new().set_accessed(at))
    })
    .await
    .map_err(io::Error::other)?
}
