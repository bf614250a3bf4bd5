//! Filesystem removal seam used by deletes.

use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

/// Removes an artifact from disk.
pub trait AssetRemover {
    /// Remove `path` and everything under it.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Recursive removal on the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl AssetRemover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        // symlink_metadata so a linked artifact removes the link, not its target
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        info!("Removed {}", path.display());
        Ok(())
    }
}
