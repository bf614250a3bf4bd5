//! Cycle-safe size and mtime measurement for an artifact directory.
//!
//! Symlinks are followed, but every directory and file is identified by its
//! filesystem identity (device + inode on Unix, canonical path elsewhere):
//! a directory already entered is never entered again, and a file reached
//! through several links is counted once. Snapshot symlinks into `blobs/`
//! therefore add nothing on top of the blobs themselves.

use crate::inventory::types::{FailureKind, SoftFailure};
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::Path;
#[cfg(not(unix))]
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Size and timestamp of one artifact.
#[derive(Debug, Clone, Default)]
pub struct Measurement {
    pub size_bytes: u64,
    pub file_count: usize,
    /// Latest mtime among counted files.
    pub modified: Option<SystemTime>,
    pub failures: Vec<SoftFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FileKey {
    #[cfg(unix)]
    Inode(u64, u64),
    #[cfg(not(unix))]
    Path(PathBuf),
}

#[cfg(unix)]
fn file_key(_path: &Path, meta: &Metadata) -> FileKey {
    use std::os::unix::fs::MetadataExt;
    FileKey::Inode(meta.dev(), meta.ino())
}

#[cfg(not(unix))]
fn file_key(path: &Path, _meta: &Metadata) -> FileKey {
    FileKey::Path(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
}

/// Measure every regular file reachable under `dir`.
pub fn measure(dir: &Path) -> Measurement {
    measure_all(&[dir])
}

/// Measure several trees as one artifact; identities are shared across them.
pub fn measure_all(dirs: &[&Path]) -> Measurement {
    let mut visited_dirs: HashSet<FileKey> = HashSet::new();
    let mut seen_files: HashSet<FileKey> = HashSet::new();
    let mut measurement = Measurement::default();
    for dir in dirs {
        walk_into(dir, &mut visited_dirs, &mut seen_files, &mut measurement);
    }
    measurement
}

fn walk_into(
    dir: &Path,
    visited_dirs: &mut HashSet<FileKey>,
    seen_files: &mut HashSet<FileKey>,
    measurement: &mut Measurement,
) {
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            match entry.metadata() {
                Ok(meta) => visited_dirs.insert(file_key(entry.path(), &meta)),
                Err(_) => true,
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf());
                if err.loop_ancestor().is_some() {
                    debug!("Skipping symlink loop at {}", path.display());
                    continue;
                }
                match err.io_error() {
                    Some(io) if io.kind() == std::io::ErrorKind::NotFound => {
                        // Dangling snapshot links are common for interrupted downloads
                        debug!("Skipping dangling entry {}", path.display());
                    }
                    Some(io) => measurement.failures.push(SoftFailure::from_io(path, io)),
                    None => measurement.failures.push(SoftFailure::new(
                        path,
                        FailureKind::Io,
                        err.to_string(),
                    )),
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                if let Some(io) = err.io_error() {
                    measurement
                        .failures
                        .push(SoftFailure::from_io(entry.path(), io));
                }
                continue;
            }
        };

        if !seen_files.insert(file_key(entry.path(), &meta)) {
            continue;
        }

        measurement.size_bytes += meta.len();
        measurement.file_count += 1;
        if let Ok(modified) = meta.modified() {
            if measurement.modified.map_or(true, |m| modified > m) {
                measurement.modified = Some(modified);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sums_regular_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("a.bin"), vec![0u8; 100]).unwrap();
        fs::write(temp.path().join("sub").join("b.bin"), vec![0u8; 50]).unwrap();

        let m = measure(temp.path());
        assert_eq!(m.size_bytes, 150);
        assert_eq!(m.file_count, 2);
        assert!(m.modified.is_some());
        assert!(m.failures.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_blobs_counted_once() {
        let temp = TempDir::new().unwrap();
        let blobs = temp.path().join("blobs");
        let snapshot = temp.path().join("snapshots").join("abc123");
        fs::create_dir_all(&blobs).unwrap();
        fs::create_dir_all(&snapshot).unwrap();
        fs::write(blobs.join("deadbeef"), vec![0u8; 100]).unwrap();
        std::os::unix::fs::symlink("../../blobs/deadbeef", snapshot.join("model.safetensors"))
            .unwrap();

        assert_eq!(measure(temp.path()).size_bytes, 100);
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlinks_counted_once() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), vec![0u8; 64]).unwrap();
        fs::hard_link(temp.path().join("a.bin"), temp.path().join("b.bin")).unwrap();

        assert_eq!(measure(temp.path()).size_bytes, 64);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_terminates() {
        let temp = TempDir::new().unwrap();
        let inner = temp.path().join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(inner.join("w.bin"), vec![0u8; 10]).unwrap();
        std::os::unix::fs::symlink(temp.path(), inner.join("back-to-root")).unwrap();
        std::os::unix::fs::symlink(&inner, temp.path().join("inner-again")).unwrap();

        let m = measure(temp.path());
        assert_eq!(m.size_bytes, 10);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_is_not_a_failure() {
        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("broken")).unwrap();
        fs::write(temp.path().join("ok.bin"), vec![0u8; 5]).unwrap();

        let m = measure(temp.path());
        assert_eq!(m.size_bytes, 5);
        assert!(m.failures.is_empty());
    }
}
