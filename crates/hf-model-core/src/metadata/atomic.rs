//! Atomic file operations for JSON sidecars and the registration file.
//!
//! Writes go through a temp file next to the target:
//! 1. Serialize and validate the JSON
//! 2. Write to `<target>.<pid>.<tid>.tmp` and fsync
//! 3. Optionally copy the previous target to `.bak`
//! 4. Rename over the target
//!
//! A crash at any point leaves either the old file or the new one in place.

use crate::{InventoryError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use tracing::{debug, warn};

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if reading or
/// parsing fails.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(InventoryError::io_with_path(e, path)),
    };

    let data: T = serde_json::from_str(&contents).map_err(|e| InventoryError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T, keep_backup: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| InventoryError::io_with_path(e, parent))?;
        }
    }

    let serialized = serde_json::to_string_pretty(data).map_err(|e| InventoryError::Json {
        message: format!("Failed to serialize data: {}", e),
        source: Some(e),
    })?;

    serde_json::from_str::<serde_json::Value>(&serialized).map_err(|e| InventoryError::Json {
        message: format!("JSON validation failed: {}", e),
        source: Some(e),
    })?;

    let temp_path = temp_path_for(path);
    if let Err(e) = write_synced(&temp_path, serialized.as_bytes()) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if keep_backup && path.exists() {
        let backup_path = backup_path_for(path);
        if let Err(e) = fs::copy(path, &backup_path) {
            // Continue anyway - backup failure is not fatal
            warn!("Failed to create backup {}: {}", backup_path.display(), e);
        } else {
            debug!("Created backup: {}", backup_path.display());
        }
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(InventoryError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn write_synced(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| InventoryError::io_with_path(e, temp_path))?;

    file.write_all(bytes)
        .map_err(|e| InventoryError::io_with_path(e, temp_path))?;
    file.flush()
        .map_err(|e| InventoryError::io_with_path(e, temp_path))?;
    file.sync_all()
        .map_err(|e| InventoryError::io_with_path(e, temp_path))?;
    Ok(())
}

/// `<name>.<pid>.<tid>.tmp` in the target's directory.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "data.json".to_string());
    path.with_file_name(format!("{}.{}.{}.tmp", file_name, process::id(), thread_id()))
}

fn backup_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "data.json".to_string());
    path.with_file_name(format!("{}.bak", file_name))
}

fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    format!("{:?}", thread::current().id()).hash(&mut hasher);
    hasher.finish()
}
