//! Platform-specific path utilities.
//!
//! This module provides:
//! - Default HuggingFace cache locations (honoring the `HF_*` variables)
//! - The configuration directory for persisted registrations
//! - Path normalization used for every path comparison in the engine

use crate::config::PathsConfig;
use crate::error::{InventoryError, Result};
use std::path::{Component, Path, PathBuf};

/// Get the default HuggingFace hub cache directory.
///
/// Checks in order:
/// 1. `$HF_HUB_CACHE`
/// 2. `$HF_HOME/hub`
/// 3. `$XDG_CACHE_HOME/huggingface/hub`
/// 4. `~/.cache/huggingface/hub`
pub fn default_hub_cache() -> Option<PathBuf> {
    if let Some(dir) = env_path("HF_HUB_CACHE") {
        return Some(dir);
    }
    huggingface_home().map(|home| home.join(PathsConfig::HUB_DIR_NAME))
}

/// Get the default HuggingFace datasets cache directory.
///
/// Same resolution as [`default_hub_cache`], with `$HF_DATASETS_CACHE` first.
pub fn default_datasets_cache() -> Option<PathBuf> {
    if let Some(dir) = env_path("HF_DATASETS_CACHE") {
        return Some(dir);
    }
    huggingface_home().map(|home| home.join(PathsConfig::DATASETS_DIR_NAME))
}

fn huggingface_home() -> Option<PathBuf> {
    if let Some(home) = env_path("HF_HOME") {
        return Some(home);
    }
    if let Some(xdg) = env_path("XDG_CACHE_HOME") {
        return Some(xdg.join(PathsConfig::HF_DIR_NAME));
    }
    dirs::home_dir().map(|h| h.join(".cache").join(PathsConfig::HF_DIR_NAME))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Get the directory holding `config.json`.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/hf-model-tool`
/// - **macOS**: `~/Library/Application Support/hf-model-tool`
/// - **Windows**: `%APPDATA%\hf-model-tool`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| InventoryError::Config {
        message: "Could not determine configuration directory".to_string(),
    })?;
    Ok(base.join(PathsConfig::CONFIG_DIR_NAME))
}

/// Get the default registration file path.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(PathsConfig::CONFIG_FILENAME))
}

/// Normalize a path for storage and comparison.
///
/// Existing paths are canonicalized (symlinks resolved). Paths that cannot
/// be canonicalized are cleaned lexically: `.` components and trailing
/// separators are dropped and `..` pops the previous component.
pub fn normalize_path(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => lexical_clean(path),
    }
}

/// Absolute, lexically cleaned form of a path. Symlinks are kept, so two
/// aliases of one directory stay distinct.
pub fn clean_path(path: &Path) -> PathBuf {
    match std::path::absolute(path) {
        Ok(absolute) => lexical_clean(&absolute),
        Err(_) => lexical_clean(path),
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Comparison key for a path.
///
/// Normalizes the path, then folds case on platforms whose default
/// filesystems are case-insensitive.
pub fn path_key(path: &Path) -> String {
    let normalized = normalize_path(path).to_string_lossy().to_string();
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        normalized.to_lowercase()
    } else {
        normalized
    }
}

/// Number of normal components in the normalized path; deeper roots are
/// more specific.
pub fn path_depth(path: &Path) -> usize {
    normalize_path(path)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lexical_clean_strips_dots_and_trailing_separators() {
        let cleaned = lexical_clean(Path::new("/data/./custom/../hub/"));
        assert_eq!(cleaned, PathBuf::from("/data/hub"));
    }

    #[test]
    fn test_normalize_missing_path_is_lexical() {
        let path = Path::new("/definitely/not/here/../there/");
        assert_eq!(normalize_path(path), PathBuf::from("/definitely/not/there"));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_path_keeps_symlinks() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("hub");
        std::fs::create_dir(&real).unwrap();
        let link = temp.path().join("hub-link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let dotted = temp.path().join(".").join("hub-link").join("");
        assert_eq!(clean_path(&dotted), lexical_clean(&link));
        assert_ne!(clean_path(&link), clean_path(&real));
        assert!(clean_path(Path::new("relative/dir")).is_absolute());
    }

    #[test]
    fn test_path_key_ignores_trailing_slash() {
        let temp = TempDir::new().unwrap();
        let with_slash = format!("{}/", temp.path().display());
        assert_eq!(path_key(Path::new(&with_slash)), path_key(temp.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_path_key_resolves_symlinks() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("hub");
        std::fs::create_dir(&real).unwrap();
        let link = temp.path().join("hub-link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(path_key(&link), path_key(&real));
    }

    #[test]
    fn test_path_depth() {
        assert!(path_depth(Path::new("/a/b/c")) > path_depth(Path::new("/a/b")));
    }

    #[test]
    fn test_expand_home() {
        let plain = Path::new("/abs/path");
        assert_eq!(expand_home(plain), plain.to_path_buf());
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/models")), home.join("models"));
        }
    }
}
