//! Name heuristics for discovered artifacts.
//!
//! Cache directories encode `<category>--<publisher>--<name>`; custom and
//! LoRA directories only have their basename (plus, occasionally, a
//! `_name_or_path` hint in `config.json`).

use crate::config::LayoutConfig;
use crate::inventory::types::{AssetKind, CacheName};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// `models--...` / `datasets--...`, case-insensitive prefix.
static CACHE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(models|datasets)--(.+)$").unwrap());

/// Publisher used for cache repos without an owner segment (e.g. `models--gpt2`).
pub const UNKNOWN_PUBLISHER: &str = "unknown";

/// Decode a cache directory name.
///
/// # Examples
///
/// ```
/// use hf_model_core::inventory::naming::parse_cache_name;
/// use hf_model_core::AssetKind;
///
/// let parsed = parse_cache_name("models--BAAI--bge-small-en-v1.5").unwrap();
/// assert_eq!(parsed.kind, AssetKind::CacheModel);
/// assert_eq!(parsed.repo_id(), "BAAI/bge-small-en-v1.5");
/// assert!(parse_cache_name("ckpt-500").is_none());
/// ```
pub fn parse_cache_name(dir_name: &str) -> Option<CacheName> {
    let captures = CACHE_NAME.captures(dir_name)?;
    let category = captures.get(1)?.as_str().to_lowercase();
    let rest = captures.get(2)?.as_str();

    let kind = if category == LayoutConfig::DATASETS_PREFIX {
        AssetKind::CacheDataset
    } else {
        AssetKind::CacheModel
    };

    let (publisher, name) = match rest.split_once(LayoutConfig::CACHE_SEPARATOR) {
        Some((publisher, name)) if !publisher.is_empty() && !name.is_empty() => {
            (publisher.to_string(), name.to_string())
        }
        Some(_) => return None,
        None => (UNKNOWN_PUBLISHER.to_string(), rest.to_string()),
    };

    Some(CacheName {
        kind,
        publisher,
        name,
    })
}

/// Whether a directory name follows the cache naming convention.
pub fn is_cache_name(dir_name: &str) -> bool {
    parse_cache_name(dir_name).is_some()
}

/// Derive `(name, publisher)` for a custom or LoRA directory.
///
/// 1. `publisher--name` basenames split like cache names
/// 2. `_name_or_path: "org/model"` in `config.json` supplies the publisher
/// 3. Otherwise the publisher is [`LayoutConfig::LOCAL_PUBLISHER`]
pub fn local_names(dir: &Path) -> (String, String) {
    let basename = basename(dir);

    if let Some((publisher, name)) = basename.split_once(LayoutConfig::CACHE_SEPARATOR) {
        if !publisher.is_empty() && !name.is_empty() {
            return (name.to_string(), publisher.to_string());
        }
    }

    if let Some(publisher) = config_publisher(dir) {
        return (basename, publisher);
    }

    (basename, LayoutConfig::LOCAL_PUBLISHER.to_string())
}

fn config_publisher(dir: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(dir.join("config.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    let name_or_path = value.get("_name_or_path")?.as_str()?;

    // Absolute or relative filesystem paths are not repo ids
    if name_or_path.starts_with('/') || name_or_path.starts_with('.') || name_or_path.contains('\\')
    {
        return None;
    }

    match name_or_path.split_once('/') {
        Some((owner, rest)) if !owner.is_empty() && !rest.is_empty() && !rest.contains('/') => {
            Some(owner.to_string())
        }
        _ => None,
    }
}

/// Final path segment as a string.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Format bytes as a human-readable string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
