//! Layout classification.
//!
//! Rules for a single directory, first match wins:
//!
//! 1. cache-named (`models--org--name` / `datasets--org--name`) with
//!    `snapshots/` and `blobs/` subtrees → cache model / dataset
//! 2. adapter config + adapter weights, in the directory or in one of its
//!    immediate subdirectories → LoRA adapter
//! 3. model config + at least one weights file → custom model
//! 4. the declared type of the root, when it forces a kind
//!
//! Whole roots are classified by proportion: more than half of the
//! immediate subdirectories cache-named means a cache root.

use crate::config::LayoutConfig;
use crate::inventory::naming::{basename, is_cache_name, parse_cache_name};
use crate::inventory::types::{AssetKind, Classification, DeclaredType, RootLayout};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Immediate children of a directory, symlinks resolved.
#[derive(Debug, Default)]
pub(crate) struct Listing {
    pub files: Vec<String>,
    pub dirs: Vec<PathBuf>,
}

impl Listing {
    pub fn read(dir: &Path) -> io::Result<Self> {
        let mut listing = Listing::default();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            // fs::metadata follows symlinks; dangling links are ignored
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            if meta.is_dir() {
                listing.dirs.push(path);
            } else if meta.is_file() {
                listing
                    .files
                    .push(entry.file_name().to_string_lossy().to_string());
            }
        }
        listing.files.sort();
        listing.dirs.sort();
        Ok(listing)
    }

    fn has_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f == name)
    }

    fn has_weights(&self) -> bool {
        self.files.iter().any(|f| is_weights_file(f))
    }

    fn has_adapter(&self) -> bool {
        self.has_file(LayoutConfig::ADAPTER_CONFIG_FILE)
            && self.files.iter().any(|f| {
                is_weights_file(f)
                    && Path::new(f)
                        .file_stem()
                        .is_some_and(|s| s == LayoutConfig::ADAPTER_WEIGHTS_STEM)
            })
    }

    fn has_model(&self) -> bool {
        LayoutConfig::MODEL_CONFIG_FILES
            .iter()
            .any(|config| self.has_file(config))
            && self.has_weights()
    }
}

fn is_weights_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            LayoutConfig::WEIGHTS_EXTENSIONS
                .iter()
                .any(|w| ext.eq_ignore_ascii_case(w))
        })
}

/// Rule 1: cache naming plus snapshot/blob structure.
fn cache_kind(dir: &Path) -> Option<AssetKind> {
    let parsed = parse_cache_name(&basename(dir))?;
    let structured = dir.join(LayoutConfig::SNAPSHOTS_DIR).is_dir()
        && dir.join(LayoutConfig::BLOBS_DIR).is_dir();
    structured.then_some(parsed.kind)
}

/// Rules 1-3 applied to the directory's own contents only.
pub(crate) fn classify_direct(dir: &Path, listing: &Listing) -> Option<AssetKind> {
    if let Some(kind) = cache_kind(dir) {
        return Some(kind);
    }
    if listing.has_adapter() {
        return Some(AssetKind::LoraAdapter);
    }
    if listing.has_model() {
        return Some(AssetKind::CustomModel);
    }
    None
}

/// Rule 2 for immediate subdirectories.
fn subdir_has_adapter(listing: &Listing) -> bool {
    listing.dirs.iter().any(|sub| {
        Listing::read(sub)
            .map(|l| l.has_adapter())
            .unwrap_or(false)
    })
}

/// Rule 4.
fn forced_kind(dir: &Path, listing: &Listing, declared: DeclaredType) -> Option<AssetKind> {
    match declared {
        DeclaredType::Custom if listing.has_weights() => Some(AssetKind::CustomModel),
        DeclaredType::Lora if listing.has_weights() => Some(AssetKind::LoraAdapter),
        DeclaredType::Huggingface if dir.join(LayoutConfig::BLOBS_DIR).is_dir() => {
            Some(AssetKind::Unknown)
        }
        _ => None,
    }
}

/// Classify a single directory.
///
/// Fails only when the directory itself cannot be listed.
pub fn classify(dir: &Path, declared: DeclaredType) -> io::Result<Classification> {
    let listing = Listing::read(dir)?;
    Ok(classify_listed(dir, &listing, declared))
}

pub(crate) fn classify_listed(
    dir: &Path,
    listing: &Listing,
    declared: DeclaredType,
) -> Classification {
    if let Some(kind) = classify_direct(dir, listing) {
        return Classification::Asset(kind);
    }
    if subdir_has_adapter(listing) {
        return Classification::Asset(AssetKind::LoraAdapter);
    }
    match forced_kind(dir, listing, declared) {
        Some(kind) => {
            debug!("{} classified as {} by declared type", dir.display(), kind);
            Classification::Asset(kind)
        }
        None => Classification::NotAnAsset,
    }
}

/// Immediate subdirectories that are assets in their own right.
pub(crate) fn asset_subdirs(listing: &Listing) -> Vec<(PathBuf, AssetKind)> {
    listing
        .dirs
        .iter()
        .filter_map(|sub| {
            let sub_listing = Listing::read(sub).ok()?;
            classify_direct(sub, &sub_listing).map(|kind| (sub.clone(), kind))
        })
        .collect()
}

/// Auto-detect how a whole root should be scanned.
pub fn detect_root_layout(root: &Path) -> io::Result<RootLayout> {
    let listing = Listing::read(root)?;
    let total = listing.dirs.len();
    let cache_named = listing
        .dirs
        .iter()
        .filter(|d| is_cache_name(&basename(d)))
        .count();

    let layout = if total > 0 && cache_named * 2 > total {
        RootLayout::Cache
    } else {
        RootLayout::Local
    };
    debug!(
        "Detected {:?} layout for {} ({}/{} cache-named)",
        layout,
        root.display(),
        cache_named,
        total
    );
    Ok(layout)
}

/// Resolve the scan layout for a registration.
pub fn resolve_layout(root: &Path, declared: DeclaredType) -> io::Result<RootLayout> {
    match declared {
        DeclaredType::Huggingface => Ok(RootLayout::Cache),
        DeclaredType::Custom | DeclaredType::Lora => Ok(RootLayout::Local),
        DeclaredType::Auto => detect_root_layout(root),
    }
}

/// Heuristic check used before registering a directory.
pub fn looks_like_asset_root(dir: &Path) -> bool {
    let Ok(listing) = Listing::read(dir) else {
        return false;
    };

    if dir.join(LayoutConfig::BLOBS_DIR).is_dir() {
        return true;
    }

    listing.dirs.iter().any(|child| {
        is_cache_name(&basename(child))
            || child.join(LayoutConfig::BLOBS_DIR).is_dir()
            || Listing::read(child)
                .map(|l| classify_direct(child, &l).is_some())
                .unwrap_or(false)
    })
}
