//! Per-root manifest sidecar (`models_manifest.json`).
//!
//! A manifest carries user-curated names, publishers and notes for the
//! custom and LoRA artifacts of one root. It is read fresh on every catalog
//! build and never cached.

use crate::config::InventoryConfig;
use crate::inventory::classifier::resolve_layout;
use crate::inventory::scanner::scan_all;
use crate::inventory::types::{AssetKind, DeclaredType, FailureKind, RootLayout, SoftFailure};
use crate::metadata::atomic_write_json;
use crate::platform::{normalize_path, path_key};
use crate::{InventoryError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn default_version() -> String {
    InventoryConfig::MANIFEST_VERSION.to_string()
}

/// Contents of a manifest file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub models: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: default_version(),
            created_at: None,
            updated_at: None,
            models: Vec::new(),
        }
    }
}

/// One manifest entry. Fields other than `path` may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative to the manifest's root, or absolute.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ManifestEntry {
    /// Absolute location of the entry.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    /// Recognized kind from the `type` field.
    pub fn kind(&self) -> Option<AssetKind> {
        self.entry_type
            .as_deref()
            .and_then(AssetKind::from_manifest_type)
    }
}

impl Manifest {
    /// Entries keyed by normalized absolute path. When several entries
    /// normalize to the same path, the last one in file order wins.
    pub fn index(&self, root: &Path) -> HashMap<String, &ManifestEntry> {
        let mut index = HashMap::with_capacity(self.models.len());
        for entry in &self.models {
            if index.insert(path_key(&entry.resolve(root)), entry).is_some() {
                debug!("Manifest entry {} overrides an earlier one", entry.path);
            }
        }
        index
    }
}

/// A partial update to one manifest entry; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestFieldUpdate {
    pub path: PathBuf,
    pub name: Option<String>,
    pub publisher: Option<String>,
    pub kind: Option<AssetKind>,
    pub notes: Option<String>,
}

impl ManifestFieldUpdate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    fn apply(&self, entry: &mut ManifestEntry) {
        if let Some(name) = &self.name {
            entry.name = Some(name.clone());
        }
        if let Some(publisher) = &self.publisher {
            entry.publisher = Some(publisher.clone());
        }
        if let Some(kind) = self.kind {
            entry.entry_type = Some(kind.manifest_type().to_string());
        }
        if let Some(notes) = &self.notes {
            entry.notes = Some(notes.clone());
        }
    }
}

/// Location of the manifest for a root.
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(InventoryConfig::MANIFEST_FILENAME)
}

/// Load the manifest of a root.
///
/// An absent file is `Ok(None)`; malformed JSON is
/// [`InventoryError::ManifestParse`].
pub fn load(root: &Path) -> Result<Option<Manifest>> {
    let path = manifest_path(root);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(InventoryError::io_with_path(e, path)),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| InventoryError::ManifestParse {
            path,
            message: e.to_string(),
        })
}

/// Lenient load used by catalog builds: problems are reported, and the
/// manifest is then treated as absent.
pub fn load_for_build(root: &Path) -> (Option<Manifest>, Option<SoftFailure>) {
    match load(root) {
        Ok(manifest) => (manifest, None),
        Err(InventoryError::ManifestParse { path, message }) => {
            warn!("Ignoring malformed manifest {}: {}", path.display(), message);
            (
                None,
                Some(SoftFailure::new(path, FailureKind::ManifestParse, message)),
            )
        }
        Err(InventoryError::PermissionDenied(path)) => {
            warn!("Cannot read manifest {}: permission denied", path.display());
            (
                None,
                Some(SoftFailure::new(
                    path,
                    FailureKind::PermissionDenied,
                    "Permission denied",
                )),
            )
        }
        Err(e) => {
            let path = manifest_path(root);
            warn!("Cannot read manifest {}: {}", path.display(), e);
            (None, Some(SoftFailure::new(path, FailureKind::Io, e.to_string())))
        }
    }
}

/// Build a manifest from what is currently on disk under a local root,
/// classifying children the way a scan of a root registered as `declared`
/// would.
///
/// Cache roots are rejected: their names come from the cache layout.
pub fn generate(root: &Path, declared: DeclaredType) -> Result<Manifest> {
    if !root.is_dir() {
        return Err(InventoryError::NotADirectory(root.to_path_buf()));
    }
    let layout =
        resolve_layout(root, declared).map_err(|e| InventoryError::io_with_path(e, root))?;
    if layout == RootLayout::Cache {
        return Err(InventoryError::Validation {
            field: "root".to_string(),
            message: format!(
                "{} is a HuggingFace cache; manifests apply to custom and LoRA directories",
                root.display()
            ),
        });
    }

    let (assets, failures) = scan_all(root, declared);
    for failure in &failures {
        warn!("{}: {}", failure.path.display(), failure.message);
    }

    let models = assets
        .into_iter()
        .filter(|asset| asset.kind.is_local())
        .map(|asset| {
            let relative = asset
                .path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| asset.path.clone());
            ManifestEntry {
                path: relative.to_string_lossy().to_string(),
                name: Some(asset.detected_name),
                publisher: Some(asset.detected_publisher),
                entry_type: Some(asset.kind.manifest_type().to_string()),
                notes: None,
            }
        })
        .collect::<Vec<_>>();

    let now = Utc::now().to_rfc3339();
    info!(
        "Generated manifest for {} with {} entries",
        root.display(),
        models.len()
    );
    Ok(Manifest {
        version: default_version(),
        created_at: Some(now.clone()),
        updated_at: Some(now),
        models,
    })
}

/// Write a manifest atomically, stamping `updated_at`.
pub fn save(root: &Path, manifest: &mut Manifest) -> Result<PathBuf> {
    let now = Utc::now().to_rfc3339();
    if manifest.created_at.is_none() {
        manifest.created_at = Some(now.clone());
    }
    manifest.updated_at = Some(now);

    let path = manifest_path(root);
    atomic_write_json(&path, manifest, false)?;
    debug!("Saved manifest {}", path.display());
    Ok(path)
}

/// Apply partial updates to a root's manifest, generating it first when
/// absent, then save.
pub fn update(
    root: &Path,
    declared: DeclaredType,
    updates: &[ManifestFieldUpdate],
) -> Result<Manifest> {
    let mut manifest = match load(root)? {
        Some(manifest) => manifest,
        None => generate(root, declared)?,
    };

    let normalized_root = normalize_path(root);
    for update in updates {
        let target = if update.path.is_absolute() {
            update.path.clone()
        } else {
            root.join(&update.path)
        };
        let key = path_key(&target);

        // Last matching entry is the one that applies
        let existing = manifest
            .models
            .iter()
            .rposition(|entry| path_key(&entry.resolve(root)) == key);

        match existing {
            Some(index) => update.apply(&mut manifest.models[index]),
            None => {
                let path = if update.path.is_absolute() {
                    let normalized = normalize_path(&target);
                    normalized
                        .strip_prefix(&normalized_root)
                        .map(Path::to_path_buf)
                        .unwrap_or(normalized)
                } else {
                    update.path.clone()
                };
                let mut entry = ManifestEntry {
                    path: path.to_string_lossy().to_string(),
                    ..Default::default()
                };
                update.apply(&mut entry);
                manifest.models.push(entry);
            }
        }
    }

    save(root, &mut manifest)?;
    Ok(manifest)
}
