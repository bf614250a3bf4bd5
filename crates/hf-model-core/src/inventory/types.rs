//! Inventory types and data structures.
//!
//! Everything here is plain serializable data so the CLI (or any other
//! front end) can render or forward it without touching engine internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Kind of a discovered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// `models--publisher--name` directory in a HuggingFace cache
    CacheModel,
    /// `datasets--publisher--name` directory in a HuggingFace cache
    CacheDataset,
    /// Standalone model directory (config + weights)
    CustomModel,
    /// LoRA adapter directory (adapter config + adapter weights)
    LoraAdapter,
    /// Inside a cache root but not recognizable
    Unknown,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::CacheModel => "cache_model",
            AssetKind::CacheDataset => "cache_dataset",
            AssetKind::CustomModel => "custom_model",
            AssetKind::LoraAdapter => "lora_adapter",
            AssetKind::Unknown => "unknown",
        }
    }

    /// Cache-style artifacts are never manifested.
    pub fn is_cache(&self) -> bool {
        matches!(self, AssetKind::CacheModel | AssetKind::CacheDataset)
    }

    /// Custom models and LoRA adapters.
    pub fn is_local(&self) -> bool {
        matches!(self, AssetKind::CustomModel | AssetKind::LoraAdapter)
    }

    /// Parse a manifest `type` string.
    pub fn from_manifest_type(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "model" | "custom_model" => Some(AssetKind::CustomModel),
            "lora_adapter" | "lora" => Some(AssetKind::LoraAdapter),
            _ => None,
        }
    }

    /// The manifest `type` string written for this kind.
    pub fn manifest_type(&self) -> &'static str {
        match self {
            AssetKind::LoraAdapter => "lora_adapter",
            _ => "custom_model",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cache_model" | "model" => Ok(AssetKind::CacheModel),
            "cache_dataset" | "dataset" => Ok(AssetKind::CacheDataset),
            "custom_model" | "custom" => Ok(AssetKind::CustomModel),
            "lora_adapter" | "lora" => Ok(AssetKind::LoraAdapter),
            "unknown" => Ok(AssetKind::Unknown),
            other => Err(format!("unknown asset kind: {}", other)),
        }
    }
}

/// Declared type of a registered directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Huggingface,
    Custom,
    Lora,
    #[default]
    Auto,
}

impl DeclaredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Huggingface => "huggingface",
            DeclaredType::Custom => "custom",
            DeclaredType::Lora => "lora",
            DeclaredType::Auto => "auto",
        }
    }
}

impl std::str::FromStr for DeclaredType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" | "cache" => Ok(DeclaredType::Huggingface),
            "custom" => Ok(DeclaredType::Custom),
            "lora" => Ok(DeclaredType::Lora),
            "auto" => Ok(DeclaredType::Auto),
            other => Err(format!("unknown directory type: {}", other)),
        }
    }
}

/// How a root is walked, resolved from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootLayout {
    /// HuggingFace cache: every child is a cache-named repo directory
    Cache,
    /// Custom/LoRA root: every child is classified independently
    Local,
}

/// Outcome of classifying a single directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Asset(AssetKind),
    NotAnAsset,
}

/// Decoded `models--publisher--name` directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheName {
    pub kind: AssetKind,
    pub publisher: String,
    pub name: String,
}

impl CacheName {
    /// `publisher/name`
    pub fn repo_id(&self) -> String {
        format!("{}/{}", self.publisher, self.name)
    }
}

/// An artifact as produced by the scanner, before manifests and dedup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawAsset {
    pub path: PathBuf,
    pub raw_name: String,
    pub kind: AssetKind,
    pub detected_name: String,
    pub detected_publisher: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    pub source_root: PathBuf,
    /// Present for cache-style artifacts.
    pub cache_name: Option<CacheName>,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Logical identity; the key used for dedup, `details` and `delete`.
    pub id: String,
    pub path: PathBuf,
    pub raw_name: String,
    pub display_name: String,
    pub publisher: String,
    pub kind: AssetKind,
    pub size_bytes: u64,
    pub size_display: String,
    pub modified_at: DateTime<Utc>,
    pub source_root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub manifest_applied: bool,
    /// Paths of records collapsed into this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<PathBuf>,
}

/// Sort keys for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Largest first
    #[default]
    Size,
    Name,
    Date,
    Type,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "size" => Ok(SortKey::Size),
            "name" => Ok(SortKey::Name),
            "date" => Ok(SortKey::Date),
            "type" | "kind" => Ok(SortKey::Type),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Categories of soft failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PermissionDenied,
    RootUnreachable,
    ManifestParse,
    NotFound,
    Io,
}

impl FailureKind {
    /// Categorize an I/O error.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            std::io::ErrorKind::NotFound => FailureKind::NotFound,
            _ => FailureKind::Io,
        }
    }
}

/// A per-path problem that did not stop the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl SoftFailure {
    pub fn new(path: impl Into<PathBuf>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::new(path, FailureKind::from_io(err), err.to_string())
    }
}

/// Summary of a catalog build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub roots_scanned: usize,
    pub records_found: usize,
    pub duplicates_suppressed: usize,
    pub failures: Vec<SoftFailure>,
}

impl BuildReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// The full sorted, deduplicated set of records for one configuration.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub records: Vec<AssetRecord>,
    /// Records suppressed during dedup, kept for duplicate inspection.
    pub secondary: Vec<AssetRecord>,
    pub report: BuildReport,
    pub built_at: DateTime<Utc>,
    pub ttl: Duration,
    built_instant: Instant,
}

impl Catalog {
    pub(crate) fn new(
        records: Vec<AssetRecord>,
        secondary: Vec<AssetRecord>,
        report: BuildReport,
        ttl: Duration,
    ) -> Self {
        Self {
            records,
            secondary,
            report,
            built_at: Utc::now(),
            ttl,
            built_instant: Instant::now(),
        }
    }

    /// Time since the build, on the monotonic clock.
    pub fn age(&self) -> Duration {
        self.built_instant.elapsed()
    }

    pub fn is_stale(&self) -> bool {
        self.age() >= self.ttl
    }

    /// Find a primary record by logical identity or by path.
    pub fn find(&self, identity: &str) -> Option<&AssetRecord> {
        self.records
            .iter()
            .find(|r| r.id == identity || r.path.to_string_lossy() == identity)
    }

    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size_bytes).sum()
    }
}

/// Options for [`AssetRegistry::list`](crate::AssetRegistry::list).
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub sort_by: SortKey,
    /// Keep only these kinds; `None` keeps everything.
    pub kinds: Option<Vec<AssetKind>>,
    /// Append suppressed duplicates after the primary records.
    pub include_secondary: bool,
    pub force_refresh: bool,
}

impl ListOptions {
    pub fn sorted_by(sort_by: SortKey) -> Self {
        Self {
            sort_by,
            ..Default::default()
        }
    }

    pub fn refreshed(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<AssetKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub(crate) fn accepts(&self, kind: AssetKind) -> bool {
        self.kinds.as_ref().map_or(true, |k| k.contains(&kind))
    }
}

/// Outcome of deleting one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted {
        identity: String,
        paths: Vec<PathBuf>,
    },
    NotFound {
        identity: String,
    },
    Failed {
        identity: String,
        path: PathBuf,
        kind: FailureKind,
        message: String,
        /// Paths removed before the failure (deletes are not rolled back).
        removed: Vec<PathBuf>,
    },
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted { .. })
    }

    /// Whether anything was removed from disk.
    pub(crate) fn removed_any(&self) -> bool {
        match self {
            DeleteOutcome::Deleted { paths, .. } => !paths.is_empty(),
            DeleteOutcome::Failed { removed, .. } => !removed.is_empty(),
            DeleteOutcome::NotFound { .. } => false,
        }
    }
}

/// A successfully deleted item in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedItem {
    pub identity: String,
    pub paths: Vec<PathBuf>,
}

/// A failed item in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub identity: String,
    pub path: Option<PathBuf>,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of a multi-item delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub succeeded: Vec<DeletedItem>,
    pub failed: Vec<FailedItem>,
}

impl DeleteSummary {
    pub(crate) fn push(&mut self, outcome: DeleteOutcome) {
        match outcome {
            DeleteOutcome::Deleted { identity, paths } => {
                self.succeeded.push(DeletedItem { identity, paths })
            }
            DeleteOutcome::NotFound { identity } => self.failed.push(FailedItem {
                message: format!("No catalog entry for {}", identity),
                identity,
                path: None,
                kind: FailureKind::NotFound,
            }),
            DeleteOutcome::Failed {
                identity,
                path,
                kind,
                message,
                ..
            } => self.failed.push(FailedItem {
                identity,
                path: Some(path),
                kind,
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_serde_names() {
        let json = serde_json::to_string(&AssetKind::LoraAdapter).unwrap();
        assert_eq!(json, "\"lora_adapter\"");
        let kind: AssetKind = serde_json::from_str("\"cache_dataset\"").unwrap();
        assert_eq!(kind, AssetKind::CacheDataset);
    }

    #[test]
    fn test_manifest_type_mapping() {
        assert_eq!(AssetKind::from_manifest_type("model"), Some(AssetKind::CustomModel));
        assert_eq!(
            AssetKind::from_manifest_type("lora_adapter"),
            Some(AssetKind::LoraAdapter)
        );
        assert_eq!(AssetKind::from_manifest_type("checkpoint"), None);
        assert_eq!(AssetKind::LoraAdapter.manifest_type(), "lora_adapter");
    }

    #[test]
    fn test_declared_type_parsing() {
        assert_eq!("HF".parse::<DeclaredType>(), Ok(DeclaredType::Huggingface));
        assert_eq!("auto".parse::<DeclaredType>(), Ok(DeclaredType::Auto));
        assert!("bogus".parse::<DeclaredType>().is_err());
    }

    #[test]
    fn test_summary_collects_failures() {
        let mut summary = DeleteSummary::default();
        summary.push(DeleteOutcome::Deleted {
            identity: "a".into(),
            paths: vec![PathBuf::from("/a")],
        });
        summary.push(DeleteOutcome::NotFound {
            identity: "b".into(),
        });
        assert_eq!(summary.succeeded.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].kind, FailureKind::NotFound);
    }

    #[test]
    fn test_list_options_filter() {
        let opts = ListOptions::default().with_kinds(vec![AssetKind::LoraAdapter]);
        assert!(opts.accepts(AssetKind::LoraAdapter));
        assert!(!opts.accepts(AssetKind::CacheModel));
        assert!(ListOptions::default().accepts(AssetKind::Unknown));
    }
}
