//! Centralized configuration for the inventory engine.
//!
//! Constants for on-disk layouts, file names and cache timing. Runtime
//! knobs that callers may change live in [`RegistryOptions`].

use crate::inventory::SortKey;
use std::time::Duration;

/// Application-level configuration.
pub struct InventoryConfig;

impl InventoryConfig {
    pub const APP_NAME: &'static str = "hf-model-tool";
    /// How long a built catalog is served before it is considered stale.
    pub const CATALOG_TTL: Duration = Duration::from_secs(60);
    pub const MANIFEST_FILENAME: &'static str = "models_manifest.json";
    pub const MANIFEST_VERSION: &'static str = "1.0";
}

/// Signals used by the layout classifier.
pub struct LayoutConfig;

impl LayoutConfig {
    pub const MODELS_PREFIX: &'static str = "models";
    pub const DATASETS_PREFIX: &'static str = "datasets";
    /// Separator between prefix, publisher and name in cache directory names.
    pub const CACHE_SEPARATOR: &'static str = "--";
    pub const SNAPSHOTS_DIR: &'static str = "snapshots";
    pub const BLOBS_DIR: &'static str = "blobs";

    pub const MODEL_CONFIG_FILES: &'static [&'static str] = &["config.json", "model_index.json"];
    pub const ADAPTER_CONFIG_FILE: &'static str = "adapter_config.json";
    pub const ADAPTER_WEIGHTS_STEM: &'static str = "adapter_model";
    pub const WEIGHTS_EXTENSIONS: &'static [&'static str] = &["safetensors", "bin", "pt"];

    /// Publisher reported for local artifacts with no better signal.
    pub const LOCAL_PUBLISHER: &'static str = "local";
}

/// Directory and file names for persisted configuration.
pub struct PathsConfig;

impl PathsConfig {
    pub const CONFIG_DIR_NAME: &'static str = "hf-model-tool";
    pub const CONFIG_FILENAME: &'static str = "config.json";
    pub const HF_DIR_NAME: &'static str = "huggingface";
    pub const HUB_DIR_NAME: &'static str = "hub";
    pub const DATASETS_DIR_NAME: &'static str = "datasets";
}

/// Runtime options for an [`AssetRegistry`](crate::AssetRegistry).
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Catalog time-to-live.
    pub ttl: Duration,
    /// Sort order used when building the cached catalog.
    pub default_sort: SortKey,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            ttl: InventoryConfig::CATALOG_TTL,
            default_sort: SortKey::Size,
        }
    }
}
