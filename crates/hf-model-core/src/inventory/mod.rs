//! Discovery, cataloging and deletion of model artifacts.
//!
//! - [`classifier`]: decides what a directory is
//! - [`scanner`]: walks one registered root lazily
//! - [`manifest`]: the per-root `models_manifest.json` sidecar
//! - [`builder`]: merges scans and manifests into a [`Catalog`]
//! - [`registry`]: the [`AssetRegistry`] facade with TTL caching

pub mod builder;
pub mod classifier;
pub mod manifest;
pub mod naming;
mod overlay;
pub mod registry;
pub mod remover;
pub mod scanner;
pub mod size;
mod types;

pub use builder::{sort_records, CatalogBuilder};
pub use classifier::{classify, detect_root_layout, looks_like_asset_root, resolve_layout};
pub use manifest::{Manifest, ManifestEntry, ManifestFieldUpdate};
pub use registry::AssetRegistry;
pub use remover::{AssetRemover, FsRemover};
pub use scanner::{scan, scan_all, Scan, ScanEvent};
pub use types::*;
