//! HF Model Core - inventory engine for locally stored HuggingFace models.
//!
//! Discovers model artifacts in the HuggingFace hub cache and in
//! user-registered directories of custom checkpoints and LoRA adapters,
//! sizes them without double-counting shared blobs, overlays user-curated
//! names from per-directory manifests, and exposes the result as a
//! deduplicated, sortable catalog with TTL caching and safe deletion.
//!
//! # Example
//!
//! ```rust,no_run
//! use hf_model_core::{AssetRegistry, DeclaredType, ListOptions, SortKey};
//!
//! fn main() -> hf_model_core::Result<()> {
//!     let mut registry = AssetRegistry::open_default()?;
//!     registry.add_directory("/data/checkpoints", DeclaredType::Custom)?;
//!
//!     for record in registry.list(&ListOptions::sorted_by(SortKey::Size))? {
//!         println!("{:>12}  {}  {}", record.size_display, record.kind, record.display_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod inventory;
pub mod metadata;
pub mod platform;
pub mod registrations;

// Re-export commonly used types
pub use config::{InventoryConfig, LayoutConfig, PathsConfig, RegistryOptions};
pub use error::{InventoryError, Result};
pub use inventory::{
    AssetKind, AssetRecord, AssetRegistry, AssetRemover, BuildReport, Catalog, CatalogBuilder,
    Classification, DeclaredType, DeleteOutcome, DeleteSummary, FailureKind, FsRemover,
    ListOptions, Manifest, ManifestEntry, ManifestFieldUpdate, RawAsset, RootLayout, SoftFailure,
    SortKey,
};
pub use registrations::{
    DirectoryRegistration, JsonRegistrationStore, MemoryRegistrationStore, RegistrationSet,
    RegistrationStore,
};
