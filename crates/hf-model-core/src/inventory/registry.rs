//! The asset registry: one entry point over registrations, catalog builds,
//! manifests and deletion.
//!
//! The registry owns the cached [`Catalog`] as a plain field. Reads are
//! served from it while it is younger than the TTL; every mutation drops
//! it, so the next read rebuilds from disk.

use crate::config::RegistryOptions;
use crate::inventory::builder::{sort_records, CatalogBuilder};
use crate::inventory::manifest::{self, Manifest, ManifestFieldUpdate};
use crate::inventory::remover::{AssetRemover, FsRemover};
use crate::inventory::types::{
    AssetRecord, BuildReport, Catalog, DeclaredType, DeleteOutcome, DeleteSummary, FailureKind,
    ListOptions,
};
use crate::platform::{clean_path, expand_home, path_key};
use crate::registrations::{
    DirectoryRegistration, JsonRegistrationStore, RegistrationSet, RegistrationStore,
};
use crate::{InventoryError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Facade over the inventory engine.
///
/// Not `Send`/`Sync`: the boxed store and remover carry no thread bounds.
/// Callers sharing a registry across threads serialize access themselves.
pub struct AssetRegistry {
    store: Box<dyn RegistrationStore>,
    remover: Box<dyn AssetRemover>,
    registrations: RegistrationSet,
    options: RegistryOptions,
    catalog: Option<Catalog>,
    last_report: Option<BuildReport>,
}

impl std::fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("registrations", &self.registrations)
            .field("options", &self.options)
            .field("cached", &self.catalog.is_some())
            .finish_non_exhaustive()
    }
}

impl AssetRegistry {
    /// Create a registry over a registration store.
    pub fn new(store: impl RegistrationStore + 'static) -> Result<Self> {
        let registrations = store.load()?;
        debug!(
            "Registry opened with {} custom directories",
            registrations.custom_directories.len()
        );
        Ok(Self {
            store: Box::new(store),
            remover: Box::new(FsRemover),
            registrations,
            options: RegistryOptions::default(),
            catalog: None,
            last_report: None,
        })
    }

    /// Registry over the registration file in the platform config directory.
    pub fn open_default() -> Result<Self> {
        Self::new(JsonRegistrationStore::open_default()?)
    }

    /// Registry over a specific registration file.
    pub fn open(config_file: impl Into<PathBuf>) -> Result<Self> {
        Self::new(JsonRegistrationStore::new(config_file))
    }

    pub fn with_remover(mut self, remover: impl AssetRemover + 'static) -> Self {
        self.remover = Box::new(remover);
        self
    }

    pub fn with_options(mut self, options: RegistryOptions) -> Self {
        self.options = options;
        self.catalog = None;
        self
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    // ========================================
    // Catalog
    // ========================================

    fn ensure_catalog(&mut self, force: bool) -> &Catalog {
        let catalog = match self.catalog.take() {
            Some(catalog) if !force && !catalog.is_stale() => catalog,
            _ => {
                let catalog = CatalogBuilder::new()
                    .sort_by(self.options.default_sort)
                    .ttl(self.options.ttl)
                    .build(&self.registrations.effective_roots());
                self.last_report = Some(catalog.report.clone());
                catalog
            }
        };
        self.catalog.insert(catalog)
    }

    /// Current catalog, rebuilt when missing or stale.
    pub fn catalog(&mut self) -> &Catalog {
        self.ensure_catalog(false)
    }

    /// Rebuild unconditionally.
    pub fn refresh(&mut self) -> &Catalog {
        self.ensure_catalog(true)
    }

    /// Drop the cached catalog.
    pub fn invalidate(&mut self) {
        if self.catalog.take().is_some() {
            debug!("Catalog invalidated");
        }
    }

    /// Report of the most recent build, if any.
    pub fn last_report(&self) -> Option<&BuildReport> {
        self.last_report.as_ref()
    }

    /// List records.
    ///
    /// Records come from the cached catalog unless it is stale or
    /// `force_refresh` is set. Suppressed duplicates follow the primary
    /// records when `include_secondary` is set.
    pub fn list(&mut self, options: &ListOptions) -> Result<Vec<AssetRecord>> {
        let default_sort = self.options.default_sort;
        let catalog = self.ensure_catalog(options.force_refresh);

        let mut records: Vec<AssetRecord> = catalog
            .records
            .iter()
            .filter(|r| options.accepts(r.kind))
            .cloned()
            .collect();
        if options.sort_by != default_sort {
            sort_records(&mut records, options.sort_by);
        }

        if options.include_secondary {
            let mut secondary: Vec<AssetRecord> = catalog
                .secondary
                .iter()
                .filter(|r| options.accepts(r.kind))
                .cloned()
                .collect();
            sort_records(&mut secondary, options.sort_by);
            records.extend(secondary);
        }

        Ok(records)
    }

    /// Look up a record by identity or path.
    pub fn details(&mut self, identity: &str) -> Result<Option<AssetRecord>> {
        Ok(locate(self.catalog(), identity).cloned())
    }

    /// Records that had a manifest entry applied.
    pub fn get_models_with_manifest(&mut self) -> Result<Vec<AssetRecord>> {
        Ok(self
            .catalog()
            .records
            .iter()
            .filter(|r| r.manifest_applied)
            .cloned()
            .collect())
    }

    /// Duplicates suppressed during the last build.
    pub fn secondary_records(&mut self) -> Result<Vec<AssetRecord>> {
        Ok(self.catalog().secondary.clone())
    }

    // ========================================
    // Deletion
    // ========================================

    /// Delete one record from disk.
    ///
    /// Suppressed duplicates are removed too when `include_secondary` is
    /// set. The cache is invalidated when anything was removed.
    pub fn delete(&mut self, identity: &str, include_secondary: bool) -> Result<DeleteOutcome> {
        let record = locate(self.catalog(), identity).cloned();
        let outcome = match record {
            Some(record) => {
                self.remove_record(identity, &record, include_secondary, &mut HashSet::new())
            }
            None => DeleteOutcome::NotFound {
                identity: identity.to_string(),
            },
        };
        if outcome.removed_any() {
            self.invalidate();
        }
        Ok(outcome)
    }

    /// Delete several records, one at a time, continuing past failures.
    ///
    /// Identities are resolved against a single catalog snapshot. Nothing is
    /// rolled back: items deleted before a failure stay deleted.
    pub fn delete_many<S: AsRef<str>>(
        &mut self,
        identities: &[S],
        include_secondary: bool,
    ) -> Result<DeleteSummary> {
        let targets: Vec<(String, Option<AssetRecord>)> = {
            let catalog = self.catalog();
            identities
                .iter()
                .map(|id| {
                    let id = id.as_ref();
                    (id.to_string(), locate(catalog, id).cloned())
                })
                .collect()
        };

        let mut summary = DeleteSummary::default();
        let mut removed = HashSet::new();
        let mut changed = false;
        for (identity, record) in targets {
            let outcome = match record {
                Some(record) if !removed.contains(&path_key(&record.path)) => {
                    self.remove_record(&identity, &record, include_secondary, &mut removed)
                }
                _ => DeleteOutcome::NotFound { identity },
            };
            changed |= outcome.removed_any();
            summary.push(outcome);
        }

        info!(
            "Batch delete: {} succeeded, {} failed",
            summary.succeeded.len(),
            summary.failed.len()
        );
        if changed {
            self.invalidate();
        }
        Ok(summary)
    }

    fn remove_record(
        &self,
        identity: &str,
        record: &AssetRecord,
        include_secondary: bool,
        removed_keys: &mut HashSet<String>,
    ) -> DeleteOutcome {
        let mut targets = vec![record.path.clone()];
        if include_secondary {
            targets.extend(record.duplicates.iter().cloned());
        }

        let mut removed = Vec::new();
        for path in targets {
            let key = path_key(&path);
            if removed_keys.contains(&key) {
                continue;
            }
            if let Err(e) = self.remover.remove(&path) {
                warn!("Failed to delete {}: {}", path.display(), e);
                return DeleteOutcome::Failed {
                    identity: identity.to_string(),
                    kind: FailureKind::from_io(&e),
                    message: e.to_string(),
                    path,
                    removed,
                };
            }
            removed_keys.insert(key);
            removed.push(path);
        }

        info!("Deleted {} ({} paths)", identity, removed.len());
        DeleteOutcome::Deleted {
            identity: identity.to_string(),
            paths: removed,
        }
    }

    // ========================================
    // Registrations
    // ========================================

    pub fn registrations(&self) -> &[DirectoryRegistration] {
        &self.registrations.custom_directories
    }

    pub fn registration_set(&self) -> &RegistrationSet {
        &self.registrations
    }

    /// Roots a build would scan right now.
    pub fn effective_roots(&self) -> Vec<DirectoryRegistration> {
        self.registrations.effective_roots()
    }

    fn persist(&mut self, mut updated: RegistrationSet) -> Result<()> {
        updated.touch();
        self.store.save(&updated)?;
        self.registrations = updated;
        self.invalidate();
        Ok(())
    }

    /// Register a directory for scanning.
    ///
    /// The path must exist, be a directory and not be registered yet. It is
    /// stored absolute and lexically cleaned; a symlink alias of a registered
    /// directory is a registration of its own.
    pub fn add_directory(
        &mut self,
        path: impl AsRef<Path>,
        declared: DeclaredType,
    ) -> Result<DirectoryRegistration> {
        let requested = expand_home(path.as_ref());
        if !requested.exists() {
            return Err(InventoryError::config(format!(
                "Directory does not exist: {}",
                requested.display()
            )));
        }
        if !requested.is_dir() {
            return Err(InventoryError::config(format!(
                "Path is not a directory: {}",
                requested.display()
            )));
        }
        let cleaned = clean_path(&requested);
        if self.registrations.contains_literal(&cleaned) {
            return Err(InventoryError::config(format!(
                "Directory already registered: {}",
                cleaned.display()
            )));
        }

        let registration = DirectoryRegistration::new(cleaned, declared);
        let mut updated = self.registrations.clone();
        updated.custom_directories.push(registration.clone());
        self.persist(updated)?;

        info!(
            "Added directory {} ({})",
            registration.path.display(),
            declared.as_str()
        );
        Ok(registration)
    }

    /// Unregister a directory. Returns whether anything was removed.
    pub fn remove_directory(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = expand_home(path.as_ref());
        let mut updated = self.registrations.clone();
        if !updated.remove(&path) {
            info!("Directory not registered: {}", path.display());
            return Ok(false);
        }
        self.persist(updated)?;
        info!("Removed directory {}", path.display());
        Ok(true)
    }

    pub fn set_include_default_cache(&mut self, include: bool) -> Result<()> {
        let mut updated = self.registrations.clone();
        updated.include_default_cache = include;
        self.persist(updated)
    }

    /// Flip default cache inclusion and return the new state.
    pub fn toggle_default_cache(&mut self) -> Result<bool> {
        let include = !self.registrations.include_default_cache;
        self.set_include_default_cache(include)?;
        info!("Default cache inclusion set to {}", include);
        Ok(include)
    }

    // ========================================
    // Manifests
    // ========================================

    /// Declared type of a registered root, `Auto` for anything else.
    fn declared_type_of(&self, root: &Path) -> DeclaredType {
        self.registrations
            .find(root)
            .map(|registration| registration.declared_type)
            .unwrap_or_default()
    }

    pub fn generate_manifest(&self, root: impl AsRef<Path>) -> Result<Manifest> {
        let root = expand_home(root.as_ref());
        manifest::generate(&root, self.declared_type_of(&root))
    }

    pub fn save_manifest(
        &mut self,
        root: impl AsRef<Path>,
        manifest: &mut Manifest,
    ) -> Result<PathBuf> {
        let path = manifest::save(&expand_home(root.as_ref()), manifest)?;
        self.invalidate();
        Ok(path)
    }

    pub fn update_manifest(
        &mut self,
        root: impl AsRef<Path>,
        updates: &[ManifestFieldUpdate],
    ) -> Result<Manifest> {
        let root = expand_home(root.as_ref());
        let manifest = manifest::update(&root, self.declared_type_of(&root), updates)?;
        self.invalidate();
        Ok(manifest)
    }
}

/// Primary record by id or path, then a suppressed duplicate by path.
fn locate<'a>(catalog: &'a Catalog, identity: &str) -> Option<&'a AssetRecord> {
    if let Some(record) = catalog.find(identity) {
        return Some(record);
    }
    let key = path_key(&expand_home(Path::new(identity)));
    catalog
        .records
        .iter()
        .chain(catalog.secondary.iter())
        .find(|r| path_key(&r.path) == key)
}
