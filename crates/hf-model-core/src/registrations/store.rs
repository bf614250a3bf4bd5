//! Persistence for the registration set.

use super::RegistrationSet;
use crate::metadata::{atomic_read_json, atomic_write_json};
use crate::platform::config_file;
use crate::{InventoryError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where registrations are kept between runs.
pub trait RegistrationStore {
    /// Load the stored set.
    ///
    /// A missing or corrupted store yields the defaults.
    fn load(&self) -> Result<RegistrationSet>;

    /// Replace the stored set.
    fn save(&mut self, set: &RegistrationSet) -> Result<()>;
}

/// JSON file store (`~/.config/hf-model-tool/config.json` by default).
#[derive(Debug, Clone)]
pub struct JsonRegistrationStore {
    path: PathBuf,
}

impl JsonRegistrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform configuration directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistrationStore for JsonRegistrationStore {
    fn load(&self) -> Result<RegistrationSet> {
        match atomic_read_json::<RegistrationSet>(&self.path) {
            Ok(Some(set)) => {
                debug!(
                    "Loaded {} registrations from {}",
                    set.custom_directories.len(),
                    self.path.display()
                );
                Ok(set)
            }
            Ok(None) => {
                info!("No config file found, using defaults");
                Ok(RegistrationSet::default())
            }
            Err(InventoryError::Json { message, .. }) => {
                warn!("Config file corrupted ({}), using defaults", message);
                Ok(RegistrationSet::default())
            }
            Err(e) => Err(e),
        }
    }

    fn save(&mut self, set: &RegistrationSet) -> Result<()> {
        atomic_write_json(&self.path, set, true)?;
        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store for tests and embedders that manage persistence
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistrationStore {
    set: Option<RegistrationSet>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with a set.
    pub fn with_set(set: RegistrationSet) -> Self {
        Self { set: Some(set) }
    }
}

impl RegistrationStore for MemoryRegistrationStore {
    fn load(&self) -> Result<RegistrationSet> {
        Ok(self.set.clone().unwrap_or_default())
    }

    fn save(&mut self, set: &RegistrationSet) -> Result<()> {
        self.set = Some(set.clone());
        Ok(())
    }
}
