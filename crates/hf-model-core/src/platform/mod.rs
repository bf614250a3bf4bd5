//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific path behavior live here rather than
//! being scattered through the scanner and the stores.

pub mod paths;

pub use paths::{
    clean_path, config_dir, config_file, default_datasets_cache, default_hub_cache, expand_home,
    normalize_path, path_depth, path_key,
};

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "unknown"
    }
}
