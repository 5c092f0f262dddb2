//! Configuration file and data folder resolution
//!
//! Both resolvers follow the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory name under the platform config/data folders
pub const APP_DIR: &str = "fretboard";

/// Resolve the TOML configuration file path for a service
///
/// The returned path may not exist; callers treat a missing file as
/// "use defaults" (see [`load_toml`]).
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str, file_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Some(path) = env_path(env_var_name) {
        return path;
    }

    // Priority 3: Platform config directory
    default_config_dir().join(file_name)
}

/// Resolve the folder where services keep persistent data (caches, databases)
pub fn resolve_data_folder(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = env_path(env_var_name) {
        return path;
    }

    default_data_folder()
}

/// Load a TOML file into `T`, falling back to `T::default()` if the file is missing
pub fn load_toml<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let value = toml::from_str(&content)?;
    debug!("Loaded config from {}", path.display());
    Ok(value)
}

/// Ensure a directory exists, creating intermediate folders as needed
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        debug!("Created directory {}", path.display());
    }
    Ok(())
}

/// Read a path from an environment variable, ignoring empty values
fn env_path(env_var_name: &str) -> Option<PathBuf> {
    std::env::var(env_var_name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Get OS-dependent default config directory
fn default_config_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.config/fretboard (or /etc/fretboard for system-wide)
        dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/etc").join(APP_DIR))
    } else {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
    }
}

/// Get OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/fretboard (or /var/lib/fretboard for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/fretboard
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\fretboard
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR))
    } else {
        PathBuf::from("./fretboard_data")
    }
}
