//! Configuration module for Tapestry.
//!
//! This module provides configuration types and loading. The configuration
//! file supports JSONC format (JSON with comments). Both single-line (`//`) and
//! multi-line (`/* */`) comments are allowed.
//!
//! Configuration is loaded once by the binary and passed to the services it
//! constructs; nothing here is global.

pub mod types;

use std::path::{Path, PathBuf};

pub use types::{
    CommandConfig, ConfigError, DesktopConfig, LibraryConfig, TapestryConfig, ThemeConfig,
    ThumbnailConfig, config_paths, load_config_from_path,
};

use crate::platform::expand_and_resolve;

/// A configuration together with the file it was read from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: TapestryConfig,
    /// `None` when no configuration file exists and defaults are in use.
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Resolves `library.path` to a concrete directory.
    ///
    /// `~` is expanded; relative paths are resolved against the configuration
    /// file's directory, or the working directory when running on defaults.
    #[must_use]
    pub fn library_dir(&self) -> PathBuf {
        let base = self
            .path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        expand_and_resolve(&self.config.library.path, &base)
    }
}

/// Loads the configuration.
///
/// With `custom` set, only that file is read and it must exist. Otherwise the
/// first existing file from [`config_paths`] is used, falling back to defaults
/// when there is none.
///
/// # Errors
///
/// Returns an error if the chosen file cannot be read or parsed, or if
/// `custom` points to a missing file.
pub fn load_config(custom: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = custom {
        let config = load_config_from_path(path)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        return Ok(LoadedConfig { config, path: Some(path.to_path_buf()) });
    }

    let Some(path) = config_paths().into_iter().find(|path| path.exists()) else {
        tracing::debug!("no configuration file found, using defaults");
        return Ok(LoadedConfig::default());
    };

    let config = load_config_from_path(&path)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(LoadedConfig { config, path: Some(path) })
}
