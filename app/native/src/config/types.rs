//! Configuration types for Tapestry.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Every field has a default, so an empty file (or no file) is valid.

use std::fs::File;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::APP_NAME;

/// Supported configuration file names, in priority order.
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy single-file names checked in the home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".tapestry.jsonc", ".tapestry.json"];

/// Wallpaper library location and initial selection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LibraryConfig {
    /// Base directory containing one subdirectory per category.
    ///
    /// Supports `~`. Relative paths are resolved against the directory of the
    /// configuration file.
    pub path: String,

    /// Start with the first discovered category selected instead of `all`.
    pub start_with_first_category: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: "~/Pictures/wallpapers".to_string(),
            start_with_first_category: false,
        }
    }
}

/// Thumbnail generation and caching.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ThumbnailConfig {
    /// Length in pixels of the longer side of every thumbnail.
    pub size: u32,

    /// Maximum number of thumbnails kept in memory.
    pub capacity: usize,

    /// Maximum number of thumbnails generated at the same time.
    /// `0` uses the number of available cores.
    pub workers: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self { Self { size: 200, capacity: 256, workers: 0 } }
}

impl ThumbnailConfig {
    /// Returns the effective worker count.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
    }
}

/// Desktop environment handling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DesktopConfig {
    /// Forces an environment identifier (e.g. `gnome`, `hyprland`) instead of
    /// detecting it from the session environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Color theme generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeConfig {
    /// Whether applying a wallpaper also regenerates the color theme.
    pub enabled: bool,

    /// Color extraction tool, resolved on the execution path.
    pub tool: String,

    /// Arguments appended to `<tool> image <path>` to request JSON output.
    pub json_args: Vec<String>,

    /// Read the palette and apply templates with a single invocation.
    pub single_invocation: bool,

    /// Shell commands run after templates are applied, in order.
    pub reload_commands: Vec<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tool: "matugen".to_string(),
            json_args: vec!["--json".to_string(), "hex".to_string()],
            single_invocation: false,
            reload_commands: vec![
                "pkill -SIGUSR2 waybar".to_string(),
                "hyprctl reload".to_string(),
                "pkill -USR1 kitty".to_string(),
            ],
        }
    }
}

/// External command execution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandConfig {
    /// Seconds an external command may run before it is killed. Values below
    /// 1 are raised to 1.
    pub timeout_secs: u64,
}

impl Default for CommandConfig {
    fn default() -> Self { Self { timeout_secs: 10 } }
}

impl CommandConfig {
    #[must_use]
    pub const fn timeout(&self) -> std::time::Duration {
        let secs = if self.timeout_secs == 0 { 1 } else { self.timeout_secs };
        std::time::Duration::from_secs(secs)
    }
}

/// Root configuration structure for Tapestry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TapestryConfig {
    /// JSON schema reference, accepted and ignored.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub library: LibraryConfig,

    pub thumbnails: ThumbnailConfig,

    pub desktop: DesktopConfig,

    pub theme: ThemeConfig,

    pub commands: CommandConfig,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file contains invalid JSON.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns the list of candidate configuration paths, in priority order.
///
/// 1. `$XDG_CONFIG_HOME/tapestry/config.jsonc|json` (when set)
/// 2. `~/.config/tapestry/config.jsonc|json`
/// 3. `dirs::config_dir()/tapestry/config.jsonc|json`
/// 4. `~/.tapestry.jsonc|json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    fn push_dir(dir: &Path, paths: &mut Vec<PathBuf>) {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            // XDG_CONFIG_HOME is usually ~/.config
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        push_dir(&PathBuf::from(xdg_config).join(APP_NAME), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        push_dir(&home.join(".config").join(APP_NAME), &mut paths);
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_dir(&config_dir.join(APP_NAME), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist,
/// `ConfigError::Io` if it cannot be read and `ConfigError::Parse` if it is
/// not valid JSONC.
pub fn load_config_from_path(path: &Path) -> Result<TapestryConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let file =
        File::open(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let reader = json_comments::StripComments::new(file);

    serde_json::from_reader(reader)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jsonc").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = TapestryConfig::default();
        assert_eq!(config.library.path, "~/Pictures/wallpapers");
        assert!(!config.library.start_with_first_category);
        assert_eq!(config.thumbnails.size, 200);
        assert_eq!(config.thumbnails.capacity, 256);
        assert!(config.desktop.environment.is_none());
        assert!(config.theme.enabled);
        assert_eq!(config.theme.tool, "matugen");
        assert_eq!(config.theme.json_args, vec!["--json", "hex"]);
        assert_eq!(config.theme.reload_commands.len(), 3);
        assert_eq!(config.commands.timeout_secs, 10);
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: TapestryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.thumbnails.size, 200);
        assert_eq!(config.theme.tool, "matugen");
    }

    #[test]
    fn test_camel_case_keys() {
        let json = r#"{
            "library": { "path": "/walls", "startWithFirstCategory": true },
            "thumbnails": { "size": 128, "workers": 2 },
            "desktop": { "environment": "hyprland" },
            "theme": { "singleInvocation": true, "reloadCommands": [] },
            "commands": { "timeoutSecs": 3 }
        }"#;
        let config: TapestryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.library.path, "/walls");
        assert!(config.library.start_with_first_category);
        assert_eq!(config.thumbnails.size, 128);
        assert_eq!(config.thumbnails.capacity, 256);
        assert_eq!(config.thumbnails.effective_workers(), 2);
        assert_eq!(config.desktop.environment.as_deref(), Some("hyprland"));
        assert!(config.theme.single_invocation);
        assert!(config.theme.reload_commands.is_empty());
        assert_eq!(config.commands.timeout(), std::time::Duration::from_secs(3));
    }

    #[test]
    fn test_zero_command_timeout_is_raised() {
        let config: TapestryConfig =
            serde_json::from_str(r#"{ "commands": { "timeoutSecs": 0 } }"#).unwrap();
        assert_eq!(config.commands.timeout(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_effective_workers_defaults_to_cores() {
        assert!(ThumbnailConfig::default().effective_workers() >= 1);
    }

    #[test]
    fn test_load_config_from_path_strips_comments() {
        let file = write_config(
            r#"{
                // where the images live
                "$schema": "https://example.invalid/tapestry.json",
                "library": { "path": "~/walls" } /* trailing */
            }"#,
        );
        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.library.path, "~/walls");
    }

    #[test]
    fn test_load_config_from_path_missing() {
        let err = load_config_from_path(Path::new("/nonexistent/tapestry.jsonc")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("/nonexistent/tapestry.jsonc"));
    }

    #[test]
    fn test_load_config_from_path_invalid_json() {
        let file = write_config("{ \"library\": ");
        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_config_paths_order() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        let first_legacy = paths
            .iter()
            .position(|p| p.file_name().is_some_and(|n| n == ".tapestry.jsonc"))
            .unwrap();
        assert!(
            paths[..first_legacy]
                .iter()
                .all(|p| p.ends_with("config.jsonc") || p.ends_with("config.json"))
        );
    }
}
