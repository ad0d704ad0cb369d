//! Error types for Tapestry.
//!
//! This module provides the crate-level error returned by CLI commands. Each
//! pipeline component keeps its own error enum; they are folded into
//! [`TapestryError`] at the command boundary.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::modules::wallpaper::{
    ActorError, ApplyError, RescanError, ScanError, ThemeError, ThumbnailError, WatchError,
};

/// Errors that can occur during application execution.
///
/// Serializes as `{ "kind": ..., "message": ... }` so JSON output modes can
/// report failures in a structured way.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum TapestryError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Library scan failed.
    #[error("Library error: {0}")]
    LibraryError(String),
    /// Thumbnail generation failed.
    #[error("Thumbnail error: {0}")]
    ThumbnailError(String),
    /// Setting the desktop background failed.
    #[error("Wallpaper error: {0}")]
    WallpaperError(String),
    /// Color theme generation failed.
    #[error("Theme error: {0}")]
    ThemeError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// The selection controller stopped responding.
    #[error("Controller error: {0}")]
    ControllerError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for TapestryError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for TapestryError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<String> for TapestryError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for TapestryError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

impl From<ConfigError> for TapestryError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<ScanError> for TapestryError {
    fn from(err: ScanError) -> Self { Self::LibraryError(err.to_string()) }
}

impl From<ThumbnailError> for TapestryError {
    fn from(err: ThumbnailError) -> Self { Self::ThumbnailError(err.to_string()) }
}

impl From<ApplyError> for TapestryError {
    fn from(err: ApplyError) -> Self { Self::WallpaperError(err.to_string()) }
}

impl From<ThemeError> for TapestryError {
    fn from(err: ThemeError) -> Self { Self::ThemeError(err.to_string()) }
}

impl From<ActorError> for TapestryError {
    fn from(err: ActorError) -> Self { Self::ControllerError(err.to_string()) }
}

impl From<RescanError> for TapestryError {
    fn from(err: RescanError) -> Self {
        match err {
            RescanError::Scan(err) => err.into(),
            RescanError::Actor(err) => err.into(),
        }
    }
}

impl From<WatchError> for TapestryError {
    fn from(err: WatchError) -> Self { Self::LibraryError(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = TapestryError::InvalidArguments("Cannot specify both path and random".to_string());
        assert!(err.to_string().contains("Cannot specify both path and random"));
    }

    #[test]
    fn test_library_error_display() {
        let err = TapestryError::LibraryError("base directory missing".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Library error"));
        assert!(msg.contains("base directory missing"));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: TapestryError = io_err.into();
        assert!(matches!(err, TapestryError::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_scan_error_maps_to_library_error() {
        let err: TapestryError = ScanError::NotADirectory("/etc/passwd".into()).into();
        assert!(matches!(err, TapestryError::LibraryError(_)));
        assert!(err.to_string().contains("/etc/passwd"));
    }

    #[test]
    fn test_rescan_error_unwraps_scan_error() {
        let err: TapestryError =
            RescanError::Scan(ScanError::NotFound("/walls".into())).into();
        assert!(matches!(err, TapestryError::LibraryError(_)));

        let err: TapestryError = RescanError::Actor(ActorError::SendFailed).into();
        assert!(matches!(err, TapestryError::ControllerError(_)));
    }

    #[test]
    fn test_theme_error_maps_to_theme_error() {
        let err: TapestryError = ThemeError::ToolMissing("matugen".to_string()).into();
        assert!(matches!(err, TapestryError::ThemeError(_)));
        assert!(err.to_string().contains("matugen"));
    }

    #[test]
    fn test_command_error_display() {
        let err = TapestryError::CommandError("Generic failure".to_string());
        assert_eq!(err.to_string(), "Generic failure");
    }

    #[test]
    fn test_from_string() {
        let err: TapestryError = "test error".into();
        assert!(matches!(err, TapestryError::CommandError(_)));
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = TapestryError::WallpaperError("feh exited with status 1".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("WallpaperError"));
        assert!(json.contains("feh exited with status 1"));
    }
}
