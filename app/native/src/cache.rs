//! Cache directory utilities.
//!
//! Provides a centralized way to get the application's cache directory.
//! Uses `~/.cache/tapestry/` (or `$XDG_CACHE_HOME/tapestry/`), with a fallback
//! to `/tmp/tapestry/` if the cache directory is unavailable.

use std::path::PathBuf;

use crate::constants::APP_NAME;

/// Returns the root cache directory for the application.
#[must_use]
pub fn get_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from(format!("/tmp/{APP_NAME}")),
        |cache| cache.join(APP_NAME),
    )
}

/// Returns a cache subdirectory for the given component.
///
/// # Arguments
///
/// * `subdir` - The subdirectory name within the app's cache directory (e.g., `thumbnails`)
#[must_use]
pub fn get_cache_subdir(subdir: &str) -> PathBuf { get_cache_dir().join(subdir) }

/// Formats a byte count as a human-readable string.
///
/// # Returns
///
/// A human-readable string like "1.50 MB" or "256 bytes"
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss is acceptable for human-readable output
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
