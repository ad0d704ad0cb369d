//! Application-wide constants.

/// Application name, used for config and cache directory names.
pub const APP_NAME: &str = "tapestry";

/// Category sentinel that selects the whole library.
pub const ALL_CATEGORIES: &str = "all";

/// Environment identifier returned when no desktop session can be detected.
pub const UNKNOWN_ENVIRONMENT: &str = "unknown";
