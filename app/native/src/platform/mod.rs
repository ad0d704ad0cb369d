//! Platform helpers shared by configuration and the wallpaper pipeline.
//!
//! - [`path`] - `~` expansion and config-relative path resolution

pub mod path;

pub use path::{expand, expand_and_resolve};
