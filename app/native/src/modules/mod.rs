//! Application feature modules for Tapestry.
//!
//! - [`wallpaper`] - Wallpaper library, thumbnails, apply strategies, color
//!   themes and the selection controller

pub mod wallpaper;
