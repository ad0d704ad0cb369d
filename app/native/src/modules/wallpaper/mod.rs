//! Wallpaper selection pipeline.
//!
//! Components, leaf first:
//!
//! - [`library`] - scans the category directories into image records
//! - [`thumbnail`] - scaled previews with a bounded, deduplicating cache
//! - [`desktop`] - environment detection and background apply strategies
//! - [`theme`] - color palette extraction and the reload fan-out
//! - [`controller`] - the actor that owns the selection state
//! - [`watcher`] - triggers rescans when the library changes

pub mod controller;
pub mod desktop;
pub mod library;
pub mod theme;
pub mod thumbnail;
pub mod watcher;

pub use controller::{
    ActorError, ApplyOutcome, ControllerHandle, ControllerOptions, ControllerServices,
    RescanError, SelectionController, SelectionState,
};
pub use desktop::{ApplyError, ApplyStrategy, DesktopDispatcher, EnvironmentId};
pub use library::{ImageKind, LibraryScanner, LibrarySnapshot, ScanError, WallpaperImage};
pub use theme::{ColorThemeGenerator, Palette, ReloadWarning, ThemeError, ThemeResult};
pub use thumbnail::{Thumbnail, ThumbnailCache, ThumbnailError, ThumbnailStats};
pub use watcher::{LibraryWatcher, WatchError, watch_library};
