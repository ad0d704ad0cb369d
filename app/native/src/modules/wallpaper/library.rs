//! Wallpaper library scanning.
//!
//! A library is a base directory with one subdirectory per category. Each scan
//! produces a complete [`LibrarySnapshot`] that replaces the previous one; the
//! latest snapshot is published through an observable cell so other components
//! can react to changes.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyeball::{SharedObservable, Subscriber};
use image::ImageFormat;
use natord::compare;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::constants::ALL_CATEGORIES;

/// Bytes read from files without a known extension to detect their format.
const SNIFF_LEN: usize = 32;

/// Image formats accepted into the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImageKind {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "image/gif")]
    Gif,
}

impl ImageKind {
    /// Maps a file extension (case-insensitive) to a kind.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    const fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::WebP => Some(Self::Webp),
            ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    /// Returns the MIME type.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }
}

/// A single image discovered in the library. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperImage {
    pub name: String,
    pub path: PathBuf,
    pub category: String,
    pub size: u64,
    pub content_type: ImageKind,
}

impl WallpaperImage {
    /// Describes a single file outside of a scan. The category is the name of
    /// the parent directory.
    ///
    /// Returns `Ok(None)` if the file is not a supported image.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file's metadata cannot be read.
    pub fn from_file(path: &Path) -> io::Result<Option<Self>> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let Some(content_type) = classify(path) else { return Ok(None) };
        let file_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());

        Ok(Some(Self {
            name: file_name(path).unwrap_or_default(),
            path: path.to_path_buf(),
            category: path.parent().and_then(file_name).unwrap_or_default(),
            size: metadata.len(),
            content_type,
        }))
    }
}

/// The result of one library scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySnapshot {
    pub base: PathBuf,
    /// Category names, sorted.
    pub categories: Vec<String>,
    /// Images grouped by category in category order, natural-sorted by name.
    pub images: Vec<WallpaperImage>,
    /// Categories that exist but could not be read.
    pub skipped: Vec<String>,
}

impl LibrarySnapshot {
    /// An empty snapshot for `base`.
    #[must_use]
    pub fn empty(base: impl Into<PathBuf>) -> Self { Self { base: base.into(), ..Self::default() } }

    #[must_use]
    pub fn len(&self) -> usize { self.images.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.images.is_empty() }

    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        category == ALL_CATEGORIES || self.categories.iter().any(|c| c == category)
    }

    /// Returns the images of `category`, or every image for `all`.
    #[must_use]
    pub fn images_in(&self, category: &str) -> Vec<WallpaperImage> {
        if category == ALL_CATEGORIES {
            return self.images.clone();
        }
        self.images.iter().filter(|image| image.category == category).cloned().collect()
    }

    /// Returns each category with its image count, in category order.
    #[must_use]
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        self.categories
            .iter()
            .map(|category| {
                let count = self.images.iter().filter(|image| &image.category == category).count();
                (category.clone(), count)
            })
            .collect()
    }

    /// Looks up an image by path.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&WallpaperImage> {
        self.images.iter().find(|image| image.path == path)
    }
}

/// Errors that can occur while scanning the library base directory.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Wallpaper directory does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Wallpaper path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Scans a library directory and keeps the latest snapshot observable.
#[derive(Clone)]
pub struct LibraryScanner {
    base: PathBuf,
    snapshot: SharedObservable<Arc<LibrarySnapshot>>,
}

impl LibraryScanner {
    /// Creates a scanner for `base`. Nothing is read until [`Self::scan`].
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let snapshot = SharedObservable::new(Arc::new(LibrarySnapshot::empty(base.clone())));
        Self { base, snapshot }
    }

    #[must_use]
    pub fn base(&self) -> &Path { &self.base }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<LibrarySnapshot> { self.snapshot.get() }

    /// Subscribes to snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> Subscriber<Arc<LibrarySnapshot>> { self.snapshot.subscribe() }

    /// Scans the library and publishes the result.
    ///
    /// On failure an empty snapshot is published so stale images are never
    /// offered for selection.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` if the base directory is missing or unreadable.
    /// Unreadable category directories are not errors.
    pub async fn scan(&self) -> Result<Arc<LibrarySnapshot>, ScanError> {
        match scan_library(&self.base).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot.set(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(err) => {
                self.snapshot.set(Arc::new(LibrarySnapshot::empty(self.base.clone())));
                Err(err)
            }
        }
    }
}

/// Scans `base` on the blocking pool.
///
/// # Errors
///
/// Returns `ScanError` if the base directory is missing or unreadable.
pub async fn scan_library(base: &Path) -> Result<LibrarySnapshot, ScanError> {
    let base = base.to_path_buf();
    let task_base = base.clone();

    tokio::task::spawn_blocking(move || scan_library_blocking(&task_base))
        .await
        .map_err(|err| ScanError::Io { path: base, source: io::Error::other(err.to_string()) })?
}

/// Synchronous scan. Category directories are read in parallel.
///
/// # Errors
///
/// Returns `ScanError` if the base directory is missing or unreadable.
pub fn scan_library_blocking(base: &Path) -> Result<LibrarySnapshot, ScanError> {
    let categories = list_categories(base)?;

    let outcomes: Vec<_> = categories
        .par_iter()
        .map(|(name, dir)| (name.clone(), scan_category(name, dir)))
        .collect();

    let snapshot = collect_snapshot(base, outcomes);
    tracing::debug!(
        base = %base.display(),
        categories = snapshot.categories.len(),
        images = snapshot.images.len(),
        skipped = snapshot.skipped.len(),
        "library scanned"
    );
    Ok(snapshot)
}

/// Lists the category subdirectories of `base`, sorted by name.
///
/// Symbolic links and hidden directories are not categories.
///
/// # Errors
///
/// Returns `ScanError` if `base` is missing, not a directory, or unreadable.
pub fn list_categories(base: &Path) -> Result<Vec<(String, PathBuf)>, ScanError> {
    let entries = fs::read_dir(base).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ScanError::NotFound(base.to_path_buf()),
        io::ErrorKind::NotADirectory => ScanError::NotADirectory(base.to_path_buf()),
        _ if base.is_file() => ScanError::NotADirectory(base.to_path_buf()),
        _ => ScanError::Io { path: base.to_path_buf(), source },
    })?;

    let mut categories: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            (!name.starts_with('.')).then(|| (name, entry.path()))
        })
        .collect();

    categories.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(categories)
}

/// Reads the images of one category directory, natural-sorted by name.
///
/// # Errors
///
/// Returns the I/O error if the directory itself cannot be listed.
pub fn scan_category(category: &str, dir: &Path) -> io::Result<Vec<WallpaperImage>> {
    let mut images = Vec::new();

    for entry in fs::read_dir(dir)?.flatten() {
        let Ok(kind) = entry.file_type() else { continue };
        if !kind.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let Some(content_type) = classify(&path) else { continue };

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };

        images.push(WallpaperImage {
            name,
            path,
            category: category.to_string(),
            size,
            content_type,
        });
    }

    images.sort_by(|a, b| compare(&a.name, &b.name));
    Ok(images)
}

/// Returns `true` if the path has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).and_then(ImageKind::from_extension).is_some()
}

/// Classifies a file by extension, falling back to its leading bytes.
fn classify(path: &Path) -> Option<ImageKind> {
    let by_extension =
        path.extension().and_then(|ext| ext.to_str()).and_then(ImageKind::from_extension);
    if by_extension.is_some() {
        return by_extension;
    }

    let mut header = Vec::with_capacity(SNIFF_LEN);
    File::open(path).ok()?.take(SNIFF_LEN as u64).read_to_end(&mut header).ok()?;
    image::guess_format(&header).ok().and_then(ImageKind::from_format)
}

/// Merges per-category results into a snapshot, dropping failed categories.
fn collect_snapshot(
    base: &Path,
    outcomes: Vec<(String, io::Result<Vec<WallpaperImage>>)>,
) -> LibrarySnapshot {
    let mut snapshot = LibrarySnapshot::empty(base);

    for (category, outcome) in outcomes {
        match outcome {
            Ok(images) => {
                snapshot.categories.push(category);
                snapshot.images.extend(images);
            }
            Err(err) => {
                tracing::warn!(category = %category, error = %err, "skipping unreadable category");
                snapshot.skipped.push(category);
            }
        }
    }

    snapshot
}
