//! Thumbnail generation and caching.
//!
//! Thumbnails are scaled so the longer side matches the requested size. The
//! cache is a bounded LRU keyed by source path, and at most one generation is
//! in flight per path: a request for a path that is already being generated
//! returns `None` immediately instead of decoding the image a second time.

use std::collections::HashSet;
use std::io::Cursor;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::imageops::FilterType;
use image::{ImageFormat, ImageReader, RgbaImage};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::ThumbnailConfig;

/// Errors that can occur while producing a thumbnail.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Thumbnail size must be at least 1 pixel")]
    InvalidSize,

    #[error("Failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Thumbnail worker failed: {0}")]
    Worker(String),
}

/// A scaled RGBA preview of a library image.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    target: u32,
    pixels: RgbaImage,
}

impl Thumbnail {
    #[must_use]
    pub fn width(&self) -> u32 { self.pixels.width() }

    #[must_use]
    pub fn height(&self) -> u32 { self.pixels.height() }

    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage { &self.pixels }

    /// Encodes the thumbnail as PNG.
    ///
    /// # Errors
    ///
    /// Returns `ThumbnailError::Encode` if the encoder fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, ThumbnailError> {
        let mut buffer = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|err| ThumbnailError::Encode(err.to_string()))?;
        Ok(buffer.into_inner())
    }

    /// Writes the thumbnail to `path` as PNG, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_png(&self, path: &Path) -> Result<(), ThumbnailError> {
        let bytes = self.encode_png()?;
        let write_err = |source| ThumbnailError::Write { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, bytes).map_err(write_err)
    }
}

/// Computes output dimensions whose longer side equals `target`.
///
/// Aspect ratio is preserved within rounding and neither side drops below 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn thumbnail_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (target, target);
    }

    let aspect = f64::from(width) / f64::from(height);
    let target_f = f64::from(target);

    if aspect > 1.0 {
        (target, ((target_f / aspect).round() as u32).max(1))
    } else {
        (((target_f * aspect).round() as u32).max(1), target)
    }
}

/// Decodes `path` and scales it with a bilinear filter.
///
/// # Errors
///
/// Returns `ThumbnailError::Decode` if the file cannot be read or decoded.
pub fn generate_thumbnail(path: &Path, target: u32) -> Result<Thumbnail, ThumbnailError> {
    if target == 0 {
        return Err(ThumbnailError::InvalidSize);
    }

    let decode_err = |reason: String| ThumbnailError::Decode { path: path.to_path_buf(), reason };
    let source = ImageReader::open(path)
        .map_err(|err| decode_err(err.to_string()))?
        .with_guessed_format()
        .map_err(|err| decode_err(err.to_string()))?
        .decode()
        .map_err(|err| decode_err(err.to_string()))?;

    let (width, height) = thumbnail_dimensions(source.width(), source.height(), target);
    let pixels = source.resize_exact(width, height, FilterType::Triangle).to_rgba8();

    Ok(Thumbnail { target, pixels })
}

/// Cache counters, as returned by [`ThumbnailCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThumbnailStats {
    pub hits: u64,
    pub misses: u64,
    pub decodes: u64,
    pub failures: u64,
    pub cached: usize,
    pub pending: usize,
}

struct CacheState {
    entries: LruCache<PathBuf, Arc<Thumbnail>>,
    pending: HashSet<PathBuf>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    decodes: AtomicU64,
    failures: AtomicU64,
}

struct Inner {
    state: Mutex<CacheState>,
    permits: Semaphore,
    counters: Counters,
}

/// Releases a pending marker when generation ends, however it ends.
struct PendingGuard {
    inner: Arc<Inner>,
    path: PathBuf,
}

impl Drop for PendingGuard {
    fn drop(&mut self) { self.inner.state.lock().pending.remove(&self.path); }
}

/// Bounded, deduplicating thumbnail cache. Cloning shares the cache.
#[derive(Clone)]
pub struct ThumbnailCache {
    inner: Arc<Inner>,
}

impl ThumbnailCache {
    /// Creates a cache holding at most `capacity` thumbnails and generating at
    /// most `workers` at a time. Both are raised to 1 if zero.
    #[must_use]
    pub fn new(capacity: usize, workers: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState {
                    entries: LruCache::new(capacity),
                    pending: HashSet::new(),
                }),
                permits: Semaphore::new(workers.max(1)),
                counters: Counters::default(),
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &ThumbnailConfig) -> Self {
        Self::new(config.capacity, config.effective_workers())
    }

    /// Returns the cached thumbnail for `path`, generating it if needed.
    ///
    /// Returns `Ok(None)` when a generation for `path` is already in flight.
    /// A cached thumbnail of a different size is regenerated.
    ///
    /// # Errors
    ///
    /// Returns `ThumbnailError` if the image cannot be decoded. Failures are
    /// not cached; a later call tries again.
    pub async fn get_or_generate(
        &self,
        path: &Path,
        size: u32,
    ) -> Result<Option<Arc<Thumbnail>>, ThumbnailError> {
        if size == 0 {
            return Err(ThumbnailError::InvalidSize);
        }

        let counters = &self.inner.counters;
        let guard = {
            let mut state = self.inner.state.lock();

            if let Some(thumbnail) = state.entries.get(path)
                && thumbnail.target == size
            {
                counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(Arc::clone(thumbnail)));
            }

            if state.pending.contains(path) {
                return Ok(None);
            }

            // A pending path never has a cache entry; drop the other-size one.
            state.entries.pop(path);
            counters.misses.fetch_add(1, Ordering::Relaxed);
            state.pending.insert(path.to_path_buf());
            PendingGuard { inner: Arc::clone(&self.inner), path: path.to_path_buf() }
        };

        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|err| ThumbnailError::Worker(err.to_string()))?;

        counters.decodes.fetch_add(1, Ordering::Relaxed);
        let source = path.to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || generate_thumbnail(&source, size))
            .await
            .map_err(|err| ThumbnailError::Worker(err.to_string()))
            .and_then(|result| result);

        let thumbnail = match outcome {
            Ok(thumbnail) => Arc::new(thumbnail),
            Err(err) => {
                counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(path = %path.display(), error = %err, "thumbnail generation failed");
                return Err(err);
            }
        };

        {
            let mut state = self.inner.state.lock();
            state.pending.remove(path);
            state.entries.put(path.to_path_buf(), Arc::clone(&thumbnail));
        }
        drop(guard);

        Ok(Some(thumbnail))
    }

    /// Returns `true` if a thumbnail for `path` is cached.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool { self.inner.state.lock().entries.contains(path) }

    /// Returns `true` if a thumbnail for `path` is being generated.
    #[must_use]
    pub fn is_pending(&self, path: &Path) -> bool { self.inner.state.lock().pending.contains(path) }

    /// Drops the cached thumbnail for `path`.
    pub fn invalidate(&self, path: &Path) { self.inner.state.lock().entries.pop(path); }

    /// Drops every cached thumbnail. In-flight generations are unaffected.
    pub fn clear(&self) { self.inner.state.lock().entries.clear(); }

    #[must_use]
    pub fn stats(&self) -> ThumbnailStats {
        let (cached, pending) = {
            let state = self.inner.state.lock();
            (state.entries.len(), state.pending.len())
        };
        let counters = &self.inner.counters;

        ThumbnailStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            decodes: counters.decodes.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            cached,
            pending,
        }
    }
}
