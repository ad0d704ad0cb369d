//! Library directory watcher.
//!
//! Watches the library base directory recursively and asks the selection
//! controller to rescan when files change. Bursts of events (a copy of many
//! images, an editor writing through a temp file) collapse into one rescan.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::controller::ControllerHandle;

/// Quiet period after the last event before a rescan is requested.
const LIBRARY_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Active watch on a library directory. Dropping it stops watching.
pub struct LibraryWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for LibraryWatcher {
    fn drop(&mut self) { self.task.abort(); }
}

/// Starts watching `base` and requesting rescans from `controller`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns `WatchError` if the platform watcher cannot be created or `base`
/// cannot be watched.
pub fn watch_library(base: &Path, controller: ControllerHandle) -> Result<LibraryWatcher, WatchError> {
    let watch_err = |source| WatchError::Watch { path: base.to_path_buf(), source };
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        match event {
            Ok(event) if is_relevant(&event.kind) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "library watch error"),
        }
    })
    .map_err(watch_err)?;

    watcher.watch(base, RecursiveMode::Recursive).map_err(watch_err)?;
    tracing::debug!(path = %base.display(), "watching library");

    let task = tokio::spawn(forward_changes(rx, controller));
    Ok(LibraryWatcher { _watcher: watcher, task })
}

const fn is_relevant(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
}

/// Collapses bursts of change signals into single rescan requests.
async fn forward_changes(mut rx: mpsc::UnboundedReceiver<()>, controller: ControllerHandle) {
    let debounce = Duration::from_millis(LIBRARY_DEBOUNCE_MS);

    while rx.recv().await.is_some() {
        // Keep waiting while events keep arriving.
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(())) => {}
                Ok(None) => return,
                Err(_) => break,
            }
        }

        tracing::debug!("library changed, requesting rescan");
        // Waits while the controller is busy; events arriving meanwhile fold
        // into the next rescan.
        if controller.queue_rescan().await.is_err() {
            tracing::debug!("controller stopped, ending library watch");
            return;
        }
    }
}
