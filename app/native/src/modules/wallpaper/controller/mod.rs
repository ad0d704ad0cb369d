//! Selection controller.
//!
//! The controller owns the [`SelectionState`] and processes messages
//! sequentially in its own task, so transitions never interleave. Every change
//! is published through an observable cell that handles can subscribe to.
//!
//! # Panic Recovery
//!
//! If a message handler panics, the panic is caught and logged and the
//! controller keeps processing subsequent messages. A panicking `Apply` or
//! `Rescan` drops its responder, which the caller sees as
//! [`ActorError::ReceiveFailed`].

mod handle;
mod messages;
mod state;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use eyeball::SharedObservable;
use futures::FutureExt;
pub use handle::{ActorError, ControllerHandle, RescanError};
pub use messages::{ApplyOutcome, ControllerMessage};
pub use state::SelectionState;
use tokio::sync::mpsc;

use super::desktop::DesktopDispatcher;
use super::library::{LibraryScanner, LibrarySnapshot, ScanError, WallpaperImage};
use super::theme::ColorThemeGenerator;

/// Channel buffer size for the controller.
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Services the controller drives.
#[derive(Clone)]
pub struct ControllerServices {
    pub scanner: LibraryScanner,
    pub dispatcher: DesktopDispatcher,
    pub theme: ColorThemeGenerator,
}

/// Behavior switches for the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptions {
    /// Select the first category instead of `all` until the user picks one.
    pub start_with_first_category: bool,
}

/// The actor that owns the selection state.
pub struct SelectionController {
    state: SelectionState,
    library: Arc<LibrarySnapshot>,
    /// Whether the user picked a category, as opposed to the initial default.
    category_chosen: bool,
    published: SharedObservable<SelectionState>,
    services: ControllerServices,
    options: ControllerOptions,
    receiver: mpsc::Receiver<ControllerMessage>,
}

impl SelectionController {
    /// Spawn the controller on the current tokio runtime.
    ///
    /// The initial state is built from the scanner's current snapshot; call
    /// [`ControllerHandle::rescan`] to load the library.
    #[must_use]
    pub fn spawn(services: ControllerServices, options: ControllerOptions) -> ControllerHandle {
        tracing::debug!("spawning selection controller");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let library = services.scanner.snapshot();
        let state = SelectionState::initial(&library, options.start_with_first_category);
        let published = SharedObservable::new(state.clone());

        let actor = Self {
            state,
            library,
            category_chosen: false,
            published: published.clone(),
            services,
            options,
            receiver,
        };

        tokio::spawn(actor.run());

        ControllerHandle::new(sender, published)
    }

    /// Run the message loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, ControllerMessage::Shutdown) {
                tracing::debug!("selection controller received shutdown message");
                return;
            }

            let msg_name = msg.name();
            let result = AssertUnwindSafe(self.handle_message(msg)).catch_unwind().await;

            if let Err(panic_info) = result {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                tracing::error!(
                    message = msg_name,
                    panic = %panic_msg,
                    "selection controller recovered from panic"
                );
            }

            self.publish();
        }

        tracing::debug!("selection controller channel closed, exiting");
    }

    async fn handle_message(&mut self, msg: ControllerMessage) {
        match msg {
            ControllerMessage::SelectCategory { category } => {
                self.category_chosen = true;
                self.state.select_category(&self.library, &category);
            }
            ControllerMessage::SelectImage { image } => self.state.select_image(image),
            ControllerMessage::ClosePreview => self.state.close_preview(),
            ControllerMessage::Apply { image, respond_to } => {
                let outcome = self.apply(image).await;
                self.publish();
                let _ = respond_to.send(outcome);
            }
            ControllerMessage::Rescan { respond_to } => {
                let result = self.rescan().await;
                self.publish();
                if let Some(respond_to) = respond_to {
                    let _ = respond_to.send(result);
                } else if let Err(err) = result {
                    tracing::warn!(error = %err, "library rescan failed");
                }
            }
            ControllerMessage::Query { respond_to } => {
                let _ = respond_to.send(self.state.clone());
            }
            ControllerMessage::Shutdown => {}
        }
    }

    /// Sets the background, then regenerates the theme.
    ///
    /// A background failure leaves the state untouched. A theme failure still
    /// records the new background but keeps the preview open.
    async fn apply(&mut self, image: WallpaperImage) -> ApplyOutcome {
        let environment = self.services.dispatcher.detect();

        if let Err(error) = self.services.dispatcher.apply(&image.path, &environment).await {
            tracing::warn!(error = %error, image = %image.path.display(), "apply failed");
            return ApplyOutcome::BackgroundFailed { image, error };
        }

        let theme = if self.services.theme.is_enabled() {
            match self.services.theme.generate_and_apply(&image.path).await {
                Ok(result) => Some(result),
                Err(error) => {
                    tracing::warn!(error = %error, image = %image.path.display(), "theme failed");
                    self.state.background_set(image.clone());
                    return ApplyOutcome::ThemeFailed { image, error };
                }
            }
        } else {
            None
        };

        self.state.applied(image.clone());
        ApplyOutcome::Applied { image, theme }
    }

    async fn rescan(&mut self) -> Result<Arc<LibrarySnapshot>, ScanError> {
        let result = self.services.scanner.scan().await;

        // A failed scan publishes an empty library.
        self.library = self.services.scanner.snapshot();
        self.state.library_changed(
            &self.library,
            self.category_chosen,
            self.options.start_with_first_category,
        );

        result
    }

    /// Publishes the state if it changed. Replies are sent after publishing so
    /// callers never observe a stale cell.
    fn publish(&self) { self.published.set_if_not_eq(self.state.clone()); }
}
