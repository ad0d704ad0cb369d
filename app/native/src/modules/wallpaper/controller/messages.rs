//! Message types for the selection controller.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::state::SelectionState;
use crate::modules::wallpaper::desktop::ApplyError;
use crate::modules::wallpaper::library::{LibrarySnapshot, ScanError, WallpaperImage};
use crate::modules::wallpaper::theme::{ThemeError, ThemeResult};

/// Messages sent to the selection controller.
#[derive(Debug)]
pub enum ControllerMessage {
    /// Show the images of a category (`all` for everything).
    SelectCategory { category: String },

    /// Open the preview for an image.
    SelectImage { image: WallpaperImage },

    /// Close the preview.
    ClosePreview,

    /// Set an image as the background, then regenerate the theme.
    Apply {
        image: WallpaperImage,
        respond_to: oneshot::Sender<ApplyOutcome>,
    },

    /// Scan the library again.
    Rescan {
        respond_to: Option<oneshot::Sender<Result<Arc<LibrarySnapshot>, ScanError>>>,
    },

    /// Read the current state.
    Query { respond_to: oneshot::Sender<SelectionState> },

    /// Stop the controller.
    Shutdown,
}

impl ControllerMessage {
    /// Message name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectCategory { .. } => "SelectCategory",
            Self::SelectImage { .. } => "SelectImage",
            Self::ClosePreview => "ClosePreview",
            Self::Apply { .. } => "Apply",
            Self::Rescan { .. } => "Rescan",
            Self::Query { .. } => "Query",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Result of one apply.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// The background was set. `theme` is `None` when theme generation is
    /// disabled.
    Applied {
        image: WallpaperImage,
        theme: Option<ThemeResult>,
    },

    /// The background could not be set; the theme was not attempted.
    BackgroundFailed { image: WallpaperImage, error: ApplyError },

    /// The background was set but the theme failed.
    ThemeFailed { image: WallpaperImage, error: ThemeError },
}

impl ApplyOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool { matches!(self, Self::Applied { .. }) }

    #[must_use]
    pub const fn image(&self) -> &WallpaperImage {
        match self {
            Self::Applied { image, .. }
            | Self::BackgroundFailed { image, .. }
            | Self::ThemeFailed { image, .. } => image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names() {
        assert_eq!(ControllerMessage::ClosePreview.name(), "ClosePreview");
        assert_eq!(ControllerMessage::Shutdown.name(), "Shutdown");
        assert_eq!(ControllerMessage::Rescan { respond_to: None }.name(), "Rescan");
        assert_eq!(
            ControllerMessage::SelectCategory { category: "nature".into() }.name(),
            "SelectCategory"
        );
    }
}
