//! Selection state and its transitions.
//!
//! Transitions are plain functions over [`SelectionState`] so they can be
//! tested without running the actor.

use serde::Serialize;

use crate::constants::ALL_CATEGORIES;
use crate::modules::wallpaper::library::{LibrarySnapshot, WallpaperImage};

/// What the user is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selected_category: String,
    /// Categories of the current library, sorted.
    pub categories: Vec<String>,
    /// Images of the selected category, or the whole library for `all`.
    pub filtered_images: Vec<WallpaperImage>,
    /// Image shown in the preview, if any.
    pub selected_image: Option<WallpaperImage>,
    /// Always equal to `selected_image.is_some()`.
    pub preview_visible: bool,
    /// Last image applied successfully during this session.
    pub current_wallpaper: Option<WallpaperImage>,
}

impl SelectionState {
    /// Initial state over `library`.
    ///
    /// With `start_with_first_category`, the first category is selected when
    /// the library has one; otherwise `all`.
    #[must_use]
    pub fn initial(library: &LibrarySnapshot, start_with_first_category: bool) -> Self {
        let mut state = Self {
            selected_category: initial_category(library, start_with_first_category),
            categories: library.categories.clone(),
            ..Self::default()
        };
        state.filtered_images = library.images_in(&state.selected_category);
        state
    }

    /// Selects `category` and recomputes the filtered images.
    pub fn select_category(&mut self, library: &LibrarySnapshot, category: &str) {
        self.selected_category = category.to_string();
        self.filtered_images = library.images_in(category);
    }

    /// Opens the preview for `image`.
    pub fn select_image(&mut self, image: WallpaperImage) {
        self.selected_image = Some(image);
        self.preview_visible = true;
    }

    pub fn close_preview(&mut self) {
        self.selected_image = None;
        self.preview_visible = false;
    }

    /// Records a successful apply and closes the preview.
    pub fn applied(&mut self, image: WallpaperImage) {
        self.background_set(image);
        self.close_preview();
    }

    /// Records a background that was set even though theming failed. The
    /// preview stays open.
    pub fn background_set(&mut self, image: WallpaperImage) {
        self.current_wallpaper = Some(image);
    }

    /// Adopts a freshly scanned library.
    ///
    /// The selected category is kept while it still exists; otherwise the
    /// initial category is used. A selected image that disappeared closes the
    /// preview.
    pub fn library_changed(
        &mut self,
        library: &LibrarySnapshot,
        keep_category: bool,
        start_with_first_category: bool,
    ) {
        self.categories = library.categories.clone();

        if !keep_category || !library.has_category(&self.selected_category) {
            self.selected_category = initial_category(library, start_with_first_category);
        }
        self.filtered_images = library.images_in(&self.selected_category);

        if let Some(selected) = &self.selected_image
            && library.find(&selected.path).is_none()
        {
            self.close_preview();
        }
    }
}

fn initial_category(library: &LibrarySnapshot, start_with_first_category: bool) -> String {
    if start_with_first_category && let Some(first) = library.categories.first() {
        return first.clone();
    }
    ALL_CATEGORIES.to_string()
}
