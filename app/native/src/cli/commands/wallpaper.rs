//! Wallpaper pipeline CLI commands.
//!
//! Each command builds the services it needs from the loaded configuration.
//! `apply` goes through the selection controller so the CLI exercises the same
//! transitions an interactive front end would.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use colored::Colorize;
use rand::Rng;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::Commands;
use crate::cache::{format_bytes, get_cache_subdir};
use crate::cli::output;
use crate::config::{self, TapestryConfig};
use crate::constants::ALL_CATEGORIES;
use crate::error::TapestryError;
use crate::modules::wallpaper::{
    ApplyOutcome, ApplyStrategy, ColorThemeGenerator, ControllerHandle, ControllerOptions,
    ControllerServices, DesktopDispatcher, LibraryScanner, LibrarySnapshot, SelectionController,
    ThemeResult, ThumbnailCache, WallpaperImage, watch_library,
};
use crate::modules::wallpaper::library::scan_library;
use crate::modules::wallpaper::thumbnail::generate_thumbnail;
use crate::platform::expand_and_resolve;
use crate::utils::process::{CommandRunner, SystemRunner};

/// Longest image name shown in tables.
const NAME_COLUMN_WIDTH: usize = 48;

/// Thumbnail cache subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ThumbnailCommands {
    /// Generate thumbnails for the library concurrently and report cache
    /// statistics.
    Warm {
        /// Only warm this category.
        #[arg(long)]
        category: Option<String>,
    },
}

/// Configuration and shared services for one CLI invocation.
pub struct Pipeline {
    config: TapestryConfig,
    library_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Pipeline {
    /// Loads the configuration and resolves the library directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn load(config_path: Option<&Path>, library: Option<&str>) -> Result<Self, TapestryError> {
        let loaded = config::load_config(config_path)?;
        let library_dir = match library {
            Some(dir) => expand_and_resolve(dir, &std::env::current_dir()?),
            None => loaded.library_dir(),
        };
        let runner = Arc::new(SystemRunner::new(loaded.config.commands.timeout()));

        tracing::debug!(library = %library_dir.display(), "pipeline configured");
        Ok(Self { config: loaded.config, library_dir, runner })
    }

    fn dispatcher(&self) -> DesktopDispatcher {
        DesktopDispatcher::new(Arc::clone(&self.runner), self.config.desktop.environment.clone())
    }

    fn theme(&self, enabled: bool) -> ColorThemeGenerator {
        let mut config = self.config.theme.clone();
        config.enabled &= enabled;
        ColorThemeGenerator::new(Arc::clone(&self.runner), config)
    }

    fn spawn_controller(&self, theme_enabled: bool) -> ControllerHandle {
        let services = ControllerServices {
            scanner: LibraryScanner::new(self.library_dir.clone()),
            dispatcher: self.dispatcher(),
            theme: self.theme(theme_enabled),
        };
        let options = ControllerOptions {
            start_with_first_category: self.config.library.start_with_first_category,
        };
        SelectionController::spawn(services, options)
    }

    async fn scan(&self) -> Result<LibrarySnapshot, TapestryError> {
        Ok(scan_library(&self.library_dir).await?)
    }
}

/// Execute a pipeline command.
///
/// # Errors
///
/// Returns an error if the command fails.
pub async fn execute(pipeline: &Pipeline, command: &Commands) -> Result<(), TapestryError> {
    match command {
        Commands::Categories { json } => execute_categories(pipeline, *json).await,
        Commands::List { category, json } => {
            execute_list(pipeline, category.as_deref(), *json).await
        }
        Commands::Apply { path, random, category, no_theme } => {
            let target = ApplyTarget::from_args(path.as_deref(), *random, category.as_deref())?;
            let outcome = apply_target(pipeline, target, !no_theme).await?;
            report_outcome(outcome)
        }
        Commands::Theme { path, json } => execute_theme(pipeline, path, *json).await,
        Commands::Detect => {
            execute_detect(pipeline);
            Ok(())
        }
        Commands::Thumbnail { path, output, size } => {
            execute_thumbnail(pipeline, path, output.as_deref(), *size).await
        }
        Commands::Thumbnails(ThumbnailCommands::Warm { category }) => {
            execute_warm(pipeline, category.as_deref()).await
        }
        Commands::Watch => execute_watch(pipeline).await,
        // Handled before a pipeline is built.
        Commands::Schema | Commands::Completions { .. } => Ok(()),
    }
}

// ============================================================================
// Library listing
// ============================================================================

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    name: String,
    #[tabled(rename = "Images")]
    images: usize,
}

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Type")]
    content_type: &'static str,
    #[tabled(rename = "Size")]
    size: String,
}

fn category_rows(library: &LibrarySnapshot) -> Vec<CategoryRow> {
    library
        .category_counts()
        .into_iter()
        .map(|(name, images)| CategoryRow { name, images })
        .collect()
}

async fn execute_categories(pipeline: &Pipeline, json: bool) -> Result<(), TapestryError> {
    let library = pipeline.scan().await?;

    if json {
        let categories: Vec<_> = library
            .category_counts()
            .into_iter()
            .map(|(name, count)| serde_json::json!({ "name": name, "count": count }))
            .collect();
        output::print_highlighted_json(&serde_json::json!({
            "base": library.base,
            "total": library.len(),
            "categories": categories,
            "skipped": library.skipped,
        }));
        return Ok(());
    }

    if library.categories.is_empty() {
        println!("{}", "No categories found.".dimmed());
    } else {
        let table = Table::new(category_rows(&library))
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
            .to_string();

        println!("{}", format!("Categories ({})", library.categories.len()).bold());
        println!("{table}");
        println!("{} {}", "Total images:".dimmed(), library.len());
    }

    print_skipped(&library);
    Ok(())
}

async fn execute_list(
    pipeline: &Pipeline,
    category: Option<&str>,
    json: bool,
) -> Result<(), TapestryError> {
    let library = pipeline.scan().await?;
    let category = category.unwrap_or(ALL_CATEGORIES);

    if !library.has_category(category) {
        return Err(TapestryError::InvalidArguments(format!("Unknown category: {category}")));
    }

    let images = library.images_in(category);

    if json {
        output::print_json(&images)?;
        return Ok(());
    }

    if images.is_empty() {
        println!("{}", "No wallpapers found.".dimmed());
        return Ok(());
    }

    let rows: Vec<ImageRow> = images
        .iter()
        .map(|image| ImageRow {
            name: output::truncate(&image.name, NAME_COLUMN_WIDTH),
            category: image.category.clone(),
            content_type: image.content_type.mime(),
            size: format_bytes(image.size),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();

    println!("{}", format!("Wallpapers in {category} ({})", images.len()).bold());
    println!("{table}");
    print_skipped(&library);
    Ok(())
}

fn print_skipped(library: &LibrarySnapshot) {
    if !library.skipped.is_empty() {
        println!(
            "{} {}",
            "Skipped unreadable categories:".yellow(),
            library.skipped.join(", ")
        );
    }
}

// ============================================================================
// Apply
// ============================================================================

/// What `apply` should set as the background.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ApplyTarget {
    Path(String),
    Random { category: String },
}

impl ApplyTarget {
    fn from_args(
        path: Option<&str>,
        random: bool,
        category: Option<&str>,
    ) -> Result<Self, TapestryError> {
        match (path, random) {
            (Some(_), true) => Err(TapestryError::InvalidArguments(
                "Cannot specify both <PATH> and --random. Use one or the other.".to_string(),
            )),
            (None, false) => Err(TapestryError::InvalidArguments(
                "Either <PATH> or --random must be specified.".to_string(),
            )),
            (Some(path), false) => Ok(Self::Path(path.to_string())),
            (None, true) => Ok(Self::Random {
                category: category.unwrap_or(ALL_CATEGORIES).to_string(),
            }),
        }
    }
}

/// Scans the library, selects the target image and applies it through the
/// controller.
async fn apply_target(
    pipeline: &Pipeline,
    target: ApplyTarget,
    theme_enabled: bool,
) -> Result<ApplyOutcome, TapestryError> {
    let controller = pipeline.spawn_controller(theme_enabled);
    let scanned = controller.rescan().await;

    let image = match target {
        ApplyTarget::Path(raw) => {
            let library = match scanned {
                Ok(library) => library,
                Err(err) => {
                    tracing::debug!(error = %err, "library unavailable, applying file directly");
                    Arc::new(LibrarySnapshot::empty(pipeline.library_dir.clone()))
                }
            };
            resolve_image(&library, &raw)?
        }
        ApplyTarget::Random { category } => {
            let library = scanned?;
            controller.select_category(&category).await?;
            pick_random(&library, &category)?
        }
    };

    controller.select_image(image.clone()).await?;
    let outcome = controller.apply(image).await?;
    let _ = controller.shutdown().await;

    Ok(outcome)
}

/// Finds `raw` in the library, or describes it as a standalone file.
fn resolve_image(library: &LibrarySnapshot, raw: &str) -> Result<WallpaperImage, TapestryError> {
    let path = expand_and_resolve(raw, &std::env::current_dir()?);

    if let Some(image) = library.find(&path) {
        return Ok(image.clone());
    }

    match WallpaperImage::from_file(&path) {
        Ok(Some(image)) => Ok(image),
        Ok(None) => Err(TapestryError::InvalidArguments(format!(
            "Not a supported image: {}",
            path.display()
        ))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(
            TapestryError::InvalidArguments(format!("Image not found: {}", path.display())),
        ),
        Err(err) => Err(err.into()),
    }
}

fn pick_random(library: &LibrarySnapshot, category: &str) -> Result<WallpaperImage, TapestryError> {
    if !library.has_category(category) {
        return Err(TapestryError::InvalidArguments(format!("Unknown category: {category}")));
    }

    let mut images = library.images_in(category);
    if images.is_empty() {
        return Err(TapestryError::LibraryError(format!("No images in category: {category}")));
    }

    let index = rand::rng().random_range(0..images.len());
    Ok(images.swap_remove(index))
}

fn report_outcome(outcome: ApplyOutcome) -> Result<(), TapestryError> {
    match outcome {
        ApplyOutcome::Applied { image, theme } => {
            println!("{} {}", "Wallpaper applied:".green(), image.path.display());
            if let Some(theme) = theme {
                print_theme(&theme);
            }
            Ok(())
        }
        ApplyOutcome::BackgroundFailed { error, .. } => Err(error.into()),
        ApplyOutcome::ThemeFailed { image, error } => {
            println!("{} {}", "Wallpaper applied:".green(), image.path.display());
            Err(error.into())
        }
    }
}

// ============================================================================
// Theme
// ============================================================================

fn print_theme(theme: &ThemeResult) {
    let palette = &theme.palette;
    println!("{}", "Theme".bold());
    for (role, hex) in [
        ("background", &palette.background),
        ("primary", &palette.primary),
        ("secondary", &palette.secondary),
        ("surface", &palette.surface),
    ] {
        println!("  {} {role:<10} {hex}", output::format_swatch(hex));
    }

    for warning in &theme.reload_warnings {
        println!("{} {}: {}", "Reload failed:".yellow(), warning.command, warning.error);
    }
}

async fn execute_theme(pipeline: &Pipeline, raw: &str, json: bool) -> Result<(), TapestryError> {
    let path = expand_and_resolve(raw, &std::env::current_dir()?);
    if !path.is_file() {
        return Err(TapestryError::InvalidArguments(format!(
            "Image not found: {}",
            path.display()
        )));
    }

    let theme = pipeline.theme(true).generate_and_apply(&path).await?;

    if json {
        output::print_json(&theme)?;
    } else {
        print_theme(&theme);
    }
    Ok(())
}

// ============================================================================
// Detect
// ============================================================================

fn execute_detect(pipeline: &Pipeline) {
    let environment = pipeline.dispatcher().detect();
    let strategy = ApplyStrategy::for_environment(&environment);
    let program = strategy.command(Path::new("")).program;
    let installed = pipeline.runner.locate(&program).is_some();

    println!("{} {environment}", "Environment:".bold());
    println!("{} {strategy}", "Strategy:".bold());
    println!("{} {program} {}", "Program:".bold(), output::format_bool(installed));

    if pipeline.config.desktop.environment.is_some() {
        println!("{}", "Environment set by desktop.environment".dimmed());
    }
    if strategy.is_fallback() {
        println!("{}", "No dedicated strategy for this environment, using the fallback.".yellow());
    }
}

// ============================================================================
// Thumbnails
// ============================================================================

/// Default location for a thumbnail of `source`: `<stem>-<size>.png` in the
/// thumbnails cache directory.
fn default_thumbnail_path(source: &Path, size: u32) -> PathBuf {
    let stem = source.file_stem().map_or_else(
        || "thumbnail".to_string(),
        |stem| stem.to_string_lossy().into_owned(),
    );
    get_cache_subdir("thumbnails").join(format!("{stem}-{size}.png"))
}

async fn execute_thumbnail(
    pipeline: &Pipeline,
    raw: &str,
    output: Option<&Path>,
    size: Option<u32>,
) -> Result<(), TapestryError> {
    let source = expand_and_resolve(raw, &std::env::current_dir()?);
    let size = size.unwrap_or(pipeline.config.thumbnails.size);
    let output = output.map_or_else(|| default_thumbnail_path(&source, size), Path::to_path_buf);
    let target = output.clone();

    let (width, height) = tokio::task::spawn_blocking(move || {
        let thumbnail = generate_thumbnail(&source, size)?;
        thumbnail.save_png(&target)?;
        Ok::<_, TapestryError>((thumbnail.width(), thumbnail.height()))
    })
    .await
    .map_err(|err| TapestryError::ThumbnailError(err.to_string()))??;

    println!("{} {} ({width}x{height})", "Thumbnail written:".green(), output.display());
    Ok(())
}

async fn execute_warm(pipeline: &Pipeline, category: Option<&str>) -> Result<(), TapestryError> {
    let library = pipeline.scan().await?;
    let category = category.unwrap_or(ALL_CATEGORIES);

    if !library.has_category(category) {
        return Err(TapestryError::InvalidArguments(format!("Unknown category: {category}")));
    }

    let images = library.images_in(category);
    let size = pipeline.config.thumbnails.size;
    let cache = ThumbnailCache::from_config(&pipeline.config.thumbnails);

    let failures = warm_cache(&cache, &images, size).await;
    let stats = cache.stats();

    println!(
        "{} {} of {} thumbnails in {}",
        "Generated".green(),
        stats.decodes.saturating_sub(stats.failures),
        images.len(),
        category
    );
    println!(
        "{} hits {}, misses {}, cached {}",
        "Cache:".dimmed(),
        stats.hits,
        stats.misses,
        stats.cached
    );

    for (path, error) in &failures {
        println!("{} {}: {error}", "Failed:".red(), path.display());
    }
    Ok(())
}

/// Generates thumbnails for `images` concurrently, returning the failures.
async fn warm_cache(
    cache: &ThumbnailCache,
    images: &[WallpaperImage],
    size: u32,
) -> Vec<(PathBuf, String)> {
    let jobs = images.iter().map(|image| async move {
        let result = cache.get_or_generate(&image.path, size).await;
        (image.path.clone(), result)
    });

    futures::future::join_all(jobs)
        .await
        .into_iter()
        .filter_map(|(path, result)| result.err().map(|err| (path, err.to_string())))
        .collect()
}

// ============================================================================
// Watch
// ============================================================================

async fn execute_watch(pipeline: &Pipeline) -> Result<(), TapestryError> {
    let controller = pipeline.spawn_controller(false);
    controller.rescan().await?;

    let _watcher = watch_library(&pipeline.library_dir, controller.clone())?;
    let mut states = controller.subscribe();

    print_library_summary(&controller.current());
    println!("{} {}", "Watching".bold(), pipeline.library_dir.display());

    loop {
        tokio::select! {
            state = states.next() => {
                let Some(state) = state else { break };
                print_library_summary(&state);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = controller.shutdown().await;
    Ok(())
}

fn print_library_summary(state: &crate::modules::wallpaper::SelectionState) {
    println!(
        "{} {} categories, {} images in {}",
        "Library:".cyan(),
        state.categories.len(),
        state.filtered_images.len(),
        state.selected_category
    );
}
