//! CLI command definitions using Clap.
//!
//! - `wallpaper` - library, apply, theme and thumbnail commands

use std::io;
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::error::TapestryError;
use crate::schema;

pub mod wallpaper;

pub use wallpaper::ThumbnailCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tapestry CLI - pick wallpapers from a categorized library and theme the
/// desktop after them.
#[derive(Parser, Debug)]
#[command(name = "tapestry")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Library directory, overriding `library.path` from the configuration.
    #[arg(long, short, global = true, value_name = "DIR")]
    pub library: Option<String>,

    /// Raise the log level (-v debug, -vv trace).
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// List library categories with their image counts.
    Categories {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List library images.
    List {
        /// Only list images of this category.
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Set the desktop background and regenerate the color theme.
    ///
    /// Apply a specific image by path, or use --random to pick one from the
    /// library (optionally restricted to a category).
    #[command(
        verbatim_doc_comment,
        after_long_help = r#"Examples:
  tapestry apply ~/Pictures/wallpapers/nature/forest.png
  tapestry apply --random
  tapestry apply --random --category nature
  tapestry apply --random --no-theme"#
    )]
    Apply {
        /// The image to apply.
        #[arg(value_name = "PATH")]
        path: Option<String>,

        /// Apply a random image from the library.
        #[arg(long, short)]
        random: bool,

        /// Category to pick a random image from.
        #[arg(long, requires = "random")]
        category: Option<String>,

        /// Only set the background; skip theme generation.
        #[arg(long)]
        no_theme: bool,
    },

    /// Generate and apply the color theme for an image without changing the
    /// background.
    Theme {
        /// The image to extract colors from.
        #[arg(value_name = "PATH")]
        path: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the detected desktop environment and how the background would be
    /// set.
    Detect,

    /// Generate one thumbnail and write it as PNG.
    Thumbnail {
        /// The source image.
        #[arg(value_name = "PATH")]
        path: String,

        /// Where to write the PNG. Defaults to the thumbnails cache directory.
        #[arg(long, short, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Longest side in pixels. Defaults to `thumbnails.size`.
        #[arg(long, short)]
        size: Option<u32>,
    },

    /// Thumbnail cache commands.
    #[command(subcommand)]
    Thumbnails(ThumbnailCommands),

    /// Watch the library and rescan on every change until interrupted.
    Watch,

    /// Output Tapestry configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// Tapestry configuration file. Can be redirected to a file for use with
    /// editors that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    /// Can be used with eval or redirected to a file.
    ///
    /// Usage:
    ///   eval "$(tapestry completions --shell zsh)"
    ///   tapestry completions --shell bash > ~/.local/share/bash-completion/completions/tapestry
    ///   tapestry completions --shell fish > ~/.config/fish/completions/tapestry.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub async fn execute(&self) -> Result<(), TapestryError> {
        match &self.command {
            Commands::Schema => {
                println!("{}", schema::print_schema());
                Ok(())
            }
            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
            command => {
                let pipeline =
                    wallpaper::Pipeline::load(self.config.as_deref(), self.library.as_deref())?;
                wallpaper::execute(&pipeline, command).await
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "tapestry", &mut io::stdout());
    }
}
