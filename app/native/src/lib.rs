//! Tapestry - pick a wallpaper from a categorized library, set it as the
//! desktop background and regenerate the color theme from it.
//!
//! The pipeline lives in [`modules::wallpaper`]; the [`cli`] module wires it
//! to the `tapestry` binary.

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod modules;
pub mod platform;
pub mod schema;
pub mod utils;

use tracing_subscriber::EnvFilter;

/// Initializes structured logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `info` (0),
/// `debug` (1) or `trace` (2 and above) for this crate.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tapestry_lib={level},tapestry={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
