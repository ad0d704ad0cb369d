//! CLI module for Tapestry.
//!
//! Every command loads the configuration, builds the pipeline services it
//! needs and runs them on a multi-threaded tokio runtime.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::TapestryError;

/// Runs the CLI.
///
/// Parses command-line arguments, initializes logging and executes the
/// appropriate command.
///
/// # Errors
///
/// Returns an error if the runtime cannot be started or the command fails.
pub fn run() -> Result<(), TapestryError> {
    let cli = Cli::parse();
    crate::init_logging(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(cli.execute())
}
