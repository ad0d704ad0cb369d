#![allow(clippy::multiple_crate_versions)]

//! Tapestry command-line entry point.

fn main() {
    if let Err(err) = tapestry_lib::cli::run() {
        eprintln!("tapestry: {err}");
        std::process::exit(1);
    }
}
