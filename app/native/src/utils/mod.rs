//! Shared utilities.

pub mod command;
pub mod process;

pub use command::resolve_binary;
pub use process::{CommandError, CommandOutput, CommandRunner, CommandSpec, SystemRunner};
