//! External process execution.
//!
//! Every external program the pipeline touches (background setters, the theme
//! tool, reload signals) goes through a [`CommandRunner`]. The production
//! runner spawns processes with `tokio::process` and enforces a timeout; tests
//! substitute a recording fake.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use super::command::resolve_binary;

/// A program plus its arguments, passed to the OS without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Runs `line` through `sh -c`.
    #[must_use]
    pub fn shell(line: &str) -> Self { Self::new("sh").arg("-c").arg(line) }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Errors from running an external command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The process could not be started.
    #[error("failed to start `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// The process exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The process did not finish in time and was killed.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Executes external commands and locates binaries.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion.
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
    ) -> BoxFuture<'a, Result<CommandOutput, CommandError>>;

    /// Returns the resolved path of `binary`, if it is installed.
    fn locate(&self, binary: &str) -> Option<PathBuf>;
}

/// Runs commands on the host with a bounded timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self { Self { timeout } }
}

impl CommandRunner for SystemRunner {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
    ) -> BoxFuture<'a, Result<CommandOutput, CommandError>> {
        Box::pin(async move {
            let line = command.to_string();
            tracing::debug!(command = %line, "running external command");

            let mut process = tokio::process::Command::new(&command.program);
            process
                .args(&command.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                // Dropping the future on timeout must not leave the child running.
                .kill_on_drop(true);

            let output = match tokio::time::timeout(self.timeout, process.output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(err)) => {
                    return Err(CommandError::Spawn { command: line, reason: err.to_string() });
                }
                Err(_) => {
                    return Err(CommandError::Timeout { command: line, timeout: self.timeout });
                }
            };

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            if output.status.success() {
                Ok(CommandOutput { stdout, stderr })
            } else {
                Err(CommandError::Failed {
                    command: line,
                    status: output.status.to_string(),
                    stderr,
                })
            }
        })
    }

    fn locate(&self, binary: &str) -> Option<PathBuf> { resolve_binary(binary).ok() }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_display() {
        let spec = CommandSpec::new("feh").arg("--bg-scale").arg("/walls/a b.png");
        assert_eq!(spec.to_string(), "feh --bg-scale /walls/a b.png");
    }

    #[test]
    fn test_command_spec_shell_wraps_line() {
        let spec = CommandSpec::shell("pkill -USR1 kitty");
        assert_eq!(spec.program, "sh");
        assert_eq!(spec.args, vec!["-c".to_string(), "pkill -USR1 kitty".to_string()]);
    }

    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let runner = SystemRunner::new(Duration::from_secs(5));
        let output = runner.run(&CommandSpec::shell("printf hello")).await.unwrap();
        assert_eq!(output.stdout, "hello");
    }

    #[tokio::test]
    async fn test_system_runner_with_debug_logging() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let runner = SystemRunner::new(Duration::from_secs(5));
        let output = runner.run(&CommandSpec::new("echo").arg("logged")).await.unwrap();
        assert_eq!(output.stdout.trim(), "logged");
    }

    #[tokio::test]
    async fn test_system_runner_reports_non_zero_exit() {
        let runner = SystemRunner::new(Duration::from_secs(5));
        let err = runner.run(&CommandSpec::shell("echo nope >&2; exit 3")).await.unwrap_err();
        match err {
            CommandError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "nope");
                assert!(status.contains('3'));
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_system_runner_reports_spawn_failure() {
        let runner = SystemRunner::new(Duration::from_secs(5));
        let err = runner.run(&CommandSpec::new("tapestry_missing_binary_12345")).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_system_runner_times_out() {
        let runner = SystemRunner::new(Duration::from_millis(100));
        let err = runner.run(&CommandSpec::shell("sleep 5")).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_fake_runner_matches_rules_in_order() {
        let runner = fake::FakeRunner::new();
        runner.respond("--json", "{}");
        runner.fail("hyprctl");

        let json = runner.run(&CommandSpec::new("matugen").arg("--json")).await.unwrap();
        assert_eq!(json.stdout, "{}");
        assert!(runner.run(&CommandSpec::shell("hyprctl reload")).await.is_err());
        assert!(runner.run(&CommandSpec::new("true")).await.is_ok());
        assert_eq!(runner.calls().len(), 3);
    }
}
