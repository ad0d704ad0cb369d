//! Color theme generation from the selected wallpaper.
//!
//! An external tool (matugen by default) extracts a palette from the image and
//! renders the user's templates. Afterwards a list of reload commands notifies
//! dependent applications. Reload failures are collected as warnings and never
//! fail the call.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ThemeConfig;
use crate::utils::process::{CommandError, CommandRunner, CommandSpec};

static HEX_COLOR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new("^#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").ok());

/// Errors that can occur while generating a theme.
#[derive(Debug, Clone, Error)]
pub enum ThemeError {
    /// The color tool is not installed.
    #[error("Color tool '{0}' was not found on the execution path")]
    ToolMissing(String),

    /// The tool ran but its output is not the expected JSON.
    #[error("Unexpected color tool output: {0}")]
    OutputFormat(String),

    /// The tool could not be run or exited unsuccessfully.
    #[error("Color tool failed: {0}")]
    Invocation(#[from] CommandError),
}

/// The four palette roles read from the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: String,
    pub primary: String,
    pub secondary: String,
    pub surface: String,
}

/// A reload command that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadWarning {
    pub command: String,
    pub error: String,
}

/// Outcome of a successful theme generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeResult {
    #[serde(flatten)]
    pub palette: Palette,
    pub reload_warnings: Vec<ReloadWarning>,
}

#[derive(Deserialize)]
struct ToolOutput {
    colors: Option<ToolColors>,
}

#[derive(Deserialize)]
struct ToolColors {
    background: ToolRole,
    primary: ToolRole,
    secondary: ToolRole,
    surface: ToolRole,
}

#[derive(Deserialize)]
struct ToolRole {
    default: ToolColor,
}

/// `{ "hex": "#rrggbb" }`, or the bare string some output modes emit.
#[derive(Deserialize)]
#[serde(untagged)]
enum ToolColor {
    Object { hex: String },
    Hex(String),
}

impl ToolColor {
    fn into_hex(self, role: &str) -> Result<String, ThemeError> {
        let hex = match self {
            Self::Object { hex } | Self::Hex(hex) => hex,
        };

        if HEX_COLOR.as_ref().is_some_and(|re| re.is_match(&hex)) {
            Ok(hex)
        } else {
            Err(ThemeError::OutputFormat(format!("invalid {role} color '{hex}'")))
        }
    }
}

/// Parses the tool's JSON output into a [`Palette`].
///
/// Each role is read from `colors.<role>.default.hex`.
///
/// # Errors
///
/// Returns `ThemeError::OutputFormat` for malformed JSON, a missing `colors`
/// object, a missing role or an invalid hex value.
pub fn parse_palette(output: &str) -> Result<Palette, ThemeError> {
    let parsed: ToolOutput =
        serde_json::from_str(output).map_err(|err| ThemeError::OutputFormat(err.to_string()))?;
    let colors = parsed
        .colors
        .ok_or_else(|| ThemeError::OutputFormat("missing 'colors' object".to_string()))?;

    Ok(Palette {
        background: colors.background.default.into_hex("background")?,
        primary: colors.primary.default.into_hex("primary")?,
        secondary: colors.secondary.default.into_hex("secondary")?,
        surface: colors.surface.default.into_hex("surface")?,
    })
}

/// Runs the color tool and the reload fan-out.
#[derive(Clone)]
pub struct ColorThemeGenerator {
    runner: Arc<dyn CommandRunner>,
    config: ThemeConfig,
}

impl ColorThemeGenerator {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, config: ThemeConfig) -> Self {
        Self { runner, config }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool { self.config.enabled }

    /// Extracts a palette from `path`, applies templates and reloads
    /// dependent applications.
    ///
    /// Templates are applied even when the palette cannot be parsed, and
    /// reload commands run whenever templates were applied. A template failure
    /// is logged and skips the reloads.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::ToolMissing` if the tool is not installed,
    /// `ThemeError::Invocation` if the palette invocation fails, and
    /// `ThemeError::OutputFormat` if its output cannot be parsed.
    pub async fn generate_and_apply(&self, path: &Path) -> Result<ThemeResult, ThemeError> {
        let tool = self
            .runner
            .locate(&self.config.tool)
            .ok_or_else(|| ThemeError::ToolMissing(self.config.tool.clone()))?;
        let base = CommandSpec::new(tool.display().to_string())
            .arg("image")
            .arg(path.display().to_string());

        let json_command = base.clone().args(self.config.json_args.iter().cloned());
        let output = self.runner.run(&json_command).await?;
        let palette = parse_palette(&output.stdout);

        if let Err(err) = &palette {
            tracing::warn!(path = %path.display(), error = %err, "could not read palette");
        }

        let templates_applied = if self.config.single_invocation {
            true
        } else {
            match self.runner.run(&base).await {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(error = %err, "template generation failed, skipping reloads");
                    false
                }
            }
        };

        let reload_warnings =
            if templates_applied { self.reload().await } else { Vec::new() };

        let palette = palette?;
        tracing::info!(
            background = %palette.background,
            primary = %palette.primary,
            warnings = reload_warnings.len(),
            "theme generated"
        );
        Ok(ThemeResult { palette, reload_warnings })
    }

    /// Runs every reload command in order through `sh -c`.
    ///
    /// A failing command is logged and recorded; later commands still run.
    pub async fn reload(&self) -> Vec<ReloadWarning> {
        let mut warnings = Vec::new();

        for line in &self.config.reload_commands {
            if line.trim().is_empty() {
                continue;
            }

            if let Err(err) = self.runner.run(&CommandSpec::shell(line)).await {
                tracing::warn!(command = %line, error = %err, "reload command failed");
                warnings.push(ReloadWarning { command: line.clone(), error: err.to_string() });
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::process::fake::FakeRunner;

    const VALID_OUTPUT: &str = r##"{
        "image": "/walls/a.png",
        "colors": {
            "background": { "default": { "hex": "#101010" } },
            "primary": { "default": { "hex": "#A1B2C3" } },
            "secondary": { "default": { "hex": "#223344" } },
            "surface": { "default": { "hex": "#0a0b0cff" } },
            "tertiary": { "default": { "hex": "#445566" } }
        }
    }"##;

    fn generator(runner: &Arc<FakeRunner>, config: ThemeConfig) -> ColorThemeGenerator {
        ColorThemeGenerator::new(runner.clone(), config)
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_palette() {
        let palette = parse_palette(VALID_OUTPUT).unwrap();
        assert_eq!(palette.background, "#101010");
        assert_eq!(palette.primary, "#A1B2C3");
        assert_eq!(palette.secondary, "#223344");
        assert_eq!(palette.surface, "#0a0b0cff");
    }

    #[test]
    fn test_parse_palette_accepts_bare_strings() {
        let output = r##"{ "colors": {
            "background": { "default": "#000000" },
            "primary": { "default": "#111111" },
            "secondary": { "default": "#222222" },
            "surface": { "default": "#333333" }
        } }"##;
        assert_eq!(parse_palette(output).unwrap().surface, "#333333");
    }

    #[test]
    fn test_parse_palette_malformed_json() {
        let err = parse_palette("{ not json").unwrap_err();
        assert!(matches!(err, ThemeError::OutputFormat(_)));
    }

    #[test]
    fn test_parse_palette_missing_colors() {
        let err = parse_palette(r#"{ "image": "/walls/a.png" }"#).unwrap_err();
        assert!(err.to_string().contains("colors"));
    }

    #[test]
    fn test_parse_palette_missing_role() {
        let output = r##"{ "colors": { "background": { "default": { "hex": "#101010" } } } }"##;
        assert!(matches!(parse_palette(output), Err(ThemeError::OutputFormat(_))));
    }

    #[test]
    fn test_parse_palette_rejects_invalid_hex() {
        let output = VALID_OUTPUT.replace("#223344", "blue");
        let err = parse_palette(&output).unwrap_err();
        assert!(err.to_string().contains("secondary"));
    }

    // ========================================================================
    // Generation
    // ========================================================================

    #[tokio::test]
    async fn test_generate_runs_json_templates_and_reloads_in_order() {
        let runner = Arc::new(FakeRunner::new());
        runner.respond("--json", VALID_OUTPUT);

        let result = generator(&runner, ThemeConfig::default())
            .generate_and_apply(Path::new("/walls/a.png"))
            .await
            .unwrap();

        assert_eq!(result.palette.background, "#101010");
        assert!(result.reload_warnings.is_empty());
        assert_eq!(runner.calls(), vec![
            "/usr/bin/matugen image /walls/a.png --json hex",
            "/usr/bin/matugen image /walls/a.png",
            "sh -c pkill -SIGUSR2 waybar",
            "sh -c hyprctl reload",
            "sh -c pkill -USR1 kitty",
        ]);
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let runner = Arc::new(FakeRunner::new());
        runner.missing("matugen");

        let err = generator(&runner, ThemeConfig::default())
            .generate_and_apply(Path::new("/walls/a.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ThemeError::ToolMissing(ref tool) if tool == "matugen"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output_still_applies_templates() {
        let runner = Arc::new(FakeRunner::new());
        runner.respond("--json", "garbage");

        let err = generator(&runner, ThemeConfig::default())
            .generate_and_apply(Path::new("/walls/a.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ThemeError::OutputFormat(_)));
        assert!(runner.calls().contains(&"/usr/bin/matugen image /walls/a.png".to_string()));
    }

    #[tokio::test]
    async fn test_failed_compositor_reload_still_returns_palette() {
        let runner = Arc::new(FakeRunner::new());
        runner.respond("--json", VALID_OUTPUT);
        runner.fail("hyprctl reload");

        let result = generator(&runner, ThemeConfig::default())
            .generate_and_apply(Path::new("/walls/a.png"))
            .await
            .unwrap();

        assert_eq!(result.palette.primary, "#A1B2C3");
        assert_eq!(result.reload_warnings.len(), 1);
        assert_eq!(result.reload_warnings[0].command, "hyprctl reload");
        // The kitty reload after the failure still ran.
        assert!(runner.calls().iter().any(|c| c.contains("kitty")));
    }

    #[tokio::test]
    async fn test_template_failure_skips_reloads() {
        let runner = Arc::new(FakeRunner::new());
        runner.respond("--json", VALID_OUTPUT);
        runner.fail("matugen image");

        let result = generator(&runner, ThemeConfig::default())
            .generate_and_apply(Path::new("/walls/a.png"))
            .await
            .unwrap();

        assert_eq!(result.palette.surface, "#0a0b0cff");
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_json_invocation_failure_is_error() {
        let runner = Arc::new(FakeRunner::new());
        runner.fail("--json");

        let err = generator(&runner, ThemeConfig::default())
            .generate_and_apply(Path::new("/walls/a.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ThemeError::Invocation(_)));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_single_invocation_mode() {
        let runner = Arc::new(FakeRunner::new());
        runner.respond("--json", VALID_OUTPUT);
        let config = ThemeConfig {
            single_invocation: true,
            reload_commands: vec!["pkill -USR1 kitty".to_string()],
            ..ThemeConfig::default()
        };

        generator(&runner, config).generate_and_apply(Path::new("/walls/a.png")).await.unwrap();

        assert_eq!(runner.calls(), vec![
            "/usr/bin/matugen image /walls/a.png --json hex",
            "sh -c pkill -USR1 kitty",
        ]);
    }
}
