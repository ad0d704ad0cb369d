//! Desktop environment detection and background apply strategies.
//!
//! Each known environment maps to one external command that sets the
//! background. Anything unrecognized uses `feh`, so an unknown environment is
//! never an error on its own.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::constants::UNKNOWN_ENVIRONMENT;
use crate::utils::process::{CommandError, CommandRunner, CommandSpec};

/// Session variables probed for the environment, highest priority first.
pub const DETECTION_VARIABLES: [&str; 3] =
    ["XDG_CURRENT_DESKTOP", "DESKTOP_SESSION", "XDG_SESSION_DESKTOP"];

/// Normalized (trimmed, lower-cased) desktop environment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnvironmentId(String);

impl EnvironmentId {
    /// Normalizes `raw`; blank input becomes `unknown`.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            Self::unknown()
        } else {
            Self(normalized)
        }
    }

    #[must_use]
    pub fn unknown() -> Self { Self(UNKNOWN_ENVIRONMENT.to_string()) }

    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    #[must_use]
    pub fn is_unknown(&self) -> bool { self.0 == UNKNOWN_ENVIRONMENT }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Detects the environment using `lookup` to read variables.
///
/// The first variable in [`DETECTION_VARIABLES`] with a non-blank value wins.
pub fn detect_with<F>(lookup: F) -> EnvironmentId
where
    F: Fn(&str) -> Option<String>,
{
    DETECTION_VARIABLES
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
        .map_or_else(EnvironmentId::unknown, |value| EnvironmentId::new(&value))
}

/// How the background is set for a given environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStrategy {
    /// `gsettings` with the GNOME background schema.
    GnomeSettings,
    /// `gsettings` with the MATE background schema.
    MateSettings,
    /// Plasma shell scripting over `qdbus`.
    PlasmaScript,
    /// `xfconf-query` on the xfce4-desktop channel.
    Xfconf,
    /// `swww` wallpaper daemon (wlroots compositors).
    Swww,
    /// `feh`, used when nothing else matches.
    Feh,
}

impl ApplyStrategy {
    /// Selects the strategy for `environment`.
    ///
    /// Colon-separated identifiers (`ubuntu:GNOME`) are matched segment by
    /// segment; the first known segment wins.
    #[must_use]
    pub fn for_environment(environment: &EnvironmentId) -> Self {
        environment.as_str().split(':').find_map(Self::for_segment).unwrap_or(Self::Feh)
    }

    fn for_segment(segment: &str) -> Option<Self> {
        match segment.trim() {
            "gnome" => Some(Self::GnomeSettings),
            "mate" => Some(Self::MateSettings),
            "kde" | "plasma" => Some(Self::PlasmaScript),
            "xfce" => Some(Self::Xfconf),
            "hyprland" => Some(Self::Swww),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GnomeSettings => "gnome-settings",
            Self::MateSettings => "mate-settings",
            Self::PlasmaScript => "plasma-script",
            Self::Xfconf => "xfconf",
            Self::Swww => "swww",
            Self::Feh => "feh",
        }
    }

    #[must_use]
    pub const fn is_fallback(self) -> bool { matches!(self, Self::Feh) }

    /// Builds the command that sets `path` as the background.
    #[must_use]
    pub fn command(self, path: &Path) -> CommandSpec {
        let path = path.display().to_string();

        match self {
            Self::GnomeSettings => gsettings("org.gnome.desktop.background", &path),
            Self::MateSettings => gsettings("org.mate.desktop.background", &path),
            Self::PlasmaScript => CommandSpec::new("qdbus").args([
                "org.kde.plasmashell".to_string(),
                "/PlasmaShell".to_string(),
                "org.kde.PlasmaShell.evaluateScript".to_string(),
                plasma_script(&path),
            ]),
            Self::Xfconf => CommandSpec::new("xfconf-query").args([
                "-c",
                "xfce4-desktop",
                "-p",
                "/backdrop/screen0/monitor1/workspace0/last-image",
                "-s",
                path.as_str(),
            ]),
            Self::Swww => CommandSpec::new("swww").arg("img").arg(path),
            Self::Feh => CommandSpec::new("feh").arg("--bg-scale").arg(path),
        }
    }
}

impl fmt::Display for ApplyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

fn gsettings(schema: &str, path: &str) -> CommandSpec {
    let uri = format!("file://{path}");
    CommandSpec::new("gsettings").args(["set", schema, "picture-uri", uri.as_str()])
}

/// Plasma desktop script that points every desktop's image plugin at `path`.
fn plasma_script(path: &str) -> String {
    let escaped = path.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "var all = desktops();\
         for (var i = 0; i < all.length; i++) {{\
         var d = all[i];\
         d.wallpaperPlugin = \"org.kde.image\";\
         d.currentConfigGroup = Array(\"Wallpaper\", \"org.kde.image\", \"General\");\
         d.writeConfig(\"Image\", \"file://{escaped}\");\
         }}"
    )
}

/// Setting the background failed.
#[derive(Debug, Clone, Error)]
#[error("Failed to set background on '{environment}' using {strategy}: {source}")]
pub struct ApplyError {
    pub environment: EnvironmentId,
    pub strategy: ApplyStrategy,
    #[source]
    pub source: CommandError,
}

/// Detects the desktop environment and runs the matching apply strategy.
#[derive(Clone)]
pub struct DesktopDispatcher {
    runner: Arc<dyn CommandRunner>,
    environment_override: Option<String>,
}

impl DesktopDispatcher {
    /// Creates a dispatcher. A non-blank `environment_override` replaces
    /// detection.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, environment_override: Option<String>) -> Self {
        let environment_override = environment_override.filter(|env| !env.trim().is_empty());
        Self { runner, environment_override }
    }

    /// Returns the configured override, or detects from the process
    /// environment.
    #[must_use]
    pub fn detect(&self) -> EnvironmentId {
        self.environment_override.as_deref().map_or_else(
            || detect_with(|name| std::env::var(name).ok()),
            EnvironmentId::new,
        )
    }

    /// Sets `path` as the background using the strategy for `environment`.
    ///
    /// Returns the strategy that ran.
    ///
    /// # Errors
    ///
    /// Returns `ApplyError` if the command cannot be started, exits
    /// unsuccessfully or times out. No other strategy is attempted.
    pub async fn apply(
        &self,
        path: &Path,
        environment: &EnvironmentId,
    ) -> Result<ApplyStrategy, ApplyError> {
        let strategy = ApplyStrategy::for_environment(environment);
        if strategy.is_fallback() {
            tracing::debug!(environment = %environment, "no dedicated strategy, using fallback");
        }

        let command = strategy.command(path);
        self.runner.run(&command).await.map_err(|source| ApplyError {
            environment: environment.clone(),
            strategy,
            source,
        })?;

        tracing::info!(
            environment = %environment,
            strategy = %strategy,
            path = %path.display(),
            "background applied"
        );
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::utils::process::fake::FakeRunner;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    // ========================================================================
    // Detection
    // ========================================================================

    #[test]
    fn test_detect_prefers_current_desktop() {
        let env = detect_with(lookup(&[
            ("XDG_CURRENT_DESKTOP", "GNOME"),
            ("DESKTOP_SESSION", "plasma"),
        ]));
        assert_eq!(env.as_str(), "gnome");
    }

    #[test]
    fn test_detect_falls_through_blank_values() {
        let env = detect_with(lookup(&[
            ("XDG_CURRENT_DESKTOP", "   "),
            ("DESKTOP_SESSION", ""),
            ("XDG_SESSION_DESKTOP", " XFCE "),
        ]));
        assert_eq!(env.as_str(), "xfce");
    }

    #[test]
    fn test_detect_unknown_when_nothing_set() {
        let env = detect_with(lookup(&[]));
        assert!(env.is_unknown());
        assert_eq!(env.to_string(), "unknown");
    }

    #[test]
    fn test_override_replaces_detection() {
        let dispatcher =
            DesktopDispatcher::new(Arc::new(FakeRunner::new()), Some("Hyprland".to_string()));
        assert_eq!(dispatcher.detect().as_str(), "hyprland");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let dispatcher = DesktopDispatcher::new(Arc::new(FakeRunner::new()), Some("  ".into()));
        assert!(dispatcher.environment_override.is_none());
    }

    // ========================================================================
    // Strategy table
    // ========================================================================

    #[test]
    fn test_strategy_table() {
        let cases = [
            ("gnome", ApplyStrategy::GnomeSettings),
            ("mate", ApplyStrategy::MateSettings),
            ("kde", ApplyStrategy::PlasmaScript),
            ("plasma", ApplyStrategy::PlasmaScript),
            ("xfce", ApplyStrategy::Xfconf),
            ("hyprland", ApplyStrategy::Swww),
        ];
        for (env, expected) in cases {
            assert_eq!(ApplyStrategy::for_environment(&EnvironmentId::new(env)), expected);
        }
    }

    #[test]
    fn test_unrecognized_environment_uses_fallback() {
        for env in ["unknown", "sway", "i3", "", "gnome-classic"] {
            let strategy = ApplyStrategy::for_environment(&EnvironmentId::new(env));
            assert_eq!(strategy, ApplyStrategy::Feh, "{env}");
            assert!(strategy.is_fallback());
        }
    }

    #[test]
    fn test_colon_separated_identifier_matches_segment() {
        let env = EnvironmentId::new("ubuntu:GNOME");
        assert_eq!(ApplyStrategy::for_environment(&env), ApplyStrategy::GnomeSettings);
    }

    #[test]
    fn test_commands_substitute_path() {
        let path = Path::new("/walls/nature/forest.png");

        assert_eq!(
            ApplyStrategy::GnomeSettings.command(path).to_string(),
            "gsettings set org.gnome.desktop.background picture-uri file:///walls/nature/forest.png"
        );
        assert_eq!(
            ApplyStrategy::MateSettings.command(path).to_string(),
            "gsettings set org.mate.desktop.background picture-uri file:///walls/nature/forest.png"
        );
        assert_eq!(
            ApplyStrategy::Xfconf.command(path).to_string(),
            "xfconf-query -c xfce4-desktop -p /backdrop/screen0/monitor1/workspace0/last-image -s \
             /walls/nature/forest.png"
        );
        assert_eq!(ApplyStrategy::Swww.command(path).to_string(), "swww img /walls/nature/forest.png");
        assert_eq!(
            ApplyStrategy::Feh.command(path).to_string(),
            "feh --bg-scale /walls/nature/forest.png"
        );
    }

    #[test]
    fn test_plasma_command_embeds_script() {
        let command = ApplyStrategy::PlasmaScript.command(Path::new("/walls/a.png"));
        assert_eq!(command.program, "qdbus");
        assert_eq!(&command.args[..3], [
            "org.kde.plasmashell",
            "/PlasmaShell",
            "org.kde.PlasmaShell.evaluateScript"
        ]);
        let script = &command.args[3];
        assert!(script.contains("desktops()"));
        assert!(script.contains("org.kde.image"));
        assert!(script.contains("d.writeConfig(\"Image\", \"file:///walls/a.png\")"));
    }

    #[test]
    fn test_plasma_script_escapes_quotes() {
        let script = plasma_script("/walls/say \"hi\".png");
        assert!(script.contains("file:///walls/say \\\"hi\\\".png"));
    }

    // ========================================================================
    // Apply
    // ========================================================================

    #[tokio::test]
    async fn test_apply_runs_strategy_command() {
        let runner = Arc::new(FakeRunner::new());
        let dispatcher = DesktopDispatcher::new(runner.clone(), None);

        let strategy = dispatcher
            .apply(Path::new("/walls/a.png"), &EnvironmentId::new("hyprland"))
            .await
            .unwrap();

        assert_eq!(strategy, ApplyStrategy::Swww);
        assert_eq!(runner.calls(), vec!["swww img /walls/a.png"]);
    }

    #[tokio::test]
    async fn test_apply_unknown_environment_runs_fallback() {
        let runner = Arc::new(FakeRunner::new());
        let dispatcher = DesktopDispatcher::new(runner.clone(), None);

        let strategy =
            dispatcher.apply(Path::new("/walls/a.png"), &EnvironmentId::unknown()).await.unwrap();

        assert_eq!(strategy, ApplyStrategy::Feh);
        assert_eq!(runner.calls(), vec!["feh --bg-scale /walls/a.png"]);
    }

    #[tokio::test]
    async fn test_apply_failure_names_environment_and_strategy() {
        let runner = Arc::new(FakeRunner::new());
        runner.fail("gsettings");
        let dispatcher = DesktopDispatcher::new(runner.clone(), None);

        let err = dispatcher
            .apply(Path::new("/walls/a.png"), &EnvironmentId::new("gnome"))
            .await
            .unwrap_err();

        assert_eq!(err.environment.as_str(), "gnome");
        assert_eq!(err.strategy, ApplyStrategy::GnomeSettings);
        let message = err.to_string();
        assert!(message.contains("gnome"));
        assert!(message.contains("gnome-settings"));
        // No fallback after a failed strategy.
        assert_eq!(runner.calls().len(), 1);
    }
}
