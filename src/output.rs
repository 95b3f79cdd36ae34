//! # Output Configuration
//!
//! Controls how the CLI renders package summaries: colors and emoji markers
//! when the terminal supports them, plain bracketed tags otherwise.
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

use crate::realize::Outcome;
use crate::state::{Action, PackageState};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// In auto mode, colors are disabled if `NO_COLOR` is set, `CLICOLOR=0`,
    /// `TERM=dumb`, or stdout is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Marker for what happened to a package.
pub fn outcome_marker(config: &OutputConfig, outcome: &Outcome) -> &'static str {
    match outcome.action {
        Action::Realize => emoji(config, "📦", "[SYNC]"),
        Action::Skip => emoji(config, "✅", "[OK]"),
        Action::Refuse(_) => emoji(config, "⚠️ ", "[SKIP]"),
    }
}

/// Package state, colored by how much attention it needs.
pub fn state_label(config: &OutputConfig, state: PackageState) -> String {
    let text = state.to_string();
    if !config.use_color {
        return text;
    }
    match state {
        PackageState::Current => style(text).green().to_string(),
        PackageState::Absent => style(text).cyan().to_string(),
        PackageState::Stale => style(text).yellow().to_string(),
        PackageState::Foreign => style(text).red().to_string(),
    }
}

/// One summary line per package, e.g. `[OK] fmt (current)`.
pub fn outcome_line(config: &OutputConfig, outcome: &Outcome) -> String {
    let mut line = format!(
        "{} {} ({})",
        outcome_marker(config, outcome),
        outcome.name,
        state_label(config, outcome.state)
    );
    if let Some(diagnostic) = &outcome.diagnostic {
        line.push_str("\n    ");
        line.push_str(diagnostic);
    }
    line
}
