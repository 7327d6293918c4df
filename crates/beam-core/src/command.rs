//! Typed projector command vocabulary and its wire encoding.
//!
//! The device speaks plain lowercase text over the command channel, one
//! message per command and no framing or acknowledgment envelope beyond
//! that. [`ProjectorCommand::wire`] produces the exact payload; [`FromStr`]
//! parses the same strings back (used by the `beamctl send` CLI).
//!
//! There is deliberately no request identifier in the wire format: any text
//! the device sends back is a status update, never a correlated reply.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a command string does not match the vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    /// The command word itself is unknown.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
    /// A `brightness`/`contrast` value was missing or not in 0..=100.
    #[error("invalid level for {command:?}: {value:?} (expected 0..=100)")]
    InvalidLevel { command: String, value: String },
    /// A `pattern` name was missing or unknown.
    #[error("unknown test pattern: {0:?}")]
    UnknownPattern(String),
}

/// Settings pages on the device the UI can navigate to.
///
/// Navigating is itself a command: the page name is sent verbatim over the
/// wire and the device switches what it displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    SystemInfo,
    Settings,
    TestPattern,
    ResetOptions,
}

impl Page {
    /// Wire name of the page, e.g. `"system_info"`.
    pub fn wire_name(self) -> &'static str {
        match self {
            Page::SystemInfo => "system_info",
            Page::Settings => "settings",
            Page::TestPattern => "test_pattern",
            Page::ResetOptions => "reset_options",
        }
    }
}

/// Built-in test patterns the projector can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPattern {
    Checkerboard,
    Grid,
    /// Clears the active pattern and returns to normal output.
    Reset,
}

impl TestPattern {
    /// Wire name of the pattern, e.g. `"checkerboard"`.
    pub fn wire_name(self) -> &'static str {
        match self {
            TestPattern::Checkerboard => "checkerboard",
            TestPattern::Grid => "grid",
            TestPattern::Reset => "reset",
        }
    }
}

/// A single command for the projector's command channel.
///
/// Construct levels through [`ProjectorCommand::brightness`] /
/// [`ProjectorCommand::contrast`], which clamp to the device's 0..=100
/// range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectorCommand {
    /// Set output brightness (0..=100).
    Brightness(u8),
    /// Set output contrast (0..=100).
    Contrast(u8),
    /// Display a built-in test pattern.
    Pattern(TestPattern),
    /// Navigate the device UI to a page.
    Navigate(Page),
    /// Restore the default image settings.
    ResetImageSettings,
    /// Restore the default network settings.
    ResetNetworkSettings,
    /// Wipe all settings back to factory defaults.
    FactoryReset,
}

impl ProjectorCommand {
    /// Builds a brightness command, clamping `level` into 0..=100.
    pub fn brightness(level: u8) -> Self {
        ProjectorCommand::Brightness(level.min(100))
    }

    /// Builds a contrast command, clamping `level` into 0..=100.
    pub fn contrast(level: u8) -> Self {
        ProjectorCommand::Contrast(level.min(100))
    }

    /// Renders the exact lowercase text payload sent over the channel.
    pub fn wire(&self) -> String {
        match self {
            ProjectorCommand::Brightness(v) => format!("brightness {v}"),
            ProjectorCommand::Contrast(v) => format!("contrast {v}"),
            ProjectorCommand::Pattern(p) => format!("pattern {}", p.wire_name()),
            ProjectorCommand::Navigate(page) => page.wire_name().to_string(),
            ProjectorCommand::ResetImageSettings => "reset image settings".to_string(),
            ProjectorCommand::ResetNetworkSettings => "reset network settings".to_string(),
            ProjectorCommand::FactoryReset => "factory reset".to_string(),
        }
    }
}

impl fmt::Display for ProjectorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire())
    }
}

impl FromStr for ProjectorCommand {
    type Err = ParseCommandError;

    /// Parses the wire form back into a typed command. Input is lowercased
    /// first, so `"Factory Reset"` and `"factory reset"` are equivalent —
    /// the device only ever sees lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();

        match normalized.as_str() {
            "system_info" => return Ok(ProjectorCommand::Navigate(Page::SystemInfo)),
            "settings" => return Ok(ProjectorCommand::Navigate(Page::Settings)),
            "test_pattern" => return Ok(ProjectorCommand::Navigate(Page::TestPattern)),
            "reset_options" => return Ok(ProjectorCommand::Navigate(Page::ResetOptions)),
            "reset image settings" => return Ok(ProjectorCommand::ResetImageSettings),
            "reset network settings" => return Ok(ProjectorCommand::ResetNetworkSettings),
            "factory reset" => return Ok(ProjectorCommand::FactoryReset),
            _ => {}
        }

        let mut words = normalized.split_whitespace();
        let head = words.next().unwrap_or_default();
        let rest = words.next().unwrap_or_default();

        match head {
            "brightness" | "contrast" => {
                let level: u8 = rest.parse().map_err(|_| ParseCommandError::InvalidLevel {
                    command: head.to_string(),
                    value: rest.to_string(),
                })?;
                if level > 100 {
                    return Err(ParseCommandError::InvalidLevel {
                        command: head.to_string(),
                        value: rest.to_string(),
                    });
                }
                if head == "brightness" {
                    Ok(ProjectorCommand::Brightness(level))
                } else {
                    Ok(ProjectorCommand::Contrast(level))
                }
            }
            "pattern" => match rest {
                "checkerboard" => Ok(ProjectorCommand::Pattern(TestPattern::Checkerboard)),
                "grid" => Ok(ProjectorCommand::Pattern(TestPattern::Grid)),
                "reset" => Ok(ProjectorCommand::Pattern(TestPattern::Reset)),
                other => Err(ParseCommandError::UnknownPattern(other.to_string())),
            },
            _ => Err(ParseCommandError::UnknownCommand(normalized)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
