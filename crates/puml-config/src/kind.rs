//! Output format and backend selectors shared by configuration and requests.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::ConfigError;

/// Image format produced by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    /// Scalable vector output, embedded via `<object>`.
    Svg,
    /// Raster output, embedded via `<img>` with an optional image map.
    Png,
}

impl DiagramFormat {
    /// File extension and URL segment for this format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(ConfigError::Validation(format!(
                "unknown format: {s} (expected svg or png)"
            ))),
        }
    }
}

/// Which renderer turns diagram source into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A local `java -jar plantuml.jar` subprocess.
    Local,
    /// A PlantUML server reached over HTTP.
    Remote,
}

impl BackendKind {
    /// Lowercase name used in configuration and diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::Validation(format!(
                "unknown backend: {s} (expected local or remote)"
            ))),
        }
    }
}
