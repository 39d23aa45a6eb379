//! Render requests and their results.

use std::path::PathBuf;

use puml_config::{BackendKind, ConfigError, DiagramFormat};

/// Per-request overrides of the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Output format; `None` uses the configured default.
    pub format: Option<DiagramFormat>,
    /// Render even when a cached artifact exists.
    pub force_redraw: bool,
    /// Backend; `None` uses the configured default.
    pub backend: Option<BackendKind>,
}

impl RenderOptions {
    /// Parse options from flat tag arguments such as `format="svg" redraw`.
    ///
    /// Recognized keys:
    /// - `format`: `svg` or `png`
    /// - `backend`: `local` or `remote`
    /// - `redraw`: presence forces a redraw unless its value is false-like
    /// - `force_redraw`: boolean
    ///
    /// Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for unknown formats, backends or
    /// non-boolean redraw values.
    pub fn from_args<I, K, V>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in args {
            let value = value.as_ref();
            match key.as_ref() {
                "format" => options.format = Some(value.parse()?),
                "backend" => options.backend = Some(value.parse()?),
                "redraw" => options.force_redraw = value.is_empty() || parse_flag(value)?,
                "force_redraw" => options.force_redraw = parse_flag(value)?,
                _ => {}
            }
        }
        Ok(options)
    }
}

fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "redraw" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Validation(format!(
            "redraw must be a boolean, got: {value}"
        ))),
    }
}

/// One diagram to resolve.
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    /// Diagram body without `@startuml` / `@enduml`.
    pub source: String,
    /// Identity of the page the diagram appears on.
    pub page: String,
    /// Per-request overrides.
    pub options: RenderOptions,
}

impl DiagramRequest {
    /// Create a request with default options.
    pub fn new(source: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: page.into(),
            options: RenderOptions::default(),
        }
    }

    /// Replace the request options.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

/// Files and embedding data for one resolved diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderArtifact {
    /// Rendered image, absent when rendering failed.
    pub image_path: Option<PathBuf>,
    /// Map file whose content became `map_fragment`.
    pub map_path: Option<PathBuf>,
    /// Id of the image map (the source digest).
    pub map_id: String,
    /// Image-map markup with rewritten ids, empty without a map.
    pub map_fragment: String,
    /// Web-facing URL of the image, absent when rendering failed.
    pub source_url: Option<String>,
    /// `width=N height=N` attribute text for SVG embedding.
    pub dimensions: Option<String>,
}

/// Outcome of resolving one [`DiagramRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Artifact data (image fields empty on failure).
    pub artifact: RenderArtifact,
    /// Format the artifact was resolved for.
    pub format: DiagramFormat,
    /// Backend selected for the request.
    pub backend: BackendKind,
    /// Whether an existing artifact was reused.
    pub cached: bool,
    /// Diagnostic for a failed render.
    pub failure: Option<String>,
}

impl Resolved {
    /// Whether an image is available for embedding.
    pub fn is_ok(&self) -> bool {
        self.artifact.source_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_args() {
        let options =
            RenderOptions::from_args([("format", "svg"), ("backend", "remote"), ("title", "x")])
                .unwrap();
        assert_eq!(options.format, Some(DiagramFormat::Svg));
        assert_eq!(options.backend, Some(BackendKind::Remote));
        assert!(!options.force_redraw);
    }

    #[test]
    fn test_bare_redraw_forces_redraw() {
        let options = RenderOptions::from_args([("redraw", "")]).unwrap();
        assert!(options.force_redraw);
        let options = RenderOptions::from_args([("redraw", "false")]).unwrap();
        assert!(!options.force_redraw);
        let options = RenderOptions::from_args([("force_redraw", "true")]).unwrap();
        assert!(options.force_redraw);
    }

    #[test]
    fn test_unknown_format_is_error() {
        let err = RenderOptions::from_args([("format", "jpeg")]).unwrap_err();
        assert!(err.to_string().contains("jpeg"));
    }

    #[test]
    fn test_no_args_uses_defaults() {
        let options = RenderOptions::from_args(std::iter::empty::<(&str, &str)>()).unwrap();
        assert_eq!(options, RenderOptions::default());
    }
}
