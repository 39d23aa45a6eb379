//! Rendering backends.
//!
//! A [`RenderBackend`] turns diagram source into an image file at a path chosen
//! by the caller. Two implementations exist:
//!
//! - [`LocalBackend`]: runs the PlantUML jar as a subprocess
//! - [`RemoteBackend`]: fetches the image from a PlantUML server
//!
//! Both decide success the same way: the image file exists after the call.
//! The renderer's own report (exit code, transport error) is a diagnostic.

mod local;
mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

#[cfg(all(test, unix))]
pub(crate) use local::fake;

use std::path::{Path, PathBuf};

use puml_config::DiagramFormat;

/// Everything a backend needs to render one diagram.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    /// Diagram body as written by the author, without start/end markers.
    pub source: &'a str,
    /// Requested output format.
    pub format: DiagramFormat,
    /// Where the image must end up.
    pub image_file: &'a Path,
    /// Directory for the image and any sibling files.
    pub work_dir: &'a Path,
    /// Filename stem shared by all artifacts of this diagram.
    pub file_prefix: &'a str,
}

impl RenderJob<'_> {
    /// Sibling file of the image with a different extension.
    #[must_use]
    pub fn sibling(&self, extension: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}.{extension}", self.file_prefix))
    }
}

/// Files produced by a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Rendered image.
    pub image: PathBuf,
    /// Image-map data, when the backend produced any.
    pub map: Option<PathBuf>,
}

/// Backend failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer could not be started or reached.
    #[error("{backend} backend unavailable: {message}")]
    BackendUnavailable {
        /// Backend name.
        backend: &'static str,
        /// Underlying cause.
        message: String,
    },
    /// The renderer ran but the image file does not exist.
    #[error("{backend} backend produced no image at {}", .path.display())]
    RenderFailed {
        /// Backend name.
        backend: &'static str,
        /// Expected image path.
        path: PathBuf,
    },
    /// The renderer did not finish in time.
    #[error("{backend} backend timed out after {seconds}s")]
    Timeout {
        /// Backend name.
        backend: &'static str,
        /// Configured bound.
        seconds: u64,
    },
    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Renders diagram source into an image file.
///
/// Implementations must be shareable across threads; the render cache calls
/// them from rayon workers.
pub trait RenderBackend: Send + Sync {
    /// Short name used in diagnostics (e.g. "local").
    fn name(&self) -> &'static str;

    /// Whether this backend writes a map sidecar for `format`, and which one.
    ///
    /// The render cache only treats a diagram as cached when this file exists
    /// next to the image.
    fn map_sidecar(&self, format: DiagramFormat) -> Option<&'static str>;

    /// Render `job.source` into `job.image_file`.
    fn render(&self, job: &RenderJob<'_>) -> Result<RenderOutput, RenderError>;
}
