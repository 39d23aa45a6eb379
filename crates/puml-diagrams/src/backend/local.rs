//! Local rendering with the PlantUML jar.
//!
//! The wrapped diagram is written next to the target image as `{prefix}.uml`
//! and PlantUML is launched as
//!
//! ```text
//! {java} -jar {jar_file} -t{svg|png} -charset UTF-8 -o {work_dir} {prefix}.uml
//! ```
//!
//! PlantUML's exit status is not reliable across versions, so it is only
//! logged; the render succeeded if `{prefix}.{format}` exists afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use puml_config::DiagramFormat;

use super::{RenderBackend, RenderError, RenderJob, RenderOutput};
use crate::consts::{CMAPX_EXTENSION, SOURCE_EXTENSION};
use crate::source::wrap_source;

const NAME: &str = "local";

/// Interval between child status checks while waiting for the renderer.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default bound on a single renderer run.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend running `java -jar plantuml.jar` per diagram.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    java: String,
    jar_file: PathBuf,
    timeout: Duration,
    debug: bool,
}

impl LocalBackend {
    /// Create a backend launching `jar_file` with the `java` executable.
    #[must_use]
    pub fn new(java: impl Into<String>, jar_file: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar_file: jar_file.into(),
            timeout: DEFAULT_TIMEOUT,
            debug: false,
        }
    }

    /// Set the bound on a single renderer run.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep the `.uml` input of failed renders for inspection.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn command(&self, job: &RenderJob<'_>, source_file: &Path) -> Command {
        let mut command = Command::new(&self.java);
        command
            .arg("-jar")
            .arg(&self.jar_file)
            .arg(format!("-t{}", job.format))
            .args(["-charset", "UTF-8"])
            .arg("-o")
            .arg(job.work_dir)
            .arg(source_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    /// Wait for the renderer, killing it once the timeout elapses.
    fn wait(&self, mut child: Child) -> Result<ExitStatus, RenderError> {
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        tracing::warn!(
                            timeout_secs = self.timeout.as_secs(),
                            "renderer timed out, terminating"
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(RenderError::Timeout {
                            backend: NAME,
                            seconds: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(RenderError::BackendUnavailable {
                        backend: NAME,
                        message: format!("failed to check renderer status: {e}"),
                    });
                }
            }
        }
    }
}

impl RenderBackend for LocalBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn map_sidecar(&self, format: DiagramFormat) -> Option<&'static str> {
        match format {
            DiagramFormat::Png => Some(CMAPX_EXTENSION),
            DiagramFormat::Svg => None,
        }
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<RenderOutput, RenderError> {
        let mut input = SourceFile::write(job.sibling(SOURCE_EXTENSION), job.source, self.debug)?;

        let mut command = self.command(job, &input.path);
        if self.debug {
            tracing::info!(?command, image = %job.image_file.display(), "launching renderer");
        } else {
            tracing::debug!(?command, "launching renderer");
        }

        let child = command
            .spawn()
            .map_err(|e| RenderError::BackendUnavailable {
                backend: NAME,
                message: format!("failed to launch {}: {e}", self.java),
            })?;
        let status = self.wait(child)?;
        if self.debug {
            tracing::info!(%status, image = %job.image_file.display(), "renderer exited");
        } else {
            tracing::debug!(%status, image = %job.image_file.display(), "renderer exited");
        }

        if !job.image_file.is_file() {
            if self.debug {
                tracing::warn!(
                    input = %input.path.display(),
                    "image file is missing, keeping renderer input"
                );
            }
            return Err(RenderError::RenderFailed {
                backend: NAME,
                path: job.image_file.to_path_buf(),
            });
        }
        input.retain = false;

        let map = match job.format {
            DiagramFormat::Png => Some(ensure_cmapx(job)?),
            DiagramFormat::Svg => None,
        };

        Ok(RenderOutput {
            image: job.image_file.to_path_buf(),
            map,
        })
    }
}

/// Make sure a PNG render has a `.cmapx` sidecar.
///
/// PlantUML writes one only for diagrams with links. An empty file marks a
/// diagram without links, so later lookups can tell a complete render apart
/// from an interrupted one.
fn ensure_cmapx(job: &RenderJob<'_>) -> Result<PathBuf, RenderError> {
    let path = job.sibling(CMAPX_EXTENSION);
    if !path.is_file() {
        fs::write(&path, b"").map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
    }
    Ok(path)
}

/// Temporary renderer input, removed when dropped.
///
/// With `retain` set the file survives, which keeps the input of a failed
/// render around in debug mode.
struct SourceFile {
    path: PathBuf,
    retain: bool,
}

impl SourceFile {
    fn write(path: PathBuf, body: &str, retain: bool) -> Result<Self, RenderError> {
        fs::write(&path, wrap_source(body)).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, retain })
    }
}

impl Drop for SourceFile {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove renderer input");
        }
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::key::CacheKey;

    fn job<'a>(
        source: &'a str,
        format: DiagramFormat,
        dir: &'a Path,
        prefix: &'a str,
        image: &'a Path,
    ) -> RenderJob<'a> {
        RenderJob {
            source,
            format,
            image_file: image,
            work_dir: dir,
            file_prefix: prefix,
        }
    }

    #[test]
    fn test_renders_svg_and_removes_input() {
        let tmp = tempfile::TempDir::new().unwrap();
        let java = fake::renderer(tmp.path(), fake::WRITES_IMAGE);
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Svg);
        let backend = LocalBackend::new(java.to_string_lossy(), "plantuml.jar");

        let output = backend
            .render(&job("A -> B", DiagramFormat::Svg, tmp.path(), &paths.prefix, &paths.image))
            .unwrap();

        assert_eq!(output.image, paths.image);
        assert_eq!(output.map, None);
        assert!(paths.image.is_file());
        assert!(!paths.source.exists());
    }

    #[test]
    fn test_png_render_always_has_cmapx() {
        let tmp = tempfile::TempDir::new().unwrap();
        let java = fake::renderer(tmp.path(), fake::WRITES_IMAGE);
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Png);
        let backend = LocalBackend::new(java.to_string_lossy(), "plantuml.jar");

        let output = backend
            .render(&job("A -> B", DiagramFormat::Png, tmp.path(), &paths.prefix, &paths.image))
            .unwrap();

        assert_eq!(output.map, Some(paths.cmapx.clone()));
        assert_eq!(std::fs::read_to_string(&paths.cmapx).unwrap(), "");
    }

    #[test]
    fn test_png_render_keeps_renderer_map() {
        let tmp = tempfile::TempDir::new().unwrap();
        let java = fake::renderer(tmp.path(), fake::WRITES_IMAGE_AND_MAP);
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Png);
        let backend = LocalBackend::new(java.to_string_lossy(), "plantuml.jar");

        backend
            .render(&job("A -> B", DiagramFormat::Png, tmp.path(), &paths.prefix, &paths.image))
            .unwrap();

        assert!(
            std::fs::read_to_string(&paths.cmapx)
                .unwrap()
                .contains("plantuml_map")
        );
    }

    #[test]
    fn test_missing_image_is_failure_despite_exit_status() {
        let tmp = tempfile::TempDir::new().unwrap();
        let java = fake::renderer(tmp.path(), fake::WRITES_NOTHING);
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Svg);
        let backend = LocalBackend::new(java.to_string_lossy(), "plantuml.jar");

        let err = backend
            .render(&job("A -> B", DiagramFormat::Svg, tmp.path(), &paths.prefix, &paths.image))
            .unwrap_err();

        assert!(matches!(err, RenderError::RenderFailed { .. }));
        assert!(!paths.source.exists(), "input removed outside debug mode");
    }

    #[test]
    fn test_debug_mode_keeps_failed_input() {
        let tmp = tempfile::TempDir::new().unwrap();
        let java = fake::renderer(tmp.path(), fake::WRITES_NOTHING);
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Svg);
        let backend = LocalBackend::new(java.to_string_lossy(), "plantuml.jar").with_debug(true);

        let result =
            backend.render(&job("A -> B", DiagramFormat::Svg, tmp.path(), &paths.prefix, &paths.image));

        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(&paths.source).unwrap(),
            "@startuml\nA -> B\n@enduml"
        );
    }

    /// Run `f` with INFO-level logs captured as plain text.
    fn capture_info_logs(f: impl FnOnce()) -> String {
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture(Arc::new(Mutex::new(Vec::new())));
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_debug_mode_logs_command_and_status() {
        let tmp = tempfile::TempDir::new().unwrap();
        let java = fake::renderer(tmp.path(), fake::WRITES_IMAGE);
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Svg);
        let render = |debug: bool| {
            let backend =
                LocalBackend::new(java.to_string_lossy(), "plantuml.jar").with_debug(debug);
            capture_info_logs(|| {
                backend
                    .render(&job("A -> B", DiagramFormat::Svg, tmp.path(), &paths.prefix, &paths.image))
                    .unwrap();
            })
        };

        let logs = render(true);
        assert!(logs.contains("launching renderer"), "got {logs}");
        assert!(logs.contains("-tsvg"), "got {logs}");
        assert!(logs.contains("renderer exited"), "got {logs}");
        assert!(logs.contains(&*paths.image.to_string_lossy()), "got {logs}");

        let logs = render(false);
        assert!(!logs.contains("launching renderer"), "got {logs}");
    }

    #[test]
    fn test_timeout_kills_renderer() {
        let tmp = tempfile::TempDir::new().unwrap();
        let java = fake::renderer(tmp.path(), fake::HANGS);
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Svg);
        let backend = LocalBackend::new(java.to_string_lossy(), "plantuml.jar")
            .with_timeout(Duration::from_millis(200));

        let start = Instant::now();
        let err = backend
            .render(&job("A -> B", DiagramFormat::Svg, tmp.path(), &paths.prefix, &paths.image))
            .unwrap_err();

        assert!(matches!(err, RenderError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
        assert!(!paths.source.exists());
    }

    #[test]
    fn test_missing_executable_is_unavailable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = CacheKey::derive("Page", "A -> B").paths(tmp.path(), DiagramFormat::Svg);
        let backend = LocalBackend::new("/nonexistent/java", "plantuml.jar");

        let err = backend
            .render(&job("A -> B", DiagramFormat::Svg, tmp.path(), &paths.prefix, &paths.image))
            .unwrap_err();

        assert!(matches!(err, RenderError::BackendUnavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/java"));
        assert!(!paths.source.exists());
    }
}
