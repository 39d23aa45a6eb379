//! Render cache orchestration.
//!
//! [`DiagramCache`] maps a diagram request to an image in the cache directory,
//! rendering it through a backend only when no usable artifact exists:
//!
//! ```text
//! request -> CacheKey -> {cache_dir}/uml-{page}-{source}.{fmt}
//!         -> hit:  reuse files
//!         -> miss: backend.render -> files
//!         -> map rewrite, SVG sizing -> Resolved
//! ```
//!
//! The cache directory is the only state. Concurrent misses for the same
//! diagram may both render; the last writer wins.

use std::path::{Path, PathBuf};
use std::time::Duration;

use puml_config::{BackendKind, Config, DiagramFormat};
use rayon::prelude::*;

use crate::backend::{LocalBackend, RemoteBackend, RenderBackend, RenderError, RenderJob};
use crate::clean::{CleanError, clean_page};
use crate::consts::CMAPX_EXTENSION;
use crate::key::{ArtifactPaths, CacheKey};
use crate::postprocess::{read_map, read_svg_dimensions, rewrite_map_ids};
use crate::presenter::{error_markup, present};
use crate::request::{DiagramRequest, RenderArtifact, RenderOptions, Resolved};

/// Content-addressed store of rendered diagrams.
pub struct DiagramCache {
    cache_dir: PathBuf,
    web_path: String,
    format: DiagramFormat,
    backend: BackendKind,
    local: Box<dyn RenderBackend>,
    remote: Box<dyn RenderBackend>,
}

impl DiagramCache {
    /// Create a cache over `cache_dir`, served to readers under `web_path`.
    ///
    /// Uses `java -jar plantuml.jar` locally and the public PlantUML server
    /// remotely until replaced with [`Self::with_local_backend`] and
    /// [`Self::with_remote_backend`].
    ///
    /// # Errors
    ///
    /// Returns an error if the default remote backend cannot be created.
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        web_path: impl Into<String>,
    ) -> Result<Self, RenderError> {
        let remote = RemoteBackend::new(
            puml_config::DEFAULT_CLOUD_URI,
            Duration::from_secs(puml_config::DEFAULT_TIMEOUT_SECS),
            None,
        )?;
        Ok(Self {
            cache_dir: cache_dir.into(),
            web_path: web_path.into(),
            format: DiagramFormat::Png,
            backend: BackendKind::Local,
            local: Box::new(LocalBackend::new("java", "plantuml.jar")),
            remote: Box::new(remote),
        })
    }

    /// Create a cache with backends and defaults taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured proxy is invalid.
    pub fn from_config(config: &Config) -> Result<Self, RenderError> {
        let local = LocalBackend::new(config.java.clone(), config.jar_file.clone())
            .with_timeout(config.timeout)
            .with_debug(config.debug);
        let remote = RemoteBackend::new(&config.cloud_uri, config.timeout, config.proxy.as_deref())?
            .with_map(config.fetch_map);

        Ok(Self {
            cache_dir: config.cache_dir.clone(),
            web_path: config.web_path.clone(),
            format: config.format,
            backend: config.backend,
            local: Box::new(local),
            remote: Box::new(remote),
        })
    }

    /// Replace the backend used for [`BackendKind::Local`] requests.
    #[must_use]
    pub fn with_local_backend(mut self, backend: Box<dyn RenderBackend>) -> Self {
        self.local = backend;
        self
    }

    /// Replace the backend used for [`BackendKind::Remote`] requests.
    #[must_use]
    pub fn with_remote_backend(mut self, backend: Box<dyn RenderBackend>) -> Self {
        self.remote = backend;
        self
    }

    /// Directory holding the rendered artifacts.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolve one request to an embeddable artifact.
    ///
    /// Never fails: backend and filesystem errors end up in
    /// [`Resolved::failure`].
    pub fn resolve(&self, request: &DiagramRequest) -> Resolved {
        let format = request.options.format.unwrap_or(self.format);
        let kind = request.options.backend.unwrap_or(self.backend);
        let backend = self.backend(kind);

        let key = CacheKey::derive(&request.page, &request.source);
        let paths = key.paths(&self.cache_dir, format);
        let mut resolved = Resolved {
            artifact: RenderArtifact {
                map_id: key.map_id().to_owned(),
                ..RenderArtifact::default()
            },
            format,
            backend: kind,
            cached: false,
            failure: None,
        };

        if !request.options.force_redraw && Self::is_cached(backend, format, &paths) {
            tracing::debug!(image = %paths.image.display(), "diagram cache hit");
            resolved.cached = true;
        } else if let Err(e) = self.render(backend, &request.source, format, &paths) {
            tracing::warn!(backend = backend.name(), error = %e, "diagram render failed");
            resolved.failure = Some(diagnostic(&e, &paths.image));
            return resolved;
        }

        let artifact = &mut resolved.artifact;
        let map = Self::map_candidates(backend, format, &paths)
            .into_iter()
            .find_map(|path| read_map(&path).map(|map| (path, map)));
        if let Some((map_path, map)) = map {
            artifact.map_fragment = rewrite_map_ids(&map, &artifact.map_id);
            artifact.map_path = Some(map_path);
        }
        if format == DiagramFormat::Svg {
            artifact.dimensions = read_svg_dimensions(&paths.image);
        }
        artifact.source_url = Some(format!(
            "{}/{}.{format}",
            self.web_path.trim_end_matches('/'),
            paths.prefix
        ));
        artifact.image_path = Some(paths.image);
        resolved
    }

    /// Resolve independent requests in parallel, keeping their order.
    pub fn resolve_all(&self, requests: &[DiagramRequest]) -> Vec<Resolved> {
        requests.par_iter().map(|r| self.resolve(r)).collect()
    }

    /// Resolve a diagram and return its markup for the host document.
    pub fn render_markup(&self, source: &str, page: &str, options: &RenderOptions) -> String {
        let request = DiagramRequest::new(source, page).with_options(*options);
        present(&self.resolve(&request))
    }

    /// Like [`Self::render_markup`] with options given as flat tag arguments.
    ///
    /// Invalid arguments produce an error fragment instead of an image.
    pub fn render_tag<I, K, V>(&self, source: &str, page: &str, args: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match RenderOptions::from_args(args) {
            Ok(options) => self.render_markup(source, page, &options),
            Err(e) => error_markup(&e.to_string()),
        }
    }

    /// Remove every artifact rendered for `page`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be removed.
    pub fn clean_page(&self, page: &str) -> Result<usize, CleanError> {
        clean_page(&self.cache_dir, page)
    }

    fn backend(&self, kind: BackendKind) -> &dyn RenderBackend {
        match kind {
            BackendKind::Local => self.local.as_ref(),
            BackendKind::Remote => self.remote.as_ref(),
        }
    }

    fn is_cached(backend: &dyn RenderBackend, format: DiagramFormat, paths: &ArtifactPaths) -> bool {
        if !paths.image.is_file() {
            return false;
        }
        match backend.map_sidecar(format) {
            Some(CMAPX_EXTENSION) => paths.cmapx.is_file(),
            Some(_) => paths.map.is_file(),
            None => true,
        }
    }

    fn render(
        &self,
        backend: &dyn RenderBackend,
        source: &str,
        format: DiagramFormat,
        paths: &ArtifactPaths,
    ) -> Result<(), RenderError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|source| RenderError::Io {
            path: self.cache_dir.clone(),
            source,
        })?;

        let job = RenderJob {
            source,
            format,
            image_file: &paths.image,
            work_dir: &self.cache_dir,
            file_prefix: &paths.prefix,
        };
        let output = backend.render(&job)?;
        if !paths.image.is_file() {
            return Err(RenderError::RenderFailed {
                backend: backend.name(),
                path: paths.image.clone(),
            });
        }
        tracing::debug!(
            backend = backend.name(),
            image = %output.image.display(),
            map = ?output.map,
            "diagram rendered"
        );
        Ok(())
    }

    /// Map files to try, in order. Missing and empty ones are skipped.
    fn map_candidates(
        backend: &dyn RenderBackend,
        format: DiagramFormat,
        paths: &ArtifactPaths,
    ) -> Vec<PathBuf> {
        let mut candidates = vec![paths.map.clone()];
        if backend.map_sidecar(format) == Some(CMAPX_EXTENSION) {
            candidates.push(paths.cmapx.clone());
        }
        candidates
    }
}

/// Failure text for the presenter, always naming the backend and image path.
fn diagnostic(error: &RenderError, image: &Path) -> String {
    match error {
        RenderError::RenderFailed { .. } => error.to_string(),
        _ => format!("{error} (expected image at {})", image.display()),
    }
}
