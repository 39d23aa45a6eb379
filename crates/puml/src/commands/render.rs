//! `puml render` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use puml_config::{BackendKind, CliSettings, Config, DiagramFormat};
use puml_diagrams::presenter::present;
use puml_diagrams::{
    DiagramCache, DiagramRequest, RenderOptions, decode_source, strip_markers,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Diagram files, with or without `@startuml` / `@enduml` lines.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Page the diagrams belong to (default: each file's path).
    #[arg(short, long)]
    page: Option<String>,

    /// Output format: svg or png (overrides config).
    #[arg(short, long)]
    format: Option<DiagramFormat>,

    /// Rendering backend: local or remote (overrides config).
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Render even when a cached image exists.
    #[arg(long)]
    redraw: bool,

    /// Image cache directory (overrides config).
    #[arg(long, env = "PUML_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// URL prefix under which the cache directory is served (overrides config).
    #[arg(long)]
    web_path: Option<String>,

    /// PlantUML server base URI for the remote backend (overrides config).
    #[arg(long, env = "PUML_CLOUD_URI")]
    cloud_uri: Option<String>,

    /// Log renderer command lines and keep the input of failed renders.
    #[arg(long)]
    debug: bool,

    /// Path to configuration file (default: auto-discover puml.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), Some(&self.cli_settings()))?;
        let cache = DiagramCache::from_config(&config)?;

        let options = RenderOptions {
            force_redraw: self.redraw,
            ..RenderOptions::default()
        };
        let requests = self
            .files
            .iter()
            .map(|path| {
                let page = self.page.clone().unwrap_or_else(|| page_name(path));
                read_request(path, page).map(|request| request.with_options(options))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            count = requests.len(),
            cache_dir = %cache.cache_dir().display(),
            "rendering diagrams"
        );
        let resolved = cache.resolve_all(&requests);

        let mut failed = 0;
        for (path, result) in self.files.iter().zip(&resolved) {
            output.result(&present(result));
            match &result.failure {
                Some(failure) => {
                    failed += 1;
                    output.error(&format!("{}: {failure}", path.display()));
                }
                None if result.cached => {
                    output.info(&format!("{}: cached", path.display()));
                }
                None => output.success(&format!("{}: rendered", path.display())),
            }
        }

        if failed > 0 {
            return Err(CliError::Failed {
                failed,
                total: resolved.len(),
            });
        }
        Ok(())
    }

    /// Config overrides given on the command line.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            format: self.format,
            backend: self.backend,
            cache_dir: self.cache_dir.clone(),
            web_path: self.web_path.clone(),
            cloud_uri: self.cloud_uri.clone(),
            debug: self.debug.then_some(true),
        }
    }
}

/// Page identity for a file rendered without `--page`.
fn page_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn read_request(path: &Path, page: String) -> Result<DiagramRequest, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let text = decode_source(&bytes);
    Ok(DiagramRequest::new(strip_markers(&text), page))
}
