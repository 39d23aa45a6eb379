//! `puml encode` command implementation.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use puml_config::{Config, DiagramFormat};
use puml_diagrams::encoding::encode;
use puml_diagrams::{RemoteBackend, decode_source, strip_markers};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the encode command.
#[derive(Args)]
pub(crate) struct EncodeArgs {
    /// Diagram file (default: read stdin).
    file: Option<PathBuf>,

    /// Format segment of the printed URL (overrides config).
    #[arg(short, long)]
    format: Option<DiagramFormat>,

    /// Path to configuration file (default: auto-discover puml.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl EncodeArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        let bytes = match &self.file {
            Some(path) => std::fs::read(path).map_err(|source| CliError::Read {
                path: path.display().to_string(),
                source,
            })?,
            None => {
                let mut buf = Vec::new();
                std::io::stdin().read_to_end(&mut buf)?;
                buf
            }
        };
        let text = decode_source(&bytes);
        let source = strip_markers(&text);

        let format = self.format.unwrap_or(config.format);
        let backend = RemoteBackend::new(&config.cloud_uri, config.timeout, None)?;

        output.result(&encode(source));
        output.result(&backend.url(format.as_str(), source));
        Ok(())
    }
}
