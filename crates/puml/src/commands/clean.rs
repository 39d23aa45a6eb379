//! `puml clean` command implementation.

use std::path::PathBuf;

use clap::Args;
use puml_config::{CliSettings, Config};
use puml_diagrams::clean::clean_page;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the clean command.
#[derive(Args)]
pub(crate) struct CleanArgs {
    /// Page whose diagrams are removed.
    #[arg(short, long)]
    page: String,

    /// Image cache directory (overrides config).
    #[arg(long, env = "PUML_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover puml.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CleanArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            cache_dir: self.cache_dir,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let removed = clean_page(&config.cache_dir, &self.page)?;
        if removed == 0 {
            output.warning(&format!("No cached diagrams for page {}", self.page));
        } else {
            output.success(&format!(
                "Removed {removed} file(s) from {}",
                config.cache_dir.display()
            ));
        }
        Ok(())
    }
}
