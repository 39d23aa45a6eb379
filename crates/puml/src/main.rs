//! puml CLI - cached PlantUML rendering.
//!
//! Provides commands for:
//! - `render`: Render diagram files into the cache and print their markup
//! - `encode`: Print the server encoding and URL of a diagram
//! - `clean`: Remove the cached artifacts of a page

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CleanArgs, EncodeArgs, RenderArgs};
use output::Output;

/// puml - cached PlantUML rendering.
#[derive(Parser)]
#[command(name = "puml", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render diagram files and print their HTML markup.
    Render(RenderArgs),
    /// Print the PlantUML server encoding of a diagram.
    Encode(EncodeArgs),
    /// Remove the cached diagrams of a page.
    Clean(CleanArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Render(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Encode(args) => args.execute(),
        Commands::Clean(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
