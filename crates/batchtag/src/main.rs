//! batchtag CLI - Batch image tagging with WD-style ONNX taggers.
//!
//! batchtag runs every image in a folder through a multi-label tagger and
//! writes a comma-separated tag file next to it (or into an output folder).
//! Models are downloaded on first use and loaded once per run.
//!
//! # Usage
//!
//! ```bash
//! # Tag a folder in place
//! batchtag tag ./dataset/
//!
//! # Tag into another folder with a stricter threshold
//! batchtag tag ./dataset/ --output-dir ./captions --threshold 0.5
//!
//! # See which models are cached
//! batchtag models list
//!
//! # View configuration
//! batchtag config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// batchtag - Batch image tagging with WD-style ONNX taggers.
#[derive(Parser, Debug)]
#[command(name = "batchtag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag every image in a folder and write one .txt file per image
    Tag(cli::tag::TagArgs),

    /// Manage tagger models (list, download, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match batchtag_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `batchtag config path`."
            );
            batchtag_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("batchtag v{}", batchtag_core::VERSION);

    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args, &config).await,
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config),
    }
}
