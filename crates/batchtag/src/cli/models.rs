//! The `batchtag models` command for managing tagger models.

use batchtag_core::registry::{self, model_statuses, parse_model_selection, ModelStatus};
use batchtag_core::{AssetResolver, Config, HubFetcher};
use clap::{Args, Subcommand};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List registered models and whether they are cached
    List {
        /// Print selection strings (`<id>|<label>`) instead of a table
        #[arg(long)]
        choices: bool,
    },

    /// Download a model (or every registered model) ahead of time
    Download {
        /// Model id; all models when omitted
        id: Option<String>,
    },

    /// Show model directory path
    Path,
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    let model_dir = config.model_dir();

    match args.command {
        ModelsCommand::List { choices } => {
            let statuses = model_statuses(&model_dir);
            if choices {
                for status in &statuses {
                    println!("{}", status.choice_label());
                }
            } else {
                println!("Models:");
                println!("  Directory: {}\n", model_dir.display());
                for status in &statuses {
                    println!("{}", list_line(status, &config.tagging.model));
                }
            }
        }

        ModelsCommand::Download { id } => {
            let ids: Vec<&str> = match &id {
                Some(id) => vec![parse_model_selection(id)],
                None => registry::registry().iter().map(|m| m.logical_id).collect(),
            };

            let fetcher = HubFetcher::new(config.download.clone())?;
            let resolver = AssetResolver::new(&model_dir, Box::new(fetcher));

            for id in ids {
                let asset = resolver.resolve(id).await?;
                println!("{id}");
                println!("  model:  {}", asset.model_path.display());
                println!("  labels: {}", asset.label_path.display());
            }
            tracing::info!("All downloads complete.");
        }

        ModelsCommand::Path => {
            println!("{}", model_dir.display());
        }
    }

    Ok(())
}

fn list_line(status: &ModelStatus, default_model: &str) -> String {
    let state = if status.is_locally_cached {
        "ready"
    } else {
        "not downloaded"
    };
    let default_marker = if status.logical_id == parse_model_selection(default_model) {
        "  (default)"
    } else {
        ""
    };
    format!(
        "    - {:28} {:16}{}{}",
        status.logical_id,
        state,
        status.display_name,
        default_marker
    )
}
