//! The `batchtag tag` command: tag a folder of images.

use std::path::{Path, PathBuf};

use batchtag_core::config::TaggingConfig;
use batchtag_core::{BatchSummary, BatchTagger, Config, FolderLoader, ProgressReporter};
use clap::Args;
use indicatif::ProgressBar;

/// Arguments for the `tag` command.
#[derive(Args, Debug, Default)]
pub struct TagArgs {
    /// Folder of images to tag (not recursive)
    #[arg(required = true)]
    pub folder: PathBuf,

    /// Folder for the .txt tag files (defaults to the image folder)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Model id, see `batchtag models list`
    #[arg(short, long, env = "BATCHTAG_MODEL")]
    pub model: Option<String>,

    /// Keep tags scoring strictly above this probability
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Threshold for character tags (accepted; the main threshold applies to all tags)
    #[arg(long)]
    pub character_threshold: Option<f64>,

    /// Keep underscores in tag names
    #[arg(long)]
    pub no_replace_underscore: bool,

    /// Run on the GPU when available, otherwise fall back to CPU
    #[arg(long)]
    pub gpu: bool,

    /// Comma-separated tags written before the model's tags
    #[arg(long)]
    pub prepend: Option<String>,

    /// Comma-separated tags to drop (case-insensitive)
    #[arg(long)]
    pub exclude: Option<String>,

    /// Write the per-image results and summary as JSON to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

impl TagArgs {
    /// Config defaults with this invocation's flags applied on top.
    pub fn settings(&self, defaults: &TaggingConfig) -> anyhow::Result<TaggingConfig> {
        let mut settings = defaults.clone();

        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if let Some(threshold) = self.character_threshold {
            settings.character_threshold = threshold;
        }
        if self.no_replace_underscore {
            settings.replace_underscore = false;
        }
        if self.gpu {
            settings.use_accelerator = true;
        }
        if let Some(prepend) = &self.prepend {
            settings.prepend_tags = prepend.clone();
        }
        if let Some(exclude) = &self.exclude {
            settings.exclude_tags = exclude.clone();
        }

        anyhow::ensure!(
            (0.0..=1.0).contains(&settings.threshold),
            "--threshold must be between 0 and 1, got {}",
            settings.threshold
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&settings.character_threshold),
            "--character-threshold must be between 0 and 1, got {}",
            settings.character_threshold
        );

        Ok(settings)
    }

    fn output_folder(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.folder)
    }
}

/// Execute the tag command.
pub async fn execute(args: TagArgs, config: &Config) -> anyhow::Result<()> {
    if !args.folder.is_dir() {
        anyhow::bail!("Not a folder: {}", args.folder.display());
    }
    let settings = args.settings(&config.tagging)?;

    let output_folder = args.output_folder();
    std::fs::create_dir_all(output_folder)?;

    let images = FolderLoader::new(config.processing.clone()).load(&args.folder);
    if images.is_empty() {
        tracing::warn!("No supported images found in {:?}", args.folder);
        return Ok(());
    }
    tracing::info!(
        "Tagging {} images with {} (threshold {})",
        images.len(),
        settings.model,
        settings.threshold
    );

    let progress = create_progress_bar(images.len() as u64);
    let mut tagger =
        BatchTagger::from_config(config)?.with_progress(BarReporter(progress.clone()));

    let report = tagger
        .tag_batch(&images, Some(output_folder), &settings)
        .await;
    progress.finish_and_clear();

    print_summary(&report.summary);

    if let Some(path) = &args.summary {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!("Summary written to {:?}", path);
    }

    if report.summary.succeeded == 0 {
        anyhow::bail!("All {} images failed to tag", report.summary.failed);
    }
    Ok(())
}

/// Advances the bar once per image; download stages only update the message.
struct BarReporter(ProgressBar);

impl ProgressReporter for BarReporter {
    fn report(&self, _fraction_done: f32, message: &str) {
        self.0.inc(1);
        self.0.set_message(message.to_string());
    }

    fn report_download(&self, fraction_done: f32, message: &str) {
        self.0
            .set_message(format!("{message} ({:.0}%)", fraction_done * 100.0));
    }
}

/// Create a progress bar for batch tagging.
fn create_progress_bar(total: u64) -> ProgressBar {
    use indicatif::ProgressStyle;

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("loading model...");
    pb
}

/// Print a formatted summary table after tagging.
fn print_summary(summary: &BatchSummary) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Tagged:       {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("    Files saved:  {:>8}", summary.tags_written);
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", summary.total_seconds);
    eprintln!("    Rate:         {:>7.1} img/sec", summary.images_per_second);
    eprintln!("  ====================================");
}
