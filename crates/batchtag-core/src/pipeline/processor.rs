//! Batch orchestration: wires the model cache and the pipeline stages together.
//!
//! Per image: strip any display suffix from the model selection, make sure
//! that model is resident, preprocess, run, post-process, and write
//! `<stem>.txt` when an output folder is given. A failing image yields an
//! empty tag string and the batch moves on.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::config::{Config, TaggingConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::model::ModelCache;
use crate::progress::{NoProgress, ProgressReporter};
use crate::registry::parse_model_selection;
use crate::types::{BatchReport, ImageOutcome, TaggingResult};

use super::discovery::LoadedImage;
use super::inference;
use super::postprocess::TagPostProcessor;
use super::preprocess;

/// Extension of the per-image tag file.
const ARTIFACT_EXTENSION: &str = "txt";

/// One image to tag, plus the settings to tag it with.
#[derive(Debug, Clone, Copy)]
pub struct TaggingRequest<'a> {
    pub pixels: &'a RgbImage,
    pub filename: &'a str,
    /// Folder for the tag file; `None` skips persistence
    pub output_folder: Option<&'a Path>,
    pub settings: &'a TaggingConfig,
}

/// Tags images against a cached model.
pub struct BatchTagger {
    cache: ModelCache,
    progress: Box<dyn ProgressReporter>,
}

impl BatchTagger {
    /// Create a tagger around an existing cache.
    pub fn new(cache: ModelCache) -> Self {
        Self {
            cache,
            progress: Box::new(NoProgress),
        }
    }

    /// Create a tagger that downloads and runs models as configured.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        Ok(Self::new(ModelCache::from_config(config)?))
    }

    /// Report per-image progress to `progress`.
    pub fn with_progress(mut self, progress: impl ProgressReporter + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Tag one image, surfacing the failure reason.
    pub async fn try_tag_image(
        &mut self,
        request: &TaggingRequest<'_>,
    ) -> PipelineResult<TaggingResult> {
        let start = std::time::Instant::now();
        let settings = request.settings;
        let logical_id = parse_model_selection(&settings.model);

        let model = self
            .cache
            .ensure_loaded_with_progress(
                logical_id,
                settings.use_accelerator,
                self.progress.as_ref(),
            )
            .await?;

        let tensor = preprocess::prepare(request.pixels, model.input_edge())?;
        tracing::trace!("  Preprocess: {:?}", start.elapsed());

        let probabilities = inference::run(model, &tensor)?;

        let (tags, tag_count) =
            TagPostProcessor::from_settings(settings).process(model.labels(), &probabilities);

        let written = request.output_folder.and_then(|folder| {
            write_artifact(folder, request.filename, &tags)
                .map_err(|e| tracing::warn!("{e}"))
                .ok()
        });

        tracing::debug!(
            "Tagged {:?} in {:?} ({} tags)",
            request.filename,
            start.elapsed(),
            tag_count
        );

        Ok(TaggingResult {
            tags,
            tag_count,
            written,
        })
    }

    /// Tag one image. Failures are logged and yield an empty tag string.
    pub async fn tag_image(&mut self, request: &TaggingRequest<'_>) -> TaggingResult {
        match self.try_tag_image(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Failed to tag {}: {e}", request.filename);
                TaggingResult::default()
            }
        }
    }

    /// Tag every image in order, reporting progress after each one.
    pub async fn tag_batch(
        &mut self,
        images: &[LoadedImage],
        output_folder: Option<&Path>,
        settings: &TaggingConfig,
    ) -> BatchReport {
        let start = std::time::Instant::now();
        let total = images.len();
        let mut report = BatchReport::default();

        for (index, image) in images.iter().enumerate() {
            let request = TaggingRequest {
                pixels: &image.pixels,
                filename: &image.filename,
                output_folder,
                settings,
            };

            let outcome = match self.try_tag_image(&request).await {
                Ok(result) => {
                    report.summary.succeeded += 1;
                    if result.written.is_some() {
                        report.summary.tags_written += 1;
                    }
                    self.progress.report(
                        (index + 1) as f32 / total as f32,
                        &format!("{}: {} tags", image.filename, result.tag_count),
                    );
                    ImageOutcome {
                        filename: image.filename.clone(),
                        tags: result.tags,
                        succeeded: true,
                        written: result.written,
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to tag {}: {e}", image.filename);
                    report.summary.failed += 1;
                    self.progress.report(
                        (index + 1) as f32 / total as f32,
                        &format!("{}: failed", image.filename),
                    );
                    ImageOutcome {
                        filename: image.filename.clone(),
                        tags: String::new(),
                        succeeded: false,
                        written: None,
                    }
                }
            };
            report.results.push(outcome);
        }

        report.summary.total_seconds = start.elapsed().as_secs_f64();
        report.summary.images_per_second = rate(total, report.summary.total_seconds);

        tracing::info!(
            "Tagged {} images ({} failed) in {:.2}s",
            report.summary.succeeded,
            report.summary.failed,
            report.summary.total_seconds
        );
        report
    }
}

fn rate(count: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

/// Path of the tag file for `filename` inside `folder`.
pub fn artifact_path(folder: &Path, filename: &str) -> PathBuf {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    folder.join(format!("{stem}.{ARTIFACT_EXTENSION}"))
}

/// Write `tags` to `<folder>/<stem>.txt`, replacing any existing file.
pub fn write_artifact(folder: &Path, filename: &str, tags: &str) -> PipelineResult<PathBuf> {
    let path = artifact_path(folder, filename);
    std::fs::write(&path, tags).map_err(|e| PipelineError::WriteFailed {
        path: path.clone(),
        message: e.to_string(),
    })?;

    tracing::info!("Saved tags to {:?}", path);
    Ok(path)
}
