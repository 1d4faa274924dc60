//! Model asset resolution: logical id → local model graph + label file.
//!
//! Assets live at `<models_dir>/<logical_id>.onnx` and
//! `<models_dir>/<logical_id>.csv`. Missing files are fetched into a staging
//! directory first and renamed to their canonical names once complete, so a
//! canonical path never points at a partial download.

pub mod fetch;
pub mod retry;

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::progress::{NoProgress, ProgressReporter};
use crate::registry::ModelDescriptor;

pub use fetch::{ArtifactFetcher, HubFetcher};

/// Staging area for in-flight downloads, inside the models directory.
const STAGING_DIR: &str = ".staging";

/// Local paths of a fully cached model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub model_path: PathBuf,
    pub label_path: PathBuf,
}

/// Maps logical model ids to local files, fetching on first use.
pub struct AssetResolver {
    models_dir: PathBuf,
    fetcher: Box<dyn ArtifactFetcher>,
}

impl AssetResolver {
    /// Create a resolver rooted at `models_dir`.
    pub fn new(models_dir: impl Into<PathBuf>, fetcher: Box<dyn ArtifactFetcher>) -> Self {
        Self {
            models_dir: models_dir.into(),
            fetcher,
        }
    }

    /// Directory holding the cached assets.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Resolve a model to its local files, fetching whatever is missing.
    ///
    /// A fully cached model returns without touching the network.
    pub async fn resolve(&self, logical_id: &str) -> PipelineResult<LocalAsset> {
        self.resolve_with_progress(logical_id, &NoProgress).await
    }

    /// [`resolve`](Self::resolve), reporting download stages to `progress`.
    ///
    /// Nothing is reported when the model is already cached.
    pub async fn resolve_with_progress(
        &self,
        logical_id: &str,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult<LocalAsset> {
        let descriptor =
            ModelDescriptor::lookup(logical_id).ok_or_else(|| PipelineError::UnknownModel {
                id: logical_id.to_string(),
            })?;

        std::fs::create_dir_all(&self.models_dir).map_err(|e| PipelineError::DownloadFailed {
            id: logical_id.to_string(),
            file: self.models_dir.display().to_string(),
            message: format!("Failed to create models directory: {e}"),
            status_code: None,
            transient: false,
        })?;

        let asset = LocalAsset {
            model_path: descriptor.model_path(&self.models_dir),
            label_path: descriptor.label_path(&self.models_dir),
        };

        if asset.model_path.exists() && asset.label_path.exists() {
            tracing::debug!("Model {logical_id} already available");
            return Ok(asset);
        }

        let name = descriptor.display_name;
        tracing::info!(
            "Fetching {} ({}) from {}",
            name,
            logical_id,
            descriptor.remote_location
        );
        progress.report_download(0.0, &format!("Starting download of {name}..."));

        if !asset.model_path.exists() {
            progress.report_download(0.1, &format!("Downloading {name} model file..."));
            self.fetch_into(descriptor, descriptor.model_filename, &asset.model_path)
                .await?;
            tracing::info!("Model file ready at {:?}", asset.model_path);
            progress.report_download(0.5, "Model file downloaded");
        }
        if !asset.label_path.exists() {
            progress.report_download(0.5, &format!("Downloading {name} tags file..."));
            self.fetch_into(descriptor, descriptor.label_filename, &asset.label_path)
                .await?;
            tracing::info!("Label file ready at {:?}", asset.label_path);
            progress.report_download(0.9, "Tags file downloaded");
        }

        let _ = std::fs::remove_dir(self.staging_dir(descriptor));
        let _ = std::fs::remove_dir(self.models_dir.join(STAGING_DIR));

        tracing::info!("Successfully downloaded {logical_id}");
        progress.report_download(1.0, &format!("Download complete, {name} ready"));
        Ok(asset)
    }

    fn staging_dir(&self, descriptor: &ModelDescriptor) -> PathBuf {
        self.models_dir.join(STAGING_DIR).join(descriptor.logical_id)
    }

    /// Fetch one remote file and move it to its canonical local name.
    async fn fetch_into(
        &self,
        descriptor: &ModelDescriptor,
        remote_filename: &str,
        canonical: &Path,
    ) -> PipelineResult<()> {
        let staging = self.staging_dir(descriptor);
        let download_error = |message: String| PipelineError::DownloadFailed {
            id: descriptor.logical_id.to_string(),
            file: remote_filename.to_string(),
            message,
            status_code: None,
            transient: false,
        };

        std::fs::create_dir_all(&staging)
            .map_err(|e| download_error(format!("Failed to create staging directory: {e}")))?;

        let fetched = self
            .fetcher
            .fetch(descriptor.remote_location, remote_filename, &staging)
            .await?;

        // The fetcher contract names the file after the remote basename; a
        // store that serves something else leaves nothing to rename.
        if !fetched.exists() {
            return Err(download_error(format!(
                "Fetched file not found at {}",
                fetched.display()
            )));
        }

        std::fs::rename(&fetched, canonical).map_err(|e| {
            let _ = std::fs::remove_file(&fetched);
            download_error(format!(
                "Failed to move {} to {}: {e}",
                fetched.display(),
                canonical.display()
            ))
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher for exercising the resolver without a network.

    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Label file content used by fake fetches.
    pub const LABEL_CSV: &str = "tag_id,name,category,count\n\
                                 0,general,9,100\n\
                                 1,blue_sky,0,50\n\
                                 2,Cat,0,40\n";

    /// Writes canned content for each requested file and counts calls.
    #[derive(Clone, Default)]
    pub struct FakeFetcher {
        pub calls: Arc<AtomicUsize>,
        /// Remote filename that fails instead of being written
        pub fail_on: Option<&'static str>,
    }

    impl FakeFetcher {
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArtifactFetcher for FakeFetcher {
        async fn fetch(
            &self,
            repo_id: &str,
            filename: &str,
            dest_dir: &Path,
        ) -> PipelineResult<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(filename) {
                return Err(PipelineError::DownloadFailed {
                    id: repo_id.to_string(),
                    file: filename.to_string(),
                    message: "HTTP 404".to_string(),
                    status_code: Some(404),
                    transient: false,
                });
            }
            let dest = dest_dir.join(filename);
            let content: &[u8] = if filename.ends_with(".csv") {
                LABEL_CSV.as_bytes()
            } else {
                b"onnx-bytes"
            };
            std::fs::write(&dest, content).unwrap();
            Ok(dest)
        }
    }
}
