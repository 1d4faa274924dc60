//! Single-slot model cache.
//!
//! Holds at most one loaded tagger (session + labels + input geometry).
//! Requesting the resident model is free; requesting a different one resolves
//! its assets, builds the new session, then replaces and drops the old one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use batchtag_core::{Config, ModelCache};
//!
//! let config = Config::default();
//! let mut cache = ModelCache::from_config(&config)?;
//! let model = cache.ensure_loaded("wd-vit-tagger-v3", false).await?;
//! println!("{} labels, {}px input", model.labels().len(), model.input_edge());
//! ```

pub mod labels;
pub mod session;

use crate::assets::{AssetResolver, HubFetcher};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::progress::{NoProgress, ProgressReporter};

pub use session::{ExecutionBackend, OrtSessionFactory, SessionFactory, TaggerSession};

use self::labels::load_labels;

/// A resident tagger model. Owned exclusively by [`ModelCache`].
pub struct LoadedModel {
    logical_id: String,
    session: Box<dyn TaggerSession>,
    /// Index-aligned with the model's output vector.
    labels: Vec<String>,
    input_name: String,
    input_edge: u32,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("logical_id", &self.logical_id)
            .field("input_name", &self.input_name)
            .field("input_edge", &self.input_edge)
            .finish_non_exhaustive()
    }
}

impl LoadedModel {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Square edge the preprocessor must produce.
    pub fn input_edge(&self) -> u32 {
        self.input_edge
    }

    pub fn backend(&self) -> ExecutionBackend {
        self.session.backend()
    }

    /// Session and input name, split so the runner can borrow both.
    pub(crate) fn session_parts(&mut self) -> (&mut dyn TaggerSession, &str) {
        (self.session.as_mut(), &self.input_name)
    }
}

/// Process-wide cache of the one loaded model.
///
/// Only [`ModelCache::ensure_loaded`] mutates the slot. The cache is not
/// synchronized: callers running batches on several threads must wrap it in
/// a mutex, since the session is not safe to replace while another caller
/// runs it.
pub struct ModelCache {
    resolver: AssetResolver,
    factory: Box<dyn SessionFactory>,
    current: Option<LoadedModel>,
}

impl ModelCache {
    /// Create an empty cache.
    pub fn new(resolver: AssetResolver, factory: Box<dyn SessionFactory>) -> Self {
        Self {
            resolver,
            factory,
            current: None,
        }
    }

    /// Create a cache that downloads from the configured hub and runs on
    /// ONNX Runtime.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        let fetcher = HubFetcher::new(config.download.clone())?;
        let resolver = AssetResolver::new(config.model_dir(), Box::new(fetcher));
        Ok(Self::new(resolver, Box::new(OrtSessionFactory)))
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// The resident model, if any.
    pub fn current(&self) -> Option<&LoadedModel> {
        self.current.as_ref()
    }

    /// Whether `logical_id` is the resident model.
    pub fn is_loaded(&self, logical_id: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|m| m.logical_id == logical_id)
    }

    /// Make `logical_id` the resident model and return it.
    ///
    /// A hit returns immediately without touching storage. The accelerator
    /// preference only applies when a session is built; a hit keeps the
    /// backend the resident session already has. On failure the previous
    /// model stays resident.
    pub async fn ensure_loaded(
        &mut self,
        logical_id: &str,
        use_accelerator: bool,
    ) -> PipelineResult<&mut LoadedModel> {
        self.ensure_loaded_with_progress(logical_id, use_accelerator, &NoProgress)
            .await
    }

    /// [`ensure_loaded`](Self::ensure_loaded), reporting first-use download
    /// stages to `progress`.
    pub async fn ensure_loaded_with_progress(
        &mut self,
        logical_id: &str,
        use_accelerator: bool,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult<&mut LoadedModel> {
        if !self.is_loaded(logical_id) {
            let model = self.load(logical_id, use_accelerator, progress).await?;
            if let Some(old) = self.current.replace(model) {
                tracing::debug!("Released model {}", old.logical_id);
            }
        }

        self.current
            .as_mut()
            .ok_or_else(|| PipelineError::UnknownModel {
                id: logical_id.to_string(),
            })
    }

    async fn load(
        &self,
        logical_id: &str,
        use_accelerator: bool,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult<LoadedModel> {
        let start = std::time::Instant::now();
        let asset = self
            .resolver
            .resolve_with_progress(logical_id, progress)
            .await?;

        if !asset.label_path.exists() {
            return Err(PipelineError::LabelFileMissing(asset.label_path));
        }
        let labels = load_labels(&asset.label_path)?;

        let session = self.factory.create(&asset.model_path, use_accelerator)?;
        let input_name = session.input_name().to_string();
        let input_edge = session.input_edge().ok_or_else(|| PipelineError::Load {
            path: asset.model_path.clone(),
            message: "Model input does not declare a static square size".to_string(),
        })?;

        tracing::info!(
            "Model {} loaded and cached ({} labels, {}x{} input, {}) in {:?}",
            logical_id,
            labels.len(),
            input_edge,
            input_edge,
            session.backend(),
            start.elapsed()
        );

        Ok(LoadedModel {
            logical_id: logical_id.to_string(),
            session,
            labels,
            input_name,
            input_edge,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Session doubles for exercising the cache and pipeline without ONNX Runtime.

    use super::*;
    use ndarray::Array4;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns fixed probabilities for every forward pass.
    pub struct FakeSession {
        pub edge: Option<u32>,
        pub scores: Vec<f32>,
        pub runs: Arc<AtomicUsize>,
    }

    impl TaggerSession for FakeSession {
        fn input_name(&self) -> &str {
            "input_1:0"
        }

        fn input_edge(&self) -> Option<u32> {
            self.edge
        }

        fn backend(&self) -> ExecutionBackend {
            ExecutionBackend::Cpu
        }

        fn run(&mut self, input_name: &str, tensor: &Array4<f32>) -> PipelineResult<Vec<f32>> {
            assert_eq!(input_name, "input_1:0");
            let edge = self.edge.unwrap_or_default() as usize;
            assert_eq!(tensor.shape(), &[1, edge, edge, 3]);
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores.clone())
        }
    }

    /// Builds [`FakeSession`]s and counts how many it built.
    #[derive(Clone)]
    pub struct FakeFactory {
        pub edge: Option<u32>,
        pub scores: Vec<f32>,
        pub created: Arc<AtomicUsize>,
        pub runs: Arc<AtomicUsize>,
    }

    impl FakeFactory {
        pub fn new(edge: u32, scores: Vec<f32>) -> Self {
            Self {
                edge: Some(edge),
                scores,
                created: Arc::default(),
                runs: Arc::default(),
            }
        }

        pub fn created(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }
    }

    impl SessionFactory for FakeFactory {
        fn create(
            &self,
            model_path: &Path,
            _use_accelerator: bool,
        ) -> PipelineResult<Box<dyn TaggerSession>> {
            assert!(model_path.exists());
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                edge: self.edge,
                scores: self.scores.clone(),
                runs: self.runs.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeFactory;
    use super::*;
    use crate::assets::testing::FakeFetcher;
    use crate::registry::ModelDescriptor;

    fn cache_with(dir: &std::path::Path, fetcher: FakeFetcher, factory: FakeFactory) -> ModelCache {
        let resolver = AssetResolver::new(dir, Box::new(fetcher));
        ModelCache::new(resolver, Box::new(factory))
    }

    #[tokio::test]
    async fn test_second_load_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default();
        let factory = FakeFactory::new(8, vec![0.1, 0.9, 0.5]);
        let mut cache = cache_with(dir.path(), fetcher.clone(), factory.clone());

        cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap();
        cache.ensure_loaded("wd-vit-tagger-v3", true).await.unwrap();

        assert_eq!(fetcher.call_count(), 2); // model + labels, once
        assert_eq!(factory.created(), 1);
        assert!(cache.is_loaded("wd-vit-tagger-v3"));
    }

    #[tokio::test]
    async fn test_loaded_model_carries_labels_and_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FakeFactory::new(448, vec![0.0; 3]);
        let mut cache = cache_with(dir.path(), FakeFetcher::default(), factory);

        let model = cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap();
        assert_eq!(model.logical_id(), "wd-vit-tagger-v3");
        assert_eq!(model.labels(), &["general", "blue_sky", "Cat"]);
        assert_eq!(model.input_edge(), 448);
        assert_eq!(model.input_name(), "input_1:0");
        assert_eq!(model.backend(), ExecutionBackend::Cpu);
    }

    #[tokio::test]
    async fn test_different_model_replaces_slot() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FakeFactory::new(8, vec![0.0; 3]);
        let mut cache = cache_with(dir.path(), FakeFetcher::default(), factory.clone());

        cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap();
        cache
            .ensure_loaded("wd-convnext-tagger-v3", false)
            .await
            .unwrap();

        assert_eq!(factory.created(), 2);
        assert!(cache.is_loaded("wd-convnext-tagger-v3"));
        assert!(!cache.is_loaded("wd-vit-tagger-v3"));
        assert_eq!(
            cache.current().map(|m| m.logical_id()),
            Some("wd-convnext-tagger-v3")
        );
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_model() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FakeFactory::new(8, vec![0.0; 3]);
        let mut cache = cache_with(dir.path(), FakeFetcher::default(), factory.clone());

        cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap();
        let err = cache.ensure_loaded("wd-unknown", false).await.unwrap_err();

        assert!(matches!(err, PipelineError::UnknownModel { .. }));
        assert!(cache.is_loaded("wd-vit-tagger-v3"));
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test]
    async fn test_download_failure_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher {
            fail_on: Some("selected_tags.csv"),
            ..FakeFetcher::default()
        };
        let factory = FakeFactory::new(8, vec![0.0; 3]);
        let mut cache = cache_with(dir.path(), fetcher, factory.clone());

        let err = cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap_err();
        assert!(matches!(err, PipelineError::DownloadFailed { .. }));
        assert!(cache.current().is_none());
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_dynamic_input_size_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FakeFactory {
            edge: None,
            ..FakeFactory::new(8, vec![0.0; 3])
        };
        let mut cache = cache_with(dir.path(), FakeFetcher::default(), factory);

        let err = cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert!(cache.current().is_none());
    }

    #[tokio::test]
    async fn test_cached_files_skip_fetch_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let model = ModelDescriptor::lookup("wd-eva02-large-tagger-v3").unwrap();
        std::fs::write(model.model_path(dir.path()), b"onnx").unwrap();
        std::fs::write(model.label_path(dir.path()), "id,name\n0,a\n").unwrap();

        let fetcher = FakeFetcher::default();
        let factory = FakeFactory::new(8, vec![0.0]);
        let mut cache = cache_with(dir.path(), fetcher.clone(), factory);

        let loaded = cache
            .ensure_loaded("wd-eva02-large-tagger-v3", false)
            .await
            .unwrap();
        assert_eq!(loaded.labels(), &["a"]);
        assert_eq!(fetcher.call_count(), 0);
    }
}
