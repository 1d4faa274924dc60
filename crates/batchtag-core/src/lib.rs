//! batchtag core - cached multi-label image tagging.
//!
//! Runs folders of images through a WD-style ONNX tagger and writes one
//! comma-separated tag file per image. The model is fetched on first use,
//! loaded once, and reused for every image that follows.
//!
//! # Architecture
//!
//! ```text
//! AssetResolver → ModelCache → Preprocess → Inference → TagPostProcessor → <stem>.txt
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use batchtag_core::{BatchTagger, Config, FolderLoader};
//!
//! #[tokio::main]
//! async fn main() -> batchtag_core::Result<()> {
//!     let config = Config::load()?;
//!     let images = FolderLoader::new(config.processing.clone()).load("./images".as_ref());
//!
//!     let mut tagger = BatchTagger::from_config(&config)?;
//!     let report = tagger
//!         .tag_batch(&images, Some("./images".as_ref()), &config.tagging)
//!         .await;
//!     println!("{} tagged", report.summary.succeeded);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod assets;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod types;

// Re-exports for convenient access
pub use assets::{AssetResolver, HubFetcher, LocalAsset};
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, Result, TaggerError};
pub use model::{LoadedModel, ModelCache};
pub use pipeline::{BatchTagger, FolderLoader, LoadedImage, TagPostProcessor, TaggingRequest};
pub use progress::{NoProgress, ProgressReporter};
pub use registry::{ModelDescriptor, ModelStatus};
pub use types::{BatchReport, BatchSummary, ImageOutcome, Tag, TaggingResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
