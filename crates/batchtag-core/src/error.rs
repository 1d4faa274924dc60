//! Error types for the batchtag tagging pipeline.
//!
//! Errors are organized by stage so a failed image can be logged with the
//! model id, file path or dimensions that caused it.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for batchtag operations.
#[derive(Error, Debug)]
pub enum TaggerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors, one variant per failure kind.
///
/// None of these are fatal to a batch: the orchestrator logs them and moves
/// on to the next image.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The requested model id is not in the registry
    #[error("Unknown model: {id}")]
    UnknownModel { id: String },

    /// Fetching a model asset from the remote store failed
    #[error("Download of {file} for {id} failed: {message}")]
    DownloadFailed {
        id: String,
        file: String,
        message: String,
        /// HTTP status code, when the failure came from a response
        status_code: Option<u16>,
        /// Timeout or refused connection before any response arrived
        transient: bool,
    },

    /// The label file is absent after asset resolution
    #[error("Label file not found: {0}")]
    LabelFileMissing(PathBuf),

    /// Inference session construction or label parsing failed
    #[error("Failed to load model from {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// Image decoding failed while loading a folder
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Pixel data has zero width or height
    #[error("Empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Fit-to-edge resize produced a zero-sized side
    #[error("Invalid resize dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The forward pass failed
    #[error("Inference failed: {message}")]
    InferenceFailed { message: String },

    /// Model output does not line up with the label list
    #[error("Model produced {probabilities} scores for {labels} labels")]
    LabelMismatch { labels: usize, probabilities: usize },

    /// Persisting a tag file failed
    #[error("Failed to write {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },
}

/// Convenience type alias for batchtag results.
pub type Result<T> = std::result::Result<T, TaggerError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_message_names_id() {
        let err = PipelineError::UnknownModel {
            id: "wd-nonexistent".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown model: wd-nonexistent");
    }

    #[test]
    fn test_pipeline_error_converts_to_tagger_error() {
        let err: TaggerError = PipelineError::EmptyImage {
            width: 0,
            height: 12,
        }
        .into();
        assert!(err.to_string().contains("Empty image (0x12)"));
    }
}
