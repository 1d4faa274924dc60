//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where model assets are cached
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.batchtag/models"),
        }
    }
}

/// Tagging settings, the defaults for every image in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Logical model id from the registry
    pub model: String,

    /// Minimum probability for a tag to be kept (strictly greater than).
    pub threshold: f64,

    /// Threshold intended for character tags.
    /// Accepted and carried through, but filtering uses `threshold` for
    /// every label.
    pub character_threshold: f64,

    /// Replace underscores in labels with spaces
    pub replace_underscore: bool,

    /// Prefer an accelerator execution provider, falling back to CPU
    pub use_accelerator: bool,

    /// Tags written before the model's tags
    pub prepend_tags: String,

    /// Comma-separated tags to drop (case-insensitive)
    pub exclude_tags: String,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            model: "wd-vit-tagger-v3".to_string(),
            threshold: 0.35,
            character_threshold: 0.85,
            replace_underscore: true,
            use_accelerator: false,
            prepend_tags: String::new(),
            exclude_tags: String::new(),
        }
    }
}

/// Remote artifact store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Base URL of the model hub
    pub endpoint: String,

    /// Repository revision to resolve files against
    pub revision: String,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,

    /// Per-file request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://huggingface.co".to_string(),
            revision: "main".to_string(),
            retry_attempts: 3,
            retry_delay_ms: 1000,
            timeout_secs: 600,
        }
    }
}

/// Folder scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
