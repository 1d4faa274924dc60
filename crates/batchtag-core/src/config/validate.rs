//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::registry::{parse_model_selection, ModelDescriptor};

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if ModelDescriptor::lookup(parse_model_selection(&self.tagging.model)).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "tagging.model '{}' is not a known model",
                self.tagging.model
            )));
        }
        if !(0.0..=1.0).contains(&self.tagging.threshold) {
            return Err(ConfigError::ValidationError(
                "tagging.threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tagging.character_threshold) {
            return Err(ConfigError::ValidationError(
                "tagging.character_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.download.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "download.timeout_secs must be > 0".into(),
            ));
        }
        if self.processing.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.supported_formats must not be empty".into(),
            ));
        }
        Ok(())
    }
}
