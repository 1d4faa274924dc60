//! Core data types for the batchtag pipeline.
//!
//! These types represent the output of tagging an image or a folder of images.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A label the model scored above threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// The formatted label (e.g., "blue sky", "1girl")
    pub name: String,

    /// Model probability from 0.0 to 1.0
    pub confidence: f32,
}

impl Tag {
    /// Create a new tag with the given name and confidence.
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Output of tagging a single image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggingResult {
    /// Final comma-separated tag string (prepend + selected tags)
    pub tags: String,

    /// Number of model tags selected, excluding prepended ones
    pub tag_count: usize,

    /// Where the tag file was written, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<PathBuf>,
}

/// Per-image entry in a batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub filename: String,

    /// Tag string; empty when the image failed
    pub tags: String,

    pub succeeded: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<PathBuf>,
}

/// Processing statistics for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchSummary {
    /// Total images tagged successfully
    pub succeeded: usize,

    /// Total images that failed
    pub failed: usize,

    /// Tag files persisted
    pub tags_written: usize,

    /// Total processing time in seconds
    pub total_seconds: f64,

    /// Processing rate in images per second
    pub images_per_second: f64,
}

/// Everything a batch produced, in input order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchReport {
    pub results: Vec<ImageOutcome>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_result_omits_path() {
        let result = TaggingResult {
            tags: "studio, ear".to_string(),
            tag_count: 1,
            written: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"tags\":\"studio, ear\""));
        assert!(!json.contains("written"));
    }

    #[test]
    fn test_summary_serializes_all_counters() {
        let summary = BatchSummary {
            succeeded: 2,
            failed: 1,
            tags_written: 2,
            total_seconds: 1.5,
            images_per_second: 2.0,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["succeeded"], 2);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["tags_written"], 2);
        assert_eq!(json["images_per_second"], 2.0);
    }
}
