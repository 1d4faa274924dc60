//! Tag selection and output assembly.
//!
//! Turns the model's probability vector into the final tag string:
//!
//! ```text
//! labels + probabilities → format (underscores) → threshold (strict >) → exclude → join
//! ```
//!
//! Tags keep the label file's order; nothing is sorted by confidence.

use std::collections::HashSet;

use crate::config::TaggingConfig;
use crate::types::Tag;

/// Separator between tags in the output string.
const SEPARATOR: &str = ", ";

/// Display form of a label.
pub fn format_label(label: &str, replace_underscore: bool) -> String {
    if replace_underscore {
        label.replace('_', " ")
    } else {
        label.to_string()
    }
}

/// Parse a comma-separated exclusion list into lowercased, trimmed terms.
pub fn parse_exclusions(exclude_csv: &str) -> HashSet<String> {
    exclude_csv
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Filters and formats model output for one set of tagging settings.
#[derive(Debug, Clone)]
pub struct TagPostProcessor {
    /// Scores are widened to `f64` before comparing against this.
    threshold: f64,
    exclusions: HashSet<String>,
    replace_underscore: bool,
    prepend: String,
}

impl TagPostProcessor {
    pub fn new(threshold: f64, exclude_csv: &str, replace_underscore: bool, prepend: &str) -> Self {
        Self {
            threshold,
            exclusions: parse_exclusions(exclude_csv),
            replace_underscore,
            prepend: prepend.trim().to_string(),
        }
    }

    /// Build from the tagging section of the config.
    ///
    /// `character_threshold` is not consulted: one threshold covers every label.
    pub fn from_settings(settings: &TaggingConfig) -> Self {
        Self::new(
            settings.threshold,
            &settings.exclude_tags,
            settings.replace_underscore,
            &settings.prepend_tags,
        )
    }

    /// Labels scoring strictly above threshold and not excluded, in label order.
    ///
    /// `labels` and `probabilities` must be the same length.
    pub fn select(&self, labels: &[String], probabilities: &[f32]) -> Vec<Tag> {
        debug_assert_eq!(labels.len(), probabilities.len());

        labels
            .iter()
            .zip(probabilities)
            .filter(|(_, p)| f64::from(**p) > self.threshold)
            .map(|(label, &p)| Tag::new(format_label(label, self.replace_underscore), p))
            .filter(|tag| !self.exclusions.contains(&tag.name.to_lowercase()))
            .collect()
    }

    /// Join the prepend and the selected tags.
    pub fn assemble(&self, tags: &[Tag]) -> String {
        let mut output = self.prepend.clone();
        if !output.is_empty() && !tags.is_empty() {
            output.push_str(SEPARATOR);
        }

        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        output.push_str(&names.join(SEPARATOR));
        output
    }

    /// Select and assemble in one step.
    pub fn process(&self, labels: &[String], probabilities: &[f32]) -> (String, usize) {
        let tags = self.select(labels, probabilities);
        (self.assemble(&tags), tags.len())
    }
}

/// Compose the final tag string from raw model output.
pub fn compose(
    labels: &[String],
    probabilities: &[f32],
    threshold: f64,
    exclude_csv: &str,
    replace_underscore: bool,
    prepend: &str,
) -> String {
    TagPostProcessor::new(threshold, exclude_csv, replace_underscore, prepend)
        .process(labels, probabilities)
        .0
}
