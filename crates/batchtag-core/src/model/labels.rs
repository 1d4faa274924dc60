//! Label file loading.
//!
//! WD taggers ship `selected_tags.csv`:
//!
//! ```csv
//! tag_id,name,category,count
//! 9999999,general,9,807691
//! 470575,1girl,0,4395064
//! ```
//!
//! The header row is skipped and the label is the second column. Row order is
//! the model's output order.

use std::path::Path;

use crate::error::{PipelineError, PipelineResult};

/// Read the ordered label list from a label file.
pub fn load_labels(path: &Path) -> PipelineResult<Vec<String>> {
    if !path.exists() {
        return Err(PipelineError::LabelFileMissing(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::Load {
            path: path.to_path_buf(),
            message: format!("Failed to open label file: {e}"),
        })?;

    let mut labels = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::Load {
            path: path.to_path_buf(),
            message: format!("Malformed label file: {e}"),
        })?;
        if let Some(name) = record.get(1) {
            labels.push(name.to_string());
        }
    }

    tracing::debug!("Loaded {} labels from {:?}", labels.len(), path);
    Ok(labels)
}
