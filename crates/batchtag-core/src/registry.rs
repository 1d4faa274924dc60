//! Static registry of taggable model variants.
//!
//! Each entry maps a logical model id to the hub repository holding its ONNX
//! graph and label file. Adding a variant means adding an entry here.

use std::path::{Path, PathBuf};

/// Extension of the cached model graph.
pub const MODEL_EXTENSION: &str = "onnx";

/// Extension of the cached label file.
pub const LABEL_EXTENSION: &str = "csv";

/// One taggable model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Stable short key, also the cached file stem
    pub logical_id: &'static str,
    /// Hub repository identifier
    pub remote_location: &'static str,
    /// Model graph filename inside the repository
    pub model_filename: &'static str,
    /// Label file filename inside the repository
    pub label_filename: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
}

const MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        logical_id: "wd-vit-tagger-v3",
        remote_location: "SmilingWolf/wd-vit-tagger-v3",
        model_filename: "model.onnx",
        label_filename: "selected_tags.csv",
        display_name: "WD ViT Tagger v3",
    },
    ModelDescriptor {
        logical_id: "wd-swinv2-tagger-v3",
        remote_location: "SmilingWolf/wd-swinv2-tagger-v3",
        model_filename: "model.onnx",
        label_filename: "selected_tags.csv",
        display_name: "WD SwinV2 Tagger v3",
    },
    ModelDescriptor {
        logical_id: "wd-eva02-large-tagger-v3",
        remote_location: "SmilingWolf/wd-eva02-large-tagger-v3",
        model_filename: "model.onnx",
        label_filename: "selected_tags.csv",
        display_name: "WD EVA02 Large Tagger v3",
    },
    ModelDescriptor {
        logical_id: "wd-convnext-tagger-v3",
        remote_location: "SmilingWolf/wd-convnext-tagger-v3",
        model_filename: "model.onnx",
        label_filename: "selected_tags.csv",
        display_name: "WD ConvNeXT Tagger v3",
    },
];

/// All registered models, in declaration order.
pub fn registry() -> &'static [ModelDescriptor] {
    MODELS
}

impl ModelDescriptor {
    /// Find a model by logical id.
    pub fn lookup(logical_id: &str) -> Option<&'static ModelDescriptor> {
        MODELS.iter().find(|m| m.logical_id == logical_id)
    }

    /// Canonical local path of the model graph.
    pub fn model_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(format!("{}.{}", self.logical_id, MODEL_EXTENSION))
    }

    /// Canonical local path of the label file.
    pub fn label_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(format!("{}.{}", self.logical_id, LABEL_EXTENSION))
    }

    /// True when both assets are present in `models_dir`.
    pub fn is_cached(&self, models_dir: &Path) -> bool {
        self.model_path(models_dir).exists() && self.label_path(models_dir).exists()
    }
}

/// Strip a `|display label` suffix from a model selection.
///
/// Host UIs present choices as `"<id>|<label>"`; bare ids pass through.
pub fn parse_model_selection(selection: &str) -> &str {
    selection
        .split_once('|')
        .map_or(selection, |(id, _)| id)
        .trim()
}

/// Local availability of one registered model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatus {
    pub logical_id: &'static str,
    pub display_name: &'static str,
    pub is_locally_cached: bool,
}

impl ModelStatus {
    /// Render a selection string, `"<id>|<marker> <display name> (<id>)"`.
    ///
    /// Feeding it back through [`parse_model_selection`] yields the id.
    pub fn choice_label(&self) -> String {
        let marker = if self.is_locally_cached {
            "[cached]"
        } else {
            "[download]"
        };
        format!(
            "{}|{} {} ({})",
            self.logical_id, marker, self.display_name, self.logical_id
        )
    }
}

/// Check every registered model against the files in `models_dir`.
pub fn model_statuses(models_dir: &Path) -> Vec<ModelStatus> {
    MODELS
        .iter()
        .map(|m| ModelStatus {
            logical_id: m.logical_id,
            display_name: m.display_name,
            is_locally_cached: m.is_cached(models_dir),
        })
        .collect()
}
