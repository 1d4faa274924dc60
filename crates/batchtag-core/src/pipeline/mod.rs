//! Image tagging pipeline components.
//!
//! This module contains all the stages of the tagging pipeline:
//! - **discovery**: Find and decode images in a folder
//! - **preprocess**: Letterbox and convert pixels to the model's tensor layout
//! - **inference**: Run the resident model on a tensor
//! - **postprocess**: Threshold, exclude and assemble the tag string
//! - **processor**: Orchestrates the per-image flow and batches

pub mod discovery;
pub mod inference;
pub mod postprocess;
pub mod preprocess;
pub mod processor;

// Re-exports for convenient access
pub use discovery::{FolderLoader, LoadedImage};
pub use postprocess::{compose, TagPostProcessor};
pub use preprocess::prepare;
pub use processor::{write_artifact, BatchTagger, TaggingRequest};
