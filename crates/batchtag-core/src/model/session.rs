//! ONNX Runtime session construction and execution.
//!
//! Loads a tagger graph, reads its declared input metadata, and runs single
//! image forward passes. Session creation prefers the CUDA execution provider
//! when asked and silently drops back to CPU if it cannot be registered.

use std::fmt::Display;
use std::path::Path;

use ndarray::Array4;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::{Value, ValueType};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::inference::first_batch_row;

/// Hardware path a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionBackend {
    Accelerator,
    Cpu,
}

impl Display for ExecutionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionBackend::Accelerator => write!(f, "cuda"),
            ExecutionBackend::Cpu => write!(f, "cpu"),
        }
    }
}

/// A loaded inference session for one tagger model.
pub trait TaggerSession: Send + Sync {
    /// Name of the image input tensor.
    fn input_name(&self) -> &str;

    /// Square input edge declared by the graph, if static.
    fn input_edge(&self) -> Option<u32>;

    /// Backend the session ended up on.
    fn backend(&self) -> ExecutionBackend;

    /// Run one forward pass and return the first output's first batch row.
    fn run(&mut self, input_name: &str, tensor: &Array4<f32>) -> PipelineResult<Vec<f32>>;
}

/// Builds sessions from model files.
pub trait SessionFactory: Send + Sync {
    fn create(
        &self,
        model_path: &Path,
        use_accelerator: bool,
    ) -> PipelineResult<Box<dyn TaggerSession>>;
}

/// Production factory backed by ONNX Runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrtSessionFactory;

impl SessionFactory for OrtSessionFactory {
    fn create(
        &self,
        model_path: &Path,
        use_accelerator: bool,
    ) -> PipelineResult<Box<dyn TaggerSession>> {
        Ok(Box::new(OrtSession::load(model_path, use_accelerator)?))
    }
}

/// Wraps an ONNX Runtime session for a WD-style tagger.
pub struct OrtSession {
    session: Session,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Static spatial edge from the NHWC input shape.
    input_edge: Option<u32>,
    backend: ExecutionBackend,
}

impl OrtSession {
    /// Load a tagger graph, trying the accelerator first when requested.
    pub fn load(model_path: &Path, use_accelerator: bool) -> PipelineResult<Self> {
        let (session, backend) = if use_accelerator {
            match Self::commit(model_path, ExecutionBackend::Accelerator) {
                Ok(session) => (session, ExecutionBackend::Accelerator),
                Err(e) => {
                    tracing::warn!("GPU not available, falling back to CPU: {e}");
                    (
                        Self::commit(model_path, ExecutionBackend::Cpu)?,
                        ExecutionBackend::Cpu,
                    )
                }
            }
        } else {
            (
                Self::commit(model_path, ExecutionBackend::Cpu)?,
                ExecutionBackend::Cpu,
            )
        };

        let input = session.inputs().first().ok_or_else(|| PipelineError::Load {
            path: model_path.to_path_buf(),
            message: "Model declares no inputs".to_string(),
        })?;
        let input_name = input.name().to_string();
        // WD taggers take NHWC input, so the edge is dimension 1.
        let input_edge = match input.dtype() {
            ValueType::Tensor { shape, .. } => shape
                .get(1)
                .copied()
                .filter(|&d| d > 0)
                .and_then(|d| u32::try_from(d).ok()),
            _ => None,
        };

        tracing::debug!(
            "Loaded tagger from {:?} on {} (input: {:?}, edge: {:?}, outputs: {:?})",
            model_path,
            backend,
            input_name,
            input_edge,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session,
            input_name,
            input_edge,
            backend,
        })
    }

    fn commit(model_path: &Path, backend: ExecutionBackend) -> PipelineResult<Session> {
        let mut builder = Session::builder()
            .map_err(|e| load_error(model_path, "Failed to create ONNX session builder", e))?;

        if backend == ExecutionBackend::Accelerator {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .build()
                    .error_on_failure()])
                .map_err(|e| load_error(model_path, "Failed to register CUDA provider", e))?;
        }

        builder
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, "Failed to load ONNX model", e))
    }
}

impl TaggerSession for OrtSession {
    fn input_name(&self) -> &str {
        &self.input_name
    }

    fn input_edge(&self) -> Option<u32> {
        self.input_edge
    }

    fn backend(&self) -> ExecutionBackend {
        self.backend
    }

    fn run(&mut self, input_name: &str, tensor: &Array4<f32>) -> PipelineResult<Vec<f32>> {
        // Convert ndarray to (shape, flat_data) for ort (avoids ndarray version coupling).
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| PipelineError::InferenceFailed {
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let inputs = ort::inputs![input_name => input_value];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| PipelineError::InferenceFailed {
                message: format!("ONNX inference failed: {e}"),
            })?;

        let (_, first) = outputs
            .iter()
            .next()
            .ok_or_else(|| PipelineError::InferenceFailed {
                message: "Model produced no outputs".to_string(),
            })?;

        let (shape, data) =
            first
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::InferenceFailed {
                    message: format!("Failed to extract output tensor: {e}"),
                })?;

        first_batch_row(&shape[..], data)
    }
}

fn load_error(path: &Path, context: &str, e: impl Display) -> PipelineError {
    PipelineError::Load {
        path: path.to_path_buf(),
        message: format!("{context}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display() {
        assert_eq!(ExecutionBackend::Accelerator.to_string(), "cuda");
        assert_eq!(ExecutionBackend::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_missing_model_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = OrtSessionFactory.create(&dir.path().join("absent.onnx"), false);
        assert!(matches!(result, Err(PipelineError::Load { .. })));
    }

    #[test]
    fn test_corrupt_model_file_is_load_error_even_with_accelerator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();

        // Accelerator failure falls back to CPU; the CPU attempt then fails
        // on the graph itself and that is what surfaces.
        let result = OrtSessionFactory.create(&path, true);
        assert!(matches!(result, Err(PipelineError::Load { .. })));
    }
}
