//! Forward pass over a loaded tagger.

use ndarray::Array4;

use crate::error::{PipelineError, PipelineResult};
use crate::model::LoadedModel;

/// Run one prepared tensor through the resident model.
///
/// Returns one probability per label, index-aligned with `model.labels()`.
/// A score vector whose length differs from the label list fails with
/// [`PipelineError::LabelMismatch`].
pub fn run(model: &mut LoadedModel, tensor: &Array4<f32>) -> PipelineResult<Vec<f32>> {
    let start = std::time::Instant::now();
    let label_count = model.labels().len();

    let (session, input_name) = model.session_parts();
    let probabilities = session.run(input_name, tensor)?;

    if probabilities.len() != label_count {
        return Err(PipelineError::LabelMismatch {
            labels: label_count,
            probabilities: probabilities.len(),
        });
    }

    tracing::trace!("  Inference: {:?}", start.elapsed());
    Ok(probabilities)
}

/// Slice the first batch row out of a flat output tensor.
///
/// Accepts `[N]` and `[B, N]` shapes with `B >= 1`.
pub fn first_batch_row(shape: &[i64], data: &[f32]) -> PipelineResult<Vec<f32>> {
    let row_len = match shape {
        [n] => *n,
        [batch, n] if *batch >= 1 => *n,
        _ => {
            return Err(PipelineError::InferenceFailed {
                message: format!("Unexpected output shape {shape:?}"),
            })
        }
    };

    let row_len = usize::try_from(row_len).map_err(|_| PipelineError::InferenceFailed {
        message: format!("Unexpected output shape {shape:?}"),
    })?;

    data.get(..row_len)
        .map(<[f32]>::to_vec)
        .ok_or_else(|| PipelineError::InferenceFailed {
            message: format!(
                "Output holds {} values, shape {shape:?} needs {row_len}",
                data.len()
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::FakeFetcher;
    use crate::assets::AssetResolver;
    use crate::model::testing::FakeFactory;
    use crate::model::ModelCache;

    #[test]
    fn test_first_row_of_batched_output() {
        let row = first_batch_row(&[2, 3], &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        assert_eq!(row, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_flat_output_passes_through() {
        let row = first_batch_row(&[2], &[0.7, 0.8]).unwrap();
        assert_eq!(row, vec![0.7, 0.8]);
    }

    #[test]
    fn test_unexpected_shapes_fail() {
        assert!(first_batch_row(&[1, 2, 3], &[0.0; 6]).is_err());
        assert!(first_batch_row(&[0, 3], &[]).is_err());
        assert!(first_batch_row(&[-1], &[0.0]).is_err());
        assert!(first_batch_row(&[1, 5], &[0.0; 3]).is_err());
    }

    fn cache_with_scores(dir: &std::path::Path, scores: Vec<f32>) -> ModelCache {
        let resolver = AssetResolver::new(dir, Box::new(FakeFetcher::default()));
        ModelCache::new(resolver, Box::new(FakeFactory::new(4, scores)))
    }

    #[tokio::test]
    async fn test_run_returns_aligned_probabilities() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_with_scores(dir.path(), vec![0.1, 0.9, 0.5]);
        let model = cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap();

        let probabilities = run(model, &Array4::zeros((1, 4, 4, 3))).unwrap();
        assert_eq!(probabilities.len(), model.labels().len());
        assert_eq!(probabilities, vec![0.1, 0.9, 0.5]);
    }

    #[tokio::test]
    async fn test_run_rejects_misaligned_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_with_scores(dir.path(), vec![0.1, 0.9]);
        let model = cache.ensure_loaded("wd-vit-tagger-v3", false).await.unwrap();

        let err = run(model, &Array4::zeros((1, 4, 4, 3))).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::LabelMismatch {
                labels: 3,
                probabilities: 2
            }
        ));
    }
}
