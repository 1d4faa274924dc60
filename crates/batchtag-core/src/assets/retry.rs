//! Retry utilities for transient download failures.
//!
//! Provides classification of retryable errors and exponential backoff.

use crate::error::PipelineError;
use std::time::Duration;

/// Determine whether a pipeline error is worth retrying.
///
/// Retryable errors: timeouts, connection failures, rate limits (429),
/// server errors (5xx). Non-retryable: 404s, auth failures, local I/O.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::DownloadFailed {
            status_code: Some(code),
            ..
        } => *code == 429 || (500..=599).contains(code),
        PipelineError::DownloadFailed { transient, .. } => *transient,
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}
