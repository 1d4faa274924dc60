//! Progress callback contract between the orchestrator and its host.

/// Receives `(fraction_done, message)` after each image.
///
/// `fraction_done` is in `[0, 1]`. Rendering is up to the host.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, fraction_done: f32, message: &str);

    /// Stages of a first-use model download, `fraction_done` covering the
    /// download only. Goes to [`report`](Self::report) unless overridden.
    fn report_download(&self, fraction_done: f32, message: &str) {
        self.report(fraction_done, message)
    }
}

impl<F> ProgressReporter for F
where
    F: Fn(f32, &str) + Send + Sync,
{
    fn report(&self, fraction_done: f32, message: &str) {
        self(fraction_done, message)
    }
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _fraction_done: f32, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Counting {
        images: Mutex<usize>,
        downloads: Mutex<Vec<f32>>,
    }

    impl ProgressReporter for Counting {
        fn report(&self, _fraction_done: f32, _message: &str) {
            *self.images.lock().unwrap() += 1;
        }

        fn report_download(&self, fraction_done: f32, _message: &str) {
            self.downloads.lock().unwrap().push(fraction_done);
        }
    }

    #[test]
    fn test_download_stages_default_to_report() {
        let seen = Mutex::new(Vec::new());
        let reporter = |fraction: f32, message: &str| {
            seen.lock().unwrap().push((fraction, message.to_string()));
        };

        reporter.report_download(0.1, "fetching");
        assert_eq!(*seen.lock().unwrap(), vec![(0.1, "fetching".to_string())]);
    }

    #[test]
    fn test_download_stages_can_be_routed_separately() {
        let reporter = Counting {
            images: Mutex::new(0),
            downloads: Mutex::new(Vec::new()),
        };

        reporter.report_download(0.5, "model file");
        reporter.report(1.0, "a.png: 3 tags");

        assert_eq!(*reporter.images.lock().unwrap(), 1);
        assert_eq!(*reporter.downloads.lock().unwrap(), vec![0.5]);
    }

    #[test]
    fn test_closure_is_a_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = |fraction: f32, message: &str| {
            seen.lock().unwrap().push((fraction, message.to_string()));
        };

        reporter.report(0.5, "half");
        NoProgress.report(1.0, "ignored");

        assert_eq!(*seen.lock().unwrap(), vec![(0.5, "half".to_string())]);
    }
}
