//! Progress-callback trait for workflow events.
//!
//! Inject an [`Arc<dyn WorkflowProgressCallback>`] via
//! [`crate::config::CategorizerConfigBuilder::progress_callback`] to observe
//! each step of a categorisation workflow: documents extracted, generation
//! calls finished, artifacts written.
//!
//! # Example
//!
//! ```rust
//! use edgequake_examcat::{CategorizerConfig, WorkflowProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     calls: AtomicUsize,
//! }
//!
//! impl WorkflowProgressCallback for CountingCallback {
//!     fn on_generation_complete(&self, step: &str, text_len: usize) {
//!         let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("call {n} ({step}) produced {text_len} bytes");
//!     }
//! }
//!
//! let config = CategorizerConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { calls: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ExtractionMethod;
use std::path::Path;
use std::sync::Arc;

/// Called by [`crate::categorize::CategorizationPipeline`] as a workflow runs.
///
/// Implementations must be `Send + Sync`: question papers are extracted
/// concurrently, so `on_document_extracted` may be called from several
/// tasks. All methods default to no-ops.
pub trait WorkflowProgressCallback: Send + Sync {
    /// Called once when a workflow starts.
    ///
    /// # Arguments
    /// * `workflow`: "full", "single" or "feeding"
    /// * `total_steps`: number of steps the workflow will report
    fn on_workflow_start(&self, workflow: &str, total_steps: usize) {
        let _ = (workflow, total_steps);
    }

    /// Called before each step (extraction batch, generation call, save).
    fn on_step_start(&self, step: &str) {
        let _ = step;
    }

    /// Called after one document has been turned into text.
    ///
    /// # Arguments
    /// * `name`: display name of the document
    /// * `text_len`: byte length of the extracted text (0 on failure)
    /// * `method`: how the text was obtained
    fn on_document_extracted(&self, name: &str, text_len: usize, method: &ExtractionMethod) {
        let _ = (name, text_len, method);
    }

    /// Called after a generation call returns.
    fn on_generation_complete(&self, step: &str, text_len: usize) {
        let _ = (step, text_len);
    }

    /// Called after a file (refined prompt or output) has been written.
    fn on_artifact_saved(&self, path: &Path) {
        let _ = path;
    }

    /// Called once after the final output has been written.
    fn on_workflow_complete(&self, output_path: &Path) {
        let _ = output_path;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl WorkflowProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CategorizerConfig`].
pub type ProgressCallback = Arc<dyn WorkflowProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        steps: Mutex<Vec<String>>,
        documents: AtomicUsize,
        generations: AtomicUsize,
    }

    impl WorkflowProgressCallback for TrackingCallback {
        fn on_step_start(&self, step: &str) {
            self.steps.lock().unwrap().push(step.to_string());
        }

        fn on_document_extracted(&self, _name: &str, _len: usize, _method: &ExtractionMethod) {
            self.documents.fetch_add(1, Ordering::SeqCst);
        }

        fn on_generation_complete(&self, _step: &str, _len: usize) {
            self.generations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_workflow_start("full", 7);
        cb.on_step_start("extract syllabus");
        cb.on_document_extracted("syllabus.pdf", 10, &ExtractionMethod::TextLayer);
        cb.on_generation_complete("general", 42);
        cb.on_artifact_saved(Path::new("/tmp/x.md"));
        cb.on_workflow_complete(Path::new("/tmp/x.md"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_step_start("extract papers");
        tracker.on_document_extracted("a.pdf", 1, &ExtractionMethod::Ocr { pages: 2 });
        tracker.on_document_extracted("b.pdf", 0, &ExtractionMethod::Failed);
        tracker.on_step_start("generate general");
        tracker.on_generation_complete("general", 10);

        assert_eq!(
            *tracker.steps.lock().unwrap(),
            vec!["extract papers".to_string(), "generate general".to_string()]
        );
        assert_eq!(tracker.documents.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.generations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_step_start("anything");
    }
}
