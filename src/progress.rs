//! Progress-callback trait for job stage events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::job::JobContext::with_progress`] to hear about each stage as the
//! job moves through it. The CLI uses this to drive a spinner; the library
//! itself never writes to the terminal.
//!
//! # Example
//!
//! ```rust
//! use lf_pagegen::{JobProgressCallback, JobStage};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageRecorder {
//!     seen: Mutex<Vec<JobStage>>,
//! }
//!
//! impl JobProgressCallback for StageRecorder {
//!     fn on_stage_start(&self, stage: JobStage) {
//!         self.seen.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let recorder = Arc::new(StageRecorder { seen: Mutex::new(Vec::new()) });
//! recorder.on_stage_start(JobStage::Fetch);
//! assert_eq!(recorder.seen.lock().unwrap().as_slice(), &[JobStage::Fetch]);
//! ```

use crate::output::JobOutcome;
use std::fmt;
use std::sync::Arc;

/// Sequential stages of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Login, metadata and electronic-document download.
    Fetch,
    /// Ghostscript run.
    Rasterize,
    /// Page import into the repository.
    Import,
    /// Temp-file removal, unlock and logout.
    Cleanup,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStage::Fetch => "fetching entry",
            JobStage::Rasterize => "rasterising PDF",
            JobStage::Import => "importing pages",
            JobStage::Cleanup => "cleaning up",
        };
        f.write_str(s)
    }
}

/// Called by the job as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait JobProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: JobStage) {
        let _ = stage;
    }

    /// Called when a stage ends without error.
    fn on_stage_complete(&self, stage: JobStage) {
        let _ = stage;
    }

    /// Called once when the job finished without a fatal error.
    fn on_job_complete(&self, outcome: &JobOutcome) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn JobProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{JobDisposition, JobStats};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        finished: AtomicUsize,
    }

    impl JobProgressCallback for CountingCallback {
        fn on_stage_start(&self, _stage: JobStage) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _stage: JobStage) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_complete(&self, _outcome: &JobOutcome) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(JobStage::Fetch);
        cb.on_stage_complete(JobStage::Fetch);
    }

    #[test]
    fn counting_callback_through_arc_dyn() {
        let counter = Arc::new(CountingCallback::default());
        let cb: ProgressCallback = counter.clone();

        cb.on_stage_start(JobStage::Rasterize);
        cb.on_stage_complete(JobStage::Rasterize);
        cb.on_stage_start(JobStage::Import);
        cb.on_job_complete(&JobOutcome {
            document_id: 1,
            repository: "REPO".into(),
            disposition: JobDisposition::Converted,
            page_count: 2,
            stats: JobStats::default(),
        });

        assert_eq!(counter.starts.load(Ordering::SeqCst), 2);
        assert_eq!(counter.completes.load(Ordering::SeqCst), 1);
        assert_eq!(counter.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stage_display() {
        assert_eq!(JobStage::Rasterize.to_string(), "rasterising PDF");
    }
}
