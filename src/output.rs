//! Result types returned by [`crate::job::run_job`].
//!
//! The final page count travels here, not through the process exit status.
//! The CLI prints it on stdout (or the whole [`JobOutcome`] as JSON).

use serde::Serialize;

/// What the job did with the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobDisposition {
    /// PDF rasterised and its pages imported.
    Converted,
    /// The entry already had page images; nothing to do.
    BypassedHasPages,
    /// The entry has no pages but its electronic document is not a PDF
    /// (or there is none).
    BypassedNotPdf,
}

impl JobDisposition {
    pub fn is_bypass(self) -> bool {
        !matches!(self, JobDisposition::Converted)
    }
}

/// Timing and size figures for one job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    /// Size of the downloaded electronic document, 0 on bypass.
    pub source_bytes: u64,
    /// Pages found in the rasterised TIFF, 0 on bypass.
    pub tiff_pages: u32,
    pub rasterize_ms: u64,
    pub import_ms: u64,
    pub total_ms: u64,
}

/// Outcome of a job that did not fail.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub document_id: i32,
    pub repository: String,
    pub disposition: JobDisposition,
    /// Page count of the entry after the job.
    pub page_count: u32,
    pub stats: JobStats,
}
