//! # lf-pagegen
//!
//! Generate Laserfiche page images for PDF electronic documents.
//!
//! A Laserfiche document can carry an electronic document (the PDF as
//! uploaded) and, separately, a sequence of page images. Search, annotation
//! and the web client's viewer work on the page images, so a PDF imported
//! without them is only half-usable. This crate fills the gap for one entry
//! at a time: it downloads the PDF, rasterises it to a multi-page TIFF with
//! Ghostscript, and imports the TIFF back as the entry's pages.
//!
//! ## Pipeline Overview
//!
//! ```text
//! entry id
//!  │
//!  ├─ 1. Input    parse the id from the invocation arguments
//!  ├─ 2. Fetch    log in, read metadata, gate (0 pages + application/pdf)
//!  ├─ 3. Stage    write the PDF to the temp folder (guarded)
//!  ├─ 4. Raster   Ghostscript → multi-page TIFF, page count verified
//!  ├─ 5. Import   TIFF pages appended to the original entry
//!  └─ 6. Cleanup  temp files removed, entry unlocked, session closed
//! ```
//!
//! Entries that already have pages, or whose electronic document is not a
//! PDF, are bypassed untouched. Every lifecycle event is appended to a dated
//! activity log (see [`activity`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lf_pagegen::{run_entry, ActivityLog, JobConfig, JobContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = JobConfig::builder()
//!         .server("http://lfserver/LFRepositoryAPI")
//!         .repository("CITY")
//!         .username("svc_pagegen")
//!         .password("secret")
//!         .build()?;
//!     let ctx = JobContext::for_config(&config, ActivityLog::beside_executable());
//!     let outcome = run_entry(12345, &config, &ctx).await?;
//!     println!("{} pages", outcome.page_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagegen` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod activity;
pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod repository;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use activity::ActivityLog;
pub use config::{JobConfig, JobConfigBuilder, RasterOptions, RepositoryConfig};
pub use error::{PageGenError, RepositoryError};
pub use job::{run_entry, run_job, run_job_sync, JobContext};
pub use output::{JobDisposition, JobOutcome, JobStats};
pub use pipeline::rasterize::{Ghostscript, RasterError, RasterRequest, Rasterizer};
pub use progress::{JobProgressCallback, JobStage, NoopProgressCallback, ProgressCallback};
pub use repository::{Connector, DocumentInfo, Edoc, EntryInfo, HttpConnector, RepositorySession};
