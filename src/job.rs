//! Job orchestration: one entry id in, page images out.
//!
//! ```text
//! args ─▶ resolve id ─▶ log in ─▶ metadata ─▶ gate ─▶ stage PDF ─▶ Ghostscript ─▶ import
//!                          │                   │                                     │
//!                          │                   └─ BYPASS (has pages / not a PDF)     │
//!                          └──────────────── cleanup: temp files, unlock, log out ◀──┘
//! ```
//!
//! Every stage is sequential and none is retried. The first failure ends the
//! job, but the cleanup sequence still runs: temp files are removed, the
//! document and entry are unlocked and the session is closed. Cleanup
//! problems are logged and never replace the job's own outcome.

use crate::activity::ActivityLog;
use crate::config::JobConfig;
use crate::error::{PageGenError, RepositoryError};
use crate::output::{JobDisposition, JobOutcome, JobStats};
use crate::pipeline::rasterize::{convert_to_tiff, Ghostscript, RasterRequest, Rasterizer};
use crate::pipeline::stage::StagedFiles;
use crate::pipeline::{import, input};
use crate::progress::{JobStage, NoopProgressCallback, ProgressCallback};
use crate::repository::{Connector, DocumentInfo, HttpConnector, RepositorySession};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Collaborators a job runs against.
pub struct JobContext {
    connector: Box<dyn Connector>,
    rasterizer: Box<dyn Rasterizer>,
    activity: ActivityLog,
    progress: ProgressCallback,
}

impl JobContext {
    pub fn new(
        connector: impl Connector + 'static,
        rasterizer: impl Rasterizer + 'static,
        activity: ActivityLog,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            rasterizer: Box::new(rasterizer),
            activity,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Production collaborators: the HTTP repository binding and the
    /// configured Ghostscript executable.
    pub fn for_config(config: &JobConfig, activity: ActivityLog) -> Self {
        Self::new(
            HttpConnector::new(),
            Ghostscript::new(&config.ghostscript),
            activity,
        )
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }
}

/// Run a job from raw positional arguments (program name stripped).
///
/// A missing or malformed entry id is recorded and returned before any
/// repository or Ghostscript call is made.
pub async fn run_job<S: AsRef<str>>(
    args: &[S],
    config: &JobConfig,
    ctx: &JobContext,
) -> Result<JobOutcome, PageGenError> {
    let entry_id = resolve_entry(args, &ctx.activity).await?;
    run_entry(entry_id, config, ctx).await
}

/// Parse the entry id from `args`, recording a missing or malformed one in
/// `activity`.
pub async fn resolve_entry<S: AsRef<str>>(
    args: &[S],
    activity: &ActivityLog,
) -> Result<i32, PageGenError> {
    let e = match input::resolve_entry_id(args) {
        Ok(id) => return Ok(id),
        Err(e) => e,
    };
    match &e {
        PageGenError::InvalidArgument { input } => {
            activity
                .record(format!(
                    "Laserfiche PDF to TIFF received an invalid entry id '{input}'"
                ))
                .await
        }
        _ => {
            activity
                .record("Laserfiche PDF to TIFF did not receive an entry id")
                .await
        }
    }
    Err(e)
}

/// Run a job for a known entry id.
pub async fn run_entry(
    entry_id: i32,
    config: &JobConfig,
    ctx: &JobContext,
) -> Result<JobOutcome, PageGenError> {
    let total_start = Instant::now();
    let label = format!(
        "Laserfiche Entry#{}({})",
        entry_id, config.repository.repository
    );
    ctx.activity.record("Started looking at conversion....").await;

    ctx.progress.on_stage_start(JobStage::Fetch);
    let session = match ctx.connector.log_in(&config.repository).await {
        Ok(session) => session,
        Err(e) => return Err(repository_failure(ctx, &label, entry_id, e).await),
    };

    let result = process(session.as_ref(), entry_id, &label, config, ctx).await;

    ctx.progress.on_stage_start(JobStage::Cleanup);
    release_session(session.as_ref(), entry_id).await;
    ctx.progress.on_stage_complete(JobStage::Cleanup);

    let mut outcome = result?;
    outcome.stats.total_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Entry {} finished: {:?}, {} pages, {}ms",
        entry_id, outcome.disposition, outcome.page_count, outcome.stats.total_ms
    );
    ctx.progress.on_job_complete(&outcome);
    Ok(outcome)
}

/// Synchronous wrapper around [`run_job`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_job_sync<S: AsRef<str>>(
    args: &[S],
    config: &JobConfig,
    ctx: &JobContext,
) -> Result<JobOutcome, PageGenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PageGenError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run_job(args, config, ctx))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Everything between login and cleanup.
async fn process(
    session: &dyn RepositorySession,
    entry_id: i32,
    label: &str,
    config: &JobConfig,
    ctx: &JobContext,
) -> Result<JobOutcome, PageGenError> {
    let document = match session.document_info(entry_id).await {
        Ok(document) => document,
        Err(e) => return Err(repository_failure(ctx, label, entry_id, e).await),
    };
    let entry = match session.entry_info(entry_id).await {
        Ok(entry) => entry,
        Err(e) => return Err(repository_failure(ctx, label, entry_id, e).await),
    };
    debug!(
        "Entry {} '{}' at {} ({})",
        entry.id, entry.name, entry.full_path, entry.entry_type
    );

    // A previous session may have died holding the lock.
    unlock(session, entry_id).await;

    let outcome = |disposition: JobDisposition, page_count: u32, stats: JobStats| JobOutcome {
        document_id: entry_id,
        repository: config.repository.repository.clone(),
        disposition,
        page_count,
        stats,
    };

    if document.page_count > 0 {
        ctx.activity
            .record(format!(
                "BYPASS : {} already had pages generated / {} pages",
                label, document.page_count
            ))
            .await;
        ctx.progress.on_stage_complete(JobStage::Fetch);
        return Ok(outcome(
            JobDisposition::BypassedHasPages,
            document.page_count,
            JobStats::default(),
        ));
    }

    // ── Download ─────────────────────────────────────────────────────────
    ctx.activity
        .record(format!("Started downloading PDF for {label}"))
        .await;
    let edoc = match session.read_edoc(entry_id).await {
        Ok(edoc) => Some(edoc),
        Err(RepositoryError::NotFound { .. }) => None,
        Err(e) => return Err(repository_failure(ctx, label, entry_id, e).await),
    };
    ctx.progress.on_stage_complete(JobStage::Fetch);

    let edoc = match edoc {
        Some(edoc) if edoc.is_pdf() => edoc,
        other => {
            let mime = other
                .as_ref()
                .map(|e| e.mime_type.as_str())
                .unwrap_or("no electronic document");
            ctx.activity
                .record(format!(
                    "BYPASS : {} is not a PDF ({}) / {} pages",
                    label, mime, document.page_count
                ))
                .await;
            return Ok(outcome(
                JobDisposition::BypassedNotPdf,
                document.page_count,
                JobStats::default(),
            ));
        }
    };

    // ── Stage ────────────────────────────────────────────────────────────
    let mut stats = JobStats {
        source_bytes: edoc.bytes.len() as u64,
        ..JobStats::default()
    };
    let staged = match stage(&document, &edoc.bytes, config).await {
        Ok(staged) => staged,
        Err(e) => {
            ctx.activity
                .record(format!("FAIL : saving PDF to the temp folder for {label}"))
                .await;
            ctx.activity.record(e.to_string()).await;
            return Err(e);
        }
    };
    drop(edoc);
    ctx.activity
        .record(format!("SUCCESS : downloaded PDF for {label}"))
        .await;

    // ── Rasterise ────────────────────────────────────────────────────────
    ctx.progress.on_stage_start(JobStage::Rasterize);
    ctx.activity
        .record(format!("Started ghostscript conversion for {label}"))
        .await;
    let request = RasterRequest {
        input: staged.source(),
        output: staged.output(),
        options: &config.raster,
    };
    let converted = match convert_to_tiff(ctx.rasterizer.as_ref(), &request).await {
        Ok(converted) => converted,
        Err(e) => {
            ctx.activity
                .record(format!("FAIL : Ghostscript conversion for {label}"))
                .await;
            ctx.activity.record(format!("{e:?}")).await;
            warn!("Ghostscript failed for entry {}: {}", entry_id, e);
            return Err(PageGenError::ConversionFailure {
                document_id: entry_id,
                detail: e.to_string(),
            });
        }
    };
    stats.tiff_pages = converted.page_count;
    stats.rasterize_ms = converted.elapsed_ms;
    ctx.activity
        .record(format!(
            "SUCCESS : converted PDF to TIFF ({} pages) for {label}",
            converted.page_count
        ))
        .await;
    ctx.progress.on_stage_complete(JobStage::Rasterize);

    // ── Import ───────────────────────────────────────────────────────────
    ctx.progress.on_stage_start(JobStage::Import);
    let import_start = Instant::now();
    let page_count = match import::import_pages(session, entry_id, &converted).await {
        Ok(count) => count,
        Err(e) => {
            ctx.activity
                .record(format!("FAIL : importing pages to {label}"))
                .await;
            ctx.activity.record(format!("{e:?}")).await;
            warn!("Import failed for entry {}: {}", entry_id, e);
            return Err(PageGenError::ImportFailure {
                document_id: entry_id,
                source: e,
            });
        }
    };
    stats.import_ms = import_start.elapsed().as_millis() as u64;
    ctx.activity
        .record(format!("SUCCESS : imported pages to {label}"))
        .await;
    ctx.progress.on_stage_complete(JobStage::Import);

    for (path, e) in staged.release() {
        warn!("Could not delete temp file {}: {}", path.display(), e);
    }

    ctx.activity
        .record(format!(
            "SUCCESS : {label} uploaded with a total of {page_count} pages"
        ))
        .await;
    Ok(outcome(JobDisposition::Converted, page_count, stats))
}

async fn stage(
    document: &DocumentInfo,
    bytes: &[u8],
    config: &JobConfig,
) -> Result<StagedFiles, PageGenError> {
    let staged = StagedFiles::prepare(&config.temp_dir, document).await?;
    staged.write_source(bytes).await?;
    Ok(staged)
}

async fn repository_failure(
    ctx: &JobContext,
    label: &str,
    entry_id: i32,
    source: RepositoryError,
) -> PageGenError {
    ctx.activity
        .record(format!("FAIL : repository access for {label}"))
        .await;
    ctx.activity.record(format!("{source:?}")).await;
    PageGenError::Repository {
        document_id: entry_id,
        source,
    }
}

/// Unlock the document and its entry, logging but not propagating errors.
async fn unlock(session: &dyn RepositorySession, entry_id: i32) {
    if let Err(e) = session.unlock_document(entry_id).await {
        warn!("Unlocking document {} failed: {}", entry_id, e);
    }
    if let Err(e) = session.unlock_entry(entry_id).await {
        warn!("Unlocking entry {} failed: {}", entry_id, e);
    }
}

async fn release_session(session: &dyn RepositorySession, entry_id: i32) {
    unlock(session, entry_id).await;
    if let Err(e) = session.close().await {
        warn!("Closing repository session failed: {}", e);
    }
}
