//! CLI binary for lf-pagegen.
//!
//! A thin shim over the library crate that maps flags and `PAGEGEN_*`
//! environment variables to `JobConfig`, runs one job and reports the
//! result: page count on stdout, classification in the exit status.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lf_pagegen::config::{default_ghostscript, DEFAULT_DEVICE, DEFAULT_RESOLUTION};
use lf_pagegen::error::{EXIT_INTERNAL, EXIT_OK};
use lf_pagegen::job::resolve_entry;
use lf_pagegen::{
    run_entry, ActivityLog, JobConfig, JobContext, JobOutcome, JobProgressCallback, JobStage,
    PageGenError, ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner on stderr naming the current stage, with a tick line per
/// finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("pagegen");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: JobStage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: JobStage) {
        self.bar.println(format!("  {} {}", green("✓"), stage));
    }

    fn on_job_complete(&self, _outcome: &JobOutcome) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate pages for entry 12345
  pagegen 12345

  # Same, configuration from the environment, JSON result
  PAGEGEN_SERVER=http://lfserver/LFRepositoryAPI PAGEGEN_REPOSITORY=CITY \
  PAGEGEN_USERNAME=svc PAGEGEN_PASSWORD=... pagegen --json 12345

  # Black-and-white CCITT G4 at 200 DPI
  pagegen --device tiffg4 --resolution 200 12345

  # Workflow callers that read the page count from the exit status
  pagegen --legacy-exit-codes 12345; echo $?

OUTPUT:
  stdout        final page count of the entry (or the outcome as JSON with --json)
  activity log  <log-dir>/Log_<M>_<YYYY>/Log_<M>_<D>_<YYYY>.txt

EXIT STATUS:
  0  converted, or bypassed (already had pages / not a PDF)
  1  internal error
  2  missing or invalid entry id
  3  Ghostscript conversion failed
  4  page import failed
  5  repository login or fetch failed
  6  invalid configuration

  With --legacy-exit-codes: page count on success (at most 254), 255 for
  a missing or invalid entry id, 0 on any other failure.
"#;

/// Generate Laserfiche page images for a PDF electronic document.
#[derive(Parser, Debug)]
#[command(
    name = "pagegen",
    version,
    about = "Generate Laserfiche page images for a PDF electronic document",
    long_about = "Download the PDF electronic document of a Laserfiche entry that has no \
pages, rasterise it to a multi-page TIFF with Ghostscript, and import the TIFF back as the \
entry's page images. Entries that already have pages, or are not PDFs, are left untouched.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Repository entry id.
    #[arg(allow_negative_numbers = true)]
    entry_id: Vec<String>,

    /// Repository API server base URL (a bare host name means http://).
    #[arg(long, env = "PAGEGEN_SERVER")]
    server: Option<String>,

    /// Repository name.
    #[arg(long, env = "PAGEGEN_REPOSITORY")]
    repository: Option<String>,

    /// Repository user.
    #[arg(long, env = "PAGEGEN_USERNAME")]
    username: Option<String>,

    /// Repository password.
    #[arg(long, env = "PAGEGEN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Folder for the downloaded PDF and the produced TIFF.
    #[arg(long, env = "PAGEGEN_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// TIFF resolution in DPI (50–1200).
    #[arg(long, env = "PAGEGEN_RESOLUTION", default_value_t = DEFAULT_RESOLUTION)]
    resolution: u32,

    /// Ghostscript TIFF device (tiff24nc, tiffgray, tiffg4, …).
    #[arg(long, env = "PAGEGEN_DEVICE", default_value = DEFAULT_DEVICE)]
    device: String,

    /// Ghostscript executable.
    #[arg(long, env = "PAGEGEN_GHOSTSCRIPT", default_value = default_ghostscript())]
    ghostscript: PathBuf,

    /// Per-request repository timeout in seconds.
    #[arg(long, env = "PAGEGEN_HTTP_TIMEOUT", default_value_t = 120)]
    http_timeout: u64,

    /// Root folder of the activity log. Default: next to the executable.
    #[arg(long, env = "PAGEGEN_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Print the outcome as JSON instead of the bare page count.
    #[arg(long, env = "PAGEGEN_JSON")]
    json: bool,

    /// Exit with the page count (at most 254) on success and 0 on failure.
    #[arg(long, env = "PAGEGEN_LEGACY_EXIT_CODES")]
    legacy_exit_codes: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PAGEGEN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGEGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGEGEN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {e:#}", red("error:"));
            ExitCode::from(if cli.legacy_exit_codes { 0 } else { EXIT_INTERNAL })
        }
    }
}

/// Highest page count reported through the legacy exit status. 255 is
/// reserved for a missing or invalid entry id.
const LEGACY_MAX_PAGE_STATUS: u32 = 254;

async fn run(cli: &Cli) -> Result<u8> {
    let activity = cli
        .log_dir
        .clone()
        .map(ActivityLog::new)
        .unwrap_or_else(ActivityLog::beside_executable);

    let result = execute(cli, activity).await;
    match &result {
        Ok(outcome) => report_outcome(cli, outcome)?,
        Err(e) => eprintln!("{} {}", red("✘"), e),
    }
    Ok(exit_status(&result, cli.legacy_exit_codes))
}

/// Resolve the entry id and configuration, then run the job.
async fn execute(cli: &Cli, activity: ActivityLog) -> Result<JobOutcome, PageGenError> {
    // Argument problems are reported before configuration problems.
    let entry_id = resolve_entry(&cli.entry_id, &activity).await?;
    let config = prepare_config(cli, &activity).await?;

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let spinner = show_progress.then(CliProgressCallback::new);
    let mut ctx = JobContext::for_config(&config, activity);
    if let Some(ref cb) = spinner {
        ctx = ctx.with_progress(cb.clone() as ProgressCallback);
    }

    let result = run_entry(entry_id, &config, &ctx).await;
    if let Some(cb) = spinner {
        cb.bar.finish_and_clear();
    }
    result
}

/// [`build_config`], recording a rejected configuration in the activity log.
async fn prepare_config(cli: &Cli, activity: &ActivityLog) -> Result<JobConfig, PageGenError> {
    match build_config(cli) {
        Ok(config) => Ok(config),
        Err(e) => {
            activity.record(format!("FAIL : {e}")).await;
            Err(e)
        }
    }
}

fn report_outcome(cli: &Cli, outcome: &JobOutcome) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if cli.json {
        let json =
            serde_json::to_string_pretty(outcome).context("Failed to serialise outcome")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    } else {
        writeln!(handle, "{}", outcome.page_count).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} entry {}: {}  {}",
            green("✔"),
            outcome.document_id,
            describe(outcome),
            dim(&format!("{}ms", outcome.stats.total_ms)),
        );
    }
    Ok(())
}

/// Process exit status for a finished job.
fn exit_status(result: &Result<JobOutcome, PageGenError>, legacy: bool) -> u8 {
    match (result, legacy) {
        (Ok(outcome), true) => outcome.page_count.min(LEGACY_MAX_PAGE_STATUS) as u8,
        (Ok(_), false) => EXIT_OK,
        (Err(e), true) => e.legacy_exit_code(),
        (Err(e), false) => e.exit_code(),
    }
}

fn describe(outcome: &JobOutcome) -> String {
    use lf_pagegen::JobDisposition::*;
    match outcome.disposition {
        Converted => format!(
            "{} pages generated ({} KiB PDF)",
            outcome.page_count,
            outcome.stats.source_bytes / 1024
        ),
        BypassedHasPages => format!("already had {} pages", outcome.page_count),
        BypassedNotPdf => "not a PDF, left untouched".to_string(),
    }
}

/// Map CLI args to `JobConfig`.
fn build_config(cli: &Cli) -> Result<JobConfig, PageGenError> {
    let mut builder = JobConfig::builder()
        .server(cli.server.clone().unwrap_or_default())
        .repository(cli.repository.clone().unwrap_or_default())
        .username(cli.username.clone().unwrap_or_default())
        .password(cli.password.clone().unwrap_or_default())
        .resolution(cli.resolution)
        .device(cli.device.clone())
        .ghostscript(cli.ghostscript.clone())
        .timeout_secs(cli.http_timeout);

    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }

    builder.build()
}
