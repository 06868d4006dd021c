//! PDF rasterisation: run Ghostscript and verify the TIFF it leaves behind.
//!
//! ## Why a process, not a library binding?
//!
//! Ghostscript's C API keeps a process-global interpreter instance. Running
//! it as a child process gives every conversion a fresh instance that is
//! acquired and released within one call, and `kill_on_drop` guarantees the
//! child does not outlive the future driving it.
//!
//! The argument vector is fixed apart from the device, resolution and the
//! two paths; [`ghostscript_args`] builds it as a pure function so it can be
//! checked without Ghostscript installed. [`Rasterizer`] is the seam tests
//! use to substitute a fake engine.

use crate::config::RasterOptions;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Why a rasterisation attempt produced nothing usable.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The engine could not be started at all.
    #[error("could not start '{}': {source}", .executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and reported failure.
    #[error("Ghostscript exited with {status}: {detail}")]
    Failed { status: String, detail: String },

    /// The engine reported success but wrote no output.
    #[error("no output written to '{}'", .path.display())]
    MissingOutput { path: PathBuf },

    /// The output exists but is not a readable TIFF.
    #[error("output '{}' is not a readable TIFF: {detail}", .path.display())]
    UnreadableOutput { path: PathBuf, detail: String },
}

/// One PDF → TIFF conversion.
#[derive(Debug, Clone, Copy)]
pub struct RasterRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub options: &'a RasterOptions,
}

/// A verified TIFF produced by [`convert_to_tiff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub tiff_path: PathBuf,
    pub page_count: u32,
    pub elapsed_ms: u64,
}

/// A rasterisation engine.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Write a multi-page TIFF of `request.input` to `request.output`.
    async fn rasterize(&self, request: &RasterRequest<'_>) -> Result<(), RasterError>;
}

/// Ghostscript run as a child process.
#[derive(Debug, Clone)]
pub struct Ghostscript {
    executable: PathBuf,
}

impl Ghostscript {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl Rasterizer for Ghostscript {
    async fn rasterize(&self, request: &RasterRequest<'_>) -> Result<(), RasterError> {
        let args = ghostscript_args(request);
        debug!("Ghostscript command: {:?} {:?}", self.executable, args);

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RasterError::Spawn {
                executable: self.executable.clone(),
                source: e,
            })?;

        if !output.status.success() {
            // Ghostscript reports PostScript errors on stdout, the rest on stderr.
            let mut detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                if !detail.is_empty() {
                    detail.push('\n');
                }
                detail.push_str(stdout.trim());
            }
            return Err(RasterError::Failed {
                status: output.status.to_string(),
                detail,
            });
        }
        Ok(())
    }
}

/// The Ghostscript argument vector (without the program name):
///
/// ```text
/// -q -sOutputFile=<out> -dNOPAUSE -dBATCH -P- -dSAFER -sDEVICE=<device> -r<dpi> <in>
/// ```
pub fn ghostscript_args(request: &RasterRequest<'_>) -> Vec<OsString> {
    let mut output_file = OsString::from("-sOutputFile=");
    match request.output.to_str() {
        // `%` starts a page-number template in OutputFile.
        Some(s) => output_file.push(s.replace('%', "%%")),
        None => output_file.push(request.output),
    }

    vec![
        OsString::from("-q"),
        output_file,
        OsString::from("-dNOPAUSE"),
        OsString::from("-dBATCH"),
        OsString::from("-P-"),
        OsString::from("-dSAFER"),
        OsString::from(format!("-sDEVICE={}", request.options.device)),
        OsString::from(format!("-r{}", request.options.resolution)),
        request.input.as_os_str().to_os_string(),
    ]
}

/// Run `rasterizer` and verify its output.
///
/// The output path must not hold a stale file when this is called (see
/// [`crate::pipeline::stage::StagedFiles::prepare`]), otherwise a silent
/// engine failure would pass for success.
pub async fn convert_to_tiff(
    rasterizer: &dyn Rasterizer,
    request: &RasterRequest<'_>,
) -> Result<ConversionResult, RasterError> {
    let start = Instant::now();
    rasterizer.rasterize(request).await?;

    let tiff_path = request.output.to_path_buf();
    if !tiff_path.is_file() {
        return Err(RasterError::MissingOutput { path: tiff_path });
    }

    let path = tiff_path.clone();
    let page_count = tokio::task::spawn_blocking(move || count_tiff_pages(&path))
        .await
        .map_err(|e| RasterError::UnreadableOutput {
            path: tiff_path.clone(),
            detail: format!("page count task panicked: {e}"),
        })??;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        "Rasterised {} → {} pages in {}ms",
        request.input.display(),
        page_count,
        elapsed_ms
    );
    Ok(ConversionResult {
        tiff_path,
        page_count,
        elapsed_ms,
    })
}

/// Count the images (IFDs) in a TIFF file.
pub fn count_tiff_pages(path: &Path) -> Result<u32, RasterError> {
    let unreadable = |detail: String| RasterError::UnreadableOutput {
        path: path.to_path_buf(),
        detail,
    };

    let file = std::fs::File::open(path).map_err(|e| unreadable(e.to_string()))?;
    let mut decoder =
        tiff::decoder::Decoder::new(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))?;

    let mut pages = 1;
    while decoder.more_images() {
        decoder.next_image().map_err(|e| unreadable(e.to_string()))?;
        pages += 1;
    }
    Ok(pages)
}
