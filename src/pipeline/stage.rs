//! Temp-file staging for one conversion.
//!
//! [`StagedFiles`] owns the two temp artifacts of a job: the downloaded
//! source (`<entry id>.<extension>`) and the TIFF Ghostscript writes next
//! to it. Both are removed when the guard is released or dropped, whichever
//! happens first, so no exit path leaves them behind.

use crate::error::PageGenError;
use crate::repository::DocumentInfo;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension of the rasterised output.
pub const TIFF_EXTENSION: &str = "tiff";

/// Scoped owner of the source and output temp files.
#[derive(Debug)]
pub struct StagedFiles {
    source: PathBuf,
    output: PathBuf,
    released: bool,
}

impl StagedFiles {
    /// Compute both paths under `temp_dir`, creating the folder if needed
    /// and deleting a stale output left by an earlier run.
    pub async fn prepare(temp_dir: &Path, document: &DocumentInfo) -> Result<Self, PageGenError> {
        tokio::fs::create_dir_all(temp_dir)
            .await
            .map_err(|e| PageGenError::Staging {
                path: temp_dir.to_path_buf(),
                source: e,
            })?;

        let (source, output) = staged_paths(temp_dir, document);
        let staged = Self {
            source,
            output,
            released: false,
        };

        match tokio::fs::remove_file(&staged.output).await {
            Ok(()) => debug!("Removed stale output {}", staged.output.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PageGenError::Staging {
                    path: staged.output.clone(),
                    source: e,
                })
            }
        }
        Ok(staged)
    }

    /// Write the downloaded document to the source path.
    pub async fn write_source(&self, bytes: &[u8]) -> Result<(), PageGenError> {
        tokio::fs::write(&self.source, bytes)
            .await
            .map_err(|e| PageGenError::Staging {
                path: self.source.clone(),
                source: e,
            })?;
        debug!("Staged {} bytes at {}", bytes.len(), self.source.display());
        Ok(())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Delete both files now. Returns the deletions that failed; files
    /// already gone do not count as failures.
    pub fn release(mut self) -> Vec<(PathBuf, io::Error)> {
        self.remove_all()
    }

    fn remove_all(&mut self) -> Vec<(PathBuf, io::Error)> {
        if self.released {
            return Vec::new();
        }
        self.released = true;
        [&self.source, &self.output]
            .into_iter()
            .filter_map(|path| match std::fs::remove_file(path) {
                Ok(()) => None,
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => Some((path.clone(), e)),
            })
            .collect()
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        for (path, e) in self.remove_all() {
            warn!("Could not delete temp file {}: {}", path.display(), e);
        }
    }
}

/// `<dir>/<id>.<ext>` and `<dir>/<id>.tiff`.
///
/// Extensions that are not plain alphanumerics fall back to `pdf`; a source
/// that is itself a `.tiff` gets a distinct output name.
fn staged_paths(temp_dir: &Path, document: &DocumentInfo) -> (PathBuf, PathBuf) {
    let ext = document.extension.trim().trim_start_matches('.');
    let ext = if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        ext
    } else {
        "pdf"
    };

    let source = temp_dir.join(format!("{}.{}", document.id, ext));
    let mut output = source.with_extension(TIFF_EXTENSION);
    if output == source {
        output = temp_dir.join(format!("{}-pages.{}", document.id, TIFF_EXTENSION));
    }
    (source, output)
}
