//! Error types for the lf-pagegen library.
//!
//! Two error types mirror the two sides of every job:
//!
//! * [`RepositoryError`] — what the repository collaborator reports
//!   (authentication, missing entries, HTTP failures). It never leaves the
//!   library on its own; the job wraps it with the entry it was working on.
//!
//! * [`PageGenError`] — **Fatal** for the invocation: the job stops, runs its
//!   cleanup sequence and hands this back to the caller. Each variant maps to
//!   a distinct process exit status via [`PageGenError::exit_code`].
//!
//! Failures writing the activity log are not represented here at all: the
//! log swallows them (see [`crate::activity`]).

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a [`crate::repository::RepositorySession`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Login rejected or bearer token no longer accepted (401/403).
    #[error("Authentication failed: {detail}")]
    Auth { detail: String },

    /// The entry (or its electronic document) does not exist.
    #[error("Entry {entry_id} not found")]
    NotFound { entry_id: i32 },

    /// The server answered with an unexpected status.
    #[error("Repository returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never got an answer (DNS, connect, timeout, TLS).
    #[error("Repository unreachable: {0}")]
    Transport(String),

    /// The server answered 2xx but the body could not be understood.
    #[error("Malformed repository response: {0}")]
    MalformedResponse(String),

    /// Reading a local file destined for the repository failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All fatal errors returned by [`crate::job::run_job`].
#[derive(Debug, Error)]
pub enum PageGenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No entry identifier was supplied on the command line.
    #[error("No entry id supplied.\nUsage: pagegen <ENTRY_ID>")]
    MissingArgument,

    /// The supplied identifier is not a positive 32-bit integer.
    #[error("Invalid entry id '{input}': expected a positive integer")]
    InvalidArgument { input: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Collaborator errors ───────────────────────────────────────────────
    /// Login or metadata/content fetch failed.
    #[error("Repository access failed for entry {document_id}: {source}")]
    Repository {
        document_id: i32,
        #[source]
        source: RepositoryError,
    },

    /// Ghostscript failed or produced no usable TIFF.
    #[error("Ghostscript conversion failed for entry {document_id}: {detail}")]
    ConversionFailure { document_id: i32, detail: String },

    /// The repository rejected the rasterised pages.
    #[error("Importing pages into entry {document_id} failed: {source}")]
    ImportFailure {
        document_id: i32,
        #[source]
        source: RepositoryError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The downloaded document could not be written to the temp folder.
    #[error("Failed to stage '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Exit status for a converted or bypassed entry.
pub const EXIT_OK: u8 = 0;
/// Exit status for anything not covered by a more specific code.
pub const EXIT_INTERNAL: u8 = 1;
/// Exit status for a missing or malformed entry id.
pub const EXIT_USAGE: u8 = 2;
/// Exit status when Ghostscript fails.
pub const EXIT_CONVERSION: u8 = 3;
/// Exit status when the page import fails.
pub const EXIT_IMPORT: u8 = 4;
/// Exit status when login or fetching from the repository fails.
pub const EXIT_REPOSITORY: u8 = 5;
/// Exit status for invalid configuration.
pub const EXIT_CONFIG: u8 = 6;

impl PageGenError {
    /// Process exit status classifying this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PageGenError::MissingArgument | PageGenError::InvalidArgument { .. } => EXIT_USAGE,
            PageGenError::InvalidConfig(_) => EXIT_CONFIG,
            PageGenError::Repository { .. } => EXIT_REPOSITORY,
            PageGenError::ConversionFailure { .. } | PageGenError::Staging { .. } => {
                EXIT_CONVERSION
            }
            PageGenError::ImportFailure { .. } => EXIT_IMPORT,
            PageGenError::Internal(_) => EXIT_INTERNAL,
        }
    }

    /// Exit status for `--legacy-exit-codes` callers: `-1` (255) when the
    /// entry id is missing or unusable, `0` for every other failure.
    pub fn legacy_exit_code(&self) -> u8 {
        match self {
            PageGenError::MissingArgument | PageGenError::InvalidArgument { .. } => 255,
            _ => 0,
        }
    }
}
