//! Repository collaborator: the seam between the job and Laserfiche.
//!
//! The job only ever talks to the two traits in this module. [`http`]
//! provides the production binding over the repository API server; tests
//! substitute in-memory fakes.
//!
//! ## Call sequence
//!
//! ```text
//! Connector::log_in ──▶ document_info / entry_info / read_edoc
//!                   ──▶ unlock_document / unlock_entry
//!                   ──▶ import_images
//!                   ──▶ unlock_document / unlock_entry ──▶ close
//! ```

pub mod http;

use crate::config::RepositoryConfig;
use crate::error::RepositoryError;
use async_trait::async_trait;
use std::path::Path;

pub use http::HttpConnector;

/// Content type of a PDF electronic document.
pub const PDF_MIME: &str = "application/pdf";

/// Document-specific view of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub id: i32,
    pub name: String,
    /// Extension of the electronic document without the dot, e.g. `pdf`.
    pub extension: String,
    /// Number of page images attached to the document.
    pub page_count: u32,
    pub is_locked: bool,
}

/// Generic view of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub full_path: String,
    pub entry_type: String,
}

/// Electronic document content as downloaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Edoc {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Edoc {
    /// Whether the content type names a PDF, ignoring parameters and case.
    pub fn is_pdf(&self) -> bool {
        mime_essence(&self.mime_type).eq_ignore_ascii_case(PDF_MIME)
    }
}

impl std::fmt::Debug for Edoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edoc")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// `application/pdf; charset=binary` → `application/pdf`.
pub fn mime_essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

/// Opens authenticated sessions against a repository.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn log_in(
        &self,
        config: &RepositoryConfig,
    ) -> Result<Box<dyn RepositorySession>, RepositoryError>;
}

/// An authenticated repository session.
///
/// Unlock calls are idempotent: unlocking an entry that holds no lock
/// succeeds.
#[async_trait]
pub trait RepositorySession: Send + Sync {
    async fn document_info(&self, entry_id: i32) -> Result<DocumentInfo, RepositoryError>;

    async fn entry_info(&self, entry_id: i32) -> Result<EntryInfo, RepositoryError>;

    /// Download the electronic document. [`RepositoryError::NotFound`] when
    /// the entry has none.
    async fn read_edoc(&self, entry_id: i32) -> Result<Edoc, RepositoryError>;

    async fn unlock_document(&self, entry_id: i32) -> Result<(), RepositoryError>;

    async fn unlock_entry(&self, entry_id: i32) -> Result<(), RepositoryError>;

    /// Append every page of the multi-page TIFF at `tiff_path` to the
    /// document. Returns the document's page count afterwards.
    async fn import_images(&self, entry_id: i32, tiff_path: &Path)
        -> Result<u32, RepositoryError>;

    /// Log out and release server-side session state.
    async fn close(&self) -> Result<(), RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edoc(mime: &str) -> Edoc {
        Edoc {
            bytes: b"%PDF-1.7".to_vec(),
            mime_type: mime.into(),
        }
    }

    #[test]
    fn pdf_detection_uses_essence() {
        assert!(edoc("application/pdf").is_pdf());
        assert!(edoc("application/pdf; charset=binary").is_pdf());
        assert!(edoc("Application/PDF").is_pdf());
        assert!(!edoc("application/msword").is_pdf());
        assert!(!edoc("application/pdfx").is_pdf());
        assert!(!edoc("").is_pdf());
    }

    #[test]
    fn debug_hides_content() {
        let dbg = format!("{:?}", edoc("application/pdf"));
        assert!(dbg.contains("<8 bytes>"), "got: {dbg}");
    }
}
