//! Page import: attach the rasterised TIFF to the original entry.
//!
//! This is the only durable side effect of a job. The repository appends
//! every image of the TIFF to the document's page sequence and reports the
//! resulting page count.

use super::rasterize::ConversionResult;
use crate::error::RepositoryError;
use crate::repository::RepositorySession;
use tracing::{info, warn};

/// Import `converted` into entry `entry_id`. Returns the page count the
/// repository reports afterwards.
pub async fn import_pages(
    session: &dyn RepositorySession,
    entry_id: i32,
    converted: &ConversionResult,
) -> Result<u32, RepositoryError> {
    let page_count = session
        .import_images(entry_id, &converted.tiff_path)
        .await?;

    if page_count != converted.page_count {
        warn!(
            "Entry {} reports {} pages after importing a {}-page TIFF",
            entry_id, page_count, converted.page_count
        );
    }
    info!("Imported {} pages into entry {}", converted.page_count, entry_id);
    Ok(page_count)
}
