//! Pipeline stages of a page-generation job.
//!
//! Each submodule implements exactly one step; [`crate::job`] strings them
//! together and owns the failure/cleanup discipline.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ stage ──▶ rasterize ──▶ import
//! (args)   (temp PDF)  (Ghostscript)  (repository)
//! ```
//!
//! 1. [`input`]     — parse the entry id from the invocation arguments
//! 2. [`stage`]     — write the downloaded PDF to the temp folder under a
//!    guard that deletes it, and the TIFF, on every exit path
//! 3. [`rasterize`] — run Ghostscript with its fixed argument vector and
//!    verify the TIFF it wrote
//! 4. [`import`]    — attach the TIFF's pages to the original entry

pub mod import;
pub mod input;
pub mod rasterize;
pub mod stage;
