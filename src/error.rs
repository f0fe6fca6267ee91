//! Error types for the pdf2pagejson library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ParseError`] — **Fatal**: the conversion cannot proceed at all
//!   (missing input file, no element source, unwritable output). Returned as
//!   `Err(ParseError)` from the top-level `parse*` functions.
//!
//! * [`TableError`] — **Non-fatal**: a single table element could not be
//!   extracted (bad cell record, detection service down, render glitch) but
//!   the rest of the document is fine. Recorded in
//!   [`crate::output::ParseOutput::failures`]; the table's text is simply
//!   missing from its page.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2pagejson library.
///
/// Per-table failures use [`TableError`] and are never propagated here.
#[derive(Debug, Error)]
pub enum ParseError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Element source errors ─────────────────────────────────────────────
    /// A pre-computed element file could not be read or decoded.
    #[error("Cannot read document elements from '{path}': {detail}")]
    ElementsUnreadable { path: PathBuf, detail: String },

    /// The remote layout partitioner failed.
    #[error("Document partitioning failed: {detail}")]
    PartitionFailed { detail: String },

    /// A collaborator required by this document has no endpoint configured.
    #[error("{service} is not configured.\n{hint}")]
    ServiceNotConfigured { service: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single table element.
///
/// The assembler logs it, records it alongside the output and moves on to
/// the next element.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum TableError {
    /// A cell record from the detection service lacks a required field or
    /// carries an unusable value.
    #[error("Malformed cell #{index}: field '{field}' {reason}")]
    MalformedCell {
        index: usize,
        field: String,
        reason: String,
    },

    /// The detection service returned a table with zero cells.
    #[error("Detected table has no cells")]
    EmptyTable,

    /// The page renderer or the table-detection service failed.
    #[error("{service} failed after {attempts} attempt(s): {detail}")]
    ExternalService {
        service: String,
        attempts: u32,
        detail: String,
    },

    /// The page region could not be rendered to an image.
    #[error("Page {page}: rendering failed: {detail}")]
    RenderFailed { page: u32, detail: String },
}

impl TableError {
    pub(crate) fn malformed(index: usize, field: &str, reason: impl Into<String>) -> Self {
        TableError::MalformedCell {
            index,
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
