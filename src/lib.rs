//! # pdf2pagejson
//!
//! Convert PDF documents into page-keyed JSON text, dropping running
//! headers/footers and rebuilding tables from OCR cell detections.
//!
//! ## Why this crate?
//!
//! Layout partitioners classify a PDF into titles, paragraphs, list items,
//! tables and page breaks, but their table text is a flat word soup, and
//! every page repeats the same header and footer. This crate walks the
//! element stream, keeps prose that is not boilerplate, and sends each table
//! region to an OCR table service whose cell detections (with row/column
//! spans) are reconstructed into a Markdown or HTML table.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the local file
//!  ├─ 2. Partition  element stream (JSON export or remote partitioner)
//!  ├─ 3. Filter     document-wide repetition counter
//!  ├─ 4. Assemble   page tracking, text accumulation
//!  │     └─ Table   crop page (pdfium) → detect (HTTP) → grid → Markdown/HTML
//!  └─ 5. Output     {"page_1": "...", "page_2": "..."} with empty pages pruned
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2pagejson::{parse_document, ParseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ParseConfig::builder()
//!         .elements_path("report.elements.json")
//!         .table_service_url("http://localhost:8080/v1/tables")
//!         .build()?;
//!     let output = parse_document("report.pdf", &config).await?;
//!     println!("{}", output.document.to_json_pretty()?);
//!     eprintln!("{} table(s), {} failure(s)",
//!         output.stats.tables_rendered,
//!         output.stats.table_failures);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `parse-document` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2pagejson = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod elements;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod repetition;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ParseConfig, ParseConfigBuilder, TableFormat};
pub use convert::{parse_document, parse_elements, parse_sync, parse_to_file};
pub use elements::{load_elements, Element, ElementCategory};
pub use error::{ParseError, TableError};
pub use output::{ParseOutput, ParseStats, ParsedDocument, TableFailure};
pub use pipeline::detect::{DetectedTable, HttpTableDetector, TableDetector};
pub use pipeline::input::output_path_for;
pub use pipeline::render::{CropRegion, PageRenderer, PdfiumRenderer};
pub use progress::{NoopProgressCallback, ParseProgressCallback, ProgressCallback};
pub use repetition::{FrequencyFilter, RepetitionPolicy};
pub use table::{reconstruct, Cell, Grid, RawCell};
