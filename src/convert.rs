//! Top-level parsing entry points.
//!
//! [`parse_document`] wires the production collaborators (pdfium renderer,
//! HTTP table detector, configured element source) around the assembler.
//! [`parse_elements`] is the same core with every collaborator injected, for
//! callers that already hold the element stream or want their own services.

use crate::config::ParseConfig;
use crate::elements::{Element, ElementCategory};
use crate::error::ParseError;
use crate::output::{ParseOutput, ParseStats};
use crate::pipeline::assemble::DocumentAssembler;
use crate::pipeline::detect::{HttpTableDetector, TableDetector};
use crate::pipeline::input::{output_path_for, resolve_input};
use crate::pipeline::partition::load_or_partition;
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::repetition::{FrequencyFilter, RepetitionPolicy};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Parse a PDF into a page-keyed document.
///
/// # Returns
/// `Ok(ParseOutput)` even when some tables failed (see `output.failures`).
///
/// # Errors
/// Only fatal problems:
/// - input missing, unreadable or not a PDF
/// - no element source configured, or the partitioner failed
///
/// A document with tables but no detection service still parses: its prose
/// is kept and every table is recorded in `failures`.
pub async fn parse_document(
    input: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<ParseOutput, ParseError> {
    let pdf_path = resolve_input(input.as_ref())?;
    info!("Starting parse: {}", pdf_path.display());

    let elements = load_or_partition(&pdf_path, config).await?;

    let policy = FrequencyFilter::from_elements(
        &elements,
        config.repetition_threshold,
        config.count_list_items,
    );
    debug!(
        "{} distinct text(s) at or above the repetition threshold of {}",
        policy.repeated_texts(),
        policy.threshold()
    );

    let has_tables = elements
        .iter()
        .any(|e| e.category == ElementCategory::Table);
    let detector = if has_tables {
        match HttpTableDetector::from_config(config) {
            Ok(detector) => Some(detector),
            Err(e) => {
                warn!("{e}; tables will be recorded as failures");
                None
            }
        }
    } else {
        None
    };
    let renderer = PdfiumRenderer::from_config(config);

    Ok(parse_elements(
        &pdf_path,
        &elements,
        &renderer,
        detector.as_ref().map(|d| d as &dyn TableDetector),
        &policy,
        config,
    )
    .await)
}

/// Assemble `elements` with caller-supplied collaborators.
///
/// Never fails: every per-table problem ends up in `failures`.
pub async fn parse_elements(
    pdf_path: &Path,
    elements: &[Element],
    renderer: &dyn PageRenderer,
    detector: Option<&dyn TableDetector>,
    policy: &dyn RepetitionPolicy,
    config: &ParseConfig,
) -> ParseOutput {
    let mut assembler = DocumentAssembler::new(pdf_path, renderer, policy, config);
    if let Some(detector) = detector {
        assembler = assembler.with_detector(detector);
    }
    assembler.run(elements).await
}

/// Parse a PDF and write `<stem>.json` into `save_folder` (default: the
/// input's directory).
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn parse_to_file(
    input: impl AsRef<Path>,
    save_folder: Option<&Path>,
    config: &ParseConfig,
) -> Result<(PathBuf, ParseStats), ParseError> {
    let input = input.as_ref();
    let output = parse_document(input, config).await?;
    let path = output_path_for(input, save_folder);
    write_json_atomic(&path, &output).await?;
    info!("Wrote {} page(s) to {}", output.stats.pages_emitted, path.display());
    Ok((path, output.stats))
}

async fn write_json_atomic(path: &Path, output: &ParseOutput) -> Result<(), ParseError> {
    let write_err = |source: std::io::Error| ParseError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let json = output
        .document
        .to_json()
        .map_err(|e| ParseError::Internal(format!("JSON serialisation: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Synchronous wrapper around [`parse_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn parse_sync(input: impl AsRef<Path>, config: &ParseConfig) -> Result<ParseOutput, ParseError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ParseError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(parse_document(input, config))
}
