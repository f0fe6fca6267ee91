//! Element sources: where the classified element stream comes from.
//!
//! Two sources exist. A pre-computed element file (the partitioner's JSON
//! export) wins when configured; otherwise the PDF is uploaded to a remote
//! layout partitioner speaking the `unstructured` API.

use crate::config::ParseConfig;
use crate::elements::{elements_from_json, load_elements, Element};
use crate::error::ParseError;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Load the element stream for `pdf_path` from the configured source.
pub async fn load_or_partition(pdf_path: &Path, config: &ParseConfig) -> Result<Vec<Element>, ParseError> {
    if let Some(path) = &config.elements_path {
        let elements = load_elements(path).await?;
        info!("Loaded {} elements from {}", elements.len(), path.display());
        return Ok(elements);
    }
    if config.partition_url.is_some() {
        return partition_document(pdf_path, config).await;
    }
    Err(ParseError::ServiceNotConfigured {
        service: "Layout partitioner".to_string(),
        hint: "Pass --elements <file.json> or set --partition-url / PARTITION_URL.".to_string(),
    })
}

/// Build the multipart upload for the partitioner.
fn build_form(file_name: String, pdf: Vec<u8>, config: &ParseConfig) -> Result<Form, ParseError> {
    let part = Part::bytes(pdf)
        .file_name(file_name)
        .mime_str("application/pdf")
        .map_err(|e| ParseError::Internal(format!("multipart part: {e}")))?;

    let mut form = Form::new()
        .part("files", part)
        .text("strategy", config.partition_strategy.clone())
        .text("pdf_infer_table_structure", "true")
        .text("include_page_breaks", "true")
        .text("coordinates", "true");
    for lang in &config.languages {
        form = form.text("languages", lang.clone());
    }
    Ok(form)
}

/// Upload `pdf_path` to the remote partitioner and decode its element array.
///
/// # Errors
/// [`ParseError::ServiceNotConfigured`] without a `partition_url`;
/// [`ParseError::PartitionFailed`] on any transport, HTTP or decode failure.
pub async fn partition_document(pdf_path: &Path, config: &ParseConfig) -> Result<Vec<Element>, ParseError> {
    let url = config
        .partition_url
        .as_deref()
        .ok_or_else(|| ParseError::ServiceNotConfigured {
            service: "Layout partitioner".to_string(),
            hint: "Set --partition-url / PARTITION_URL.".to_string(),
        })?;

    let pdf = tokio::fs::read(pdf_path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ParseError::PermissionDenied {
            path: pdf_path.to_path_buf(),
        },
        _ => ParseError::FileNotFound {
            path: pdf_path.to_path_buf(),
        },
    })?;
    let file_name = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    debug!("Partitioning {} ({} bytes) via {}", file_name, pdf.len(), url);

    let form = build_form(file_name, pdf, config)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api_timeout_secs))
        .build()
        .map_err(|e| ParseError::Internal(format!("cannot build HTTP client: {e}")))?;

    let mut request = client
        .post(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .multipart(form);
    if let Some(key) = &config.partition_api_key {
        request = request.header("unstructured-api-key", key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| ParseError::PartitionFailed {
            detail: e.to_string(),
        })?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ParseError::PartitionFailed {
            detail: e.to_string(),
        })?;
    if !status.is_success() {
        return Err(ParseError::PartitionFailed {
            detail: format!("HTTP {status}: {}", body.chars().take(300).collect::<String>()),
        });
    }

    let elements = elements_from_json(&body).map_err(|e| ParseError::PartitionFailed {
        detail: format!("undecodable element array: {e}"),
    })?;
    info!("Partitioner returned {} elements", elements.len());
    Ok(elements)
}
