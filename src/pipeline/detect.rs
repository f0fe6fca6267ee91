//! Table detection: send a cropped page image to the OCR table service and
//! return the raw cell records of every table it found.
//!
//! ## Retry Strategy
//!
//! Only failures that can go away on their own are retried: transport
//! errors, timeouts, HTTP 429 and 5xx. The wait before retry `n` is
//! `retry_backoff_ms * 2^(n-1)`; with 500 ms base and 3 retries that is
//! 500 ms → 1 s → 2 s. Any other 4xx, or a body that does not decode, fails
//! on the spot since repeating the same request cannot change the answer.

use crate::config::ParseConfig;
use crate::error::{ParseError, TableError};
use crate::pipeline::encode::{encode_png_file, ImagePayload};
use crate::table::RawCell;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const SERVICE: &str = "table-detection";

/// Table-detection collaborator.
#[async_trait]
pub trait TableDetector: Send + Sync {
    /// Detect every table in the PNG at `image_path`. An image with no table
    /// yields `Ok(vec![])`.
    async fn detect_tables(&self, image_path: &Path) -> Result<Vec<DetectedTable>, TableError>;
}

/// One table found by the detection service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedTable {
    #[serde(default)]
    pub cells: Vec<RawCell>,
}

/// Response body of the detection service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub tables: Vec<DetectedTable>,
}

#[derive(Debug, Serialize)]
struct DetectionRequest<'a> {
    #[serde(flatten)]
    image: &'a ImagePayload,
    features: [&'static str; 1],
}

/// Outcome of a single failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallError {
    /// Worth another try.
    Transient(String),
    /// Repeating the request will not help.
    Permanent(String),
}

/// HTTP client for the table-detection service.
#[derive(Debug, Clone)]
pub struct HttpTableDetector {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl HttpTableDetector {
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        max_retries: u32,
        retry_backoff_ms: u64,
    ) -> Result<Self, ParseError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParseError::Internal(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            token,
            max_retries,
            retry_backoff_ms,
        })
    }

    /// Build from the service settings in `config`.
    ///
    /// # Errors
    /// [`ParseError::ServiceNotConfigured`] when no endpoint is set.
    pub fn from_config(config: &ParseConfig) -> Result<Self, ParseError> {
        let url = config
            .table_service_url
            .clone()
            .ok_or_else(|| ParseError::ServiceNotConfigured {
                service: "Table detection service".to_string(),
                hint: "The document contains tables. Set --table-service-url or TABLE_SERVICE_URL."
                    .to_string(),
            })?;
        Self::new(
            url,
            config.table_service_token.clone(),
            Duration::from_secs(config.api_timeout_secs),
            config.max_retries,
            config.retry_backoff_ms,
        )
    }

    async fn send_once(&self, body: &DetectionRequest<'_>) -> Result<DetectionResponse, CallError> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CallError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = format!("HTTP {status}: {}", truncate(&text, 200));
            return Err(if is_retryable(status) {
                CallError::Transient(detail)
            } else {
                CallError::Permanent(detail)
            });
        }

        response
            .json::<DetectionResponse>()
            .await
            .map_err(|e| CallError::Permanent(format!("undecodable response: {e}")))
    }
}

#[async_trait]
impl TableDetector for HttpTableDetector {
    async fn detect_tables(&self, image_path: &Path) -> Result<Vec<DetectedTable>, TableError> {
        let payload = encode_png_file(image_path)
            .await
            .map_err(|e| TableError::ExternalService {
                service: SERVICE.to_string(),
                attempts: 0,
                detail: format!("cannot read {}: {e}", image_path.display()),
            })?;
        let body = DetectionRequest {
            image: &payload,
            features: ["TABLES"],
        };

        let mut last_err = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay(self.retry_backoff_ms, attempt);
                warn!(
                    "Table detection: retry {}/{} after {:?}",
                    attempt, self.max_retries, backoff
                );
                sleep(backoff).await;
            }

            match self.send_once(&body).await {
                Ok(response) => {
                    debug!(
                        "Table detection: {} table(s) after {} attempt(s)",
                        response.tables.len(),
                        attempt + 1
                    );
                    return Ok(response.tables);
                }
                Err(CallError::Permanent(detail)) => {
                    return Err(TableError::ExternalService {
                        service: SERVICE.to_string(),
                        attempts: attempt + 1,
                        detail,
                    });
                }
                Err(CallError::Transient(detail)) => {
                    warn!("Table detection: attempt {} failed: {}", attempt + 1, detail);
                    last_err = detail;
                }
            }
        }

        Err(TableError::ExternalService {
            service: SERVICE.to_string(),
            attempts: self.max_retries + 1,
            detail: last_err,
        })
    }
}

/// HTTP statuses worth retrying: rate limiting and server-side errors.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Sleep before retry `attempt` (1-based).
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_png_bytes;
    use crate::table::parse_cells;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(0, 3), Duration::ZERO);
    }

    #[test]
    fn retry_classification() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn request_body_shape() {
        let payload = encode_png_bytes(b"\x89PNG");
        let body = DetectionRequest {
            image: &payload,
            features: ["TABLES"],
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["mime_type"], "image/png");
        assert_eq!(v["features"], serde_json::json!(["TABLES"]));
        assert_eq!(v["image"], "iVBORw==");
    }

    #[test]
    fn response_decodes_to_cells() {
        let json = r#"{"tables": [
            {"cells": [
                {"row_index": 1, "column_index": 1, "row_span": 1, "column_span": 2,
                 "is_column_header": true, "text": "Totals"},
                {"row": "2", "col": "1", "rowspan": 1, "colspan": 1, "text": "12"}
            ]},
            {}
        ]}"#;
        let resp: DetectionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.tables.len(), 2);
        assert!(resp.tables[1].cells.is_empty());

        let cells = parse_cells(&resp.tables[0].cells).unwrap();
        assert_eq!(cells[0].colspan, 2);
        assert!(cells[0].is_header);
        assert_eq!((cells[1].row, cells[1].col), (2, 1));
    }

    #[test]
    fn empty_body_means_no_tables() {
        let resp: DetectionResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.tables.is_empty());
    }

    #[test]
    fn from_config_requires_url() {
        let err = HttpTableDetector::from_config(&ParseConfig::default()).unwrap_err();
        assert!(matches!(err, ParseError::ServiceNotConfigured { .. }));
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("àèìòù", 2), "àè…");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[test]
    fn unreachable_service_exhausts_retries() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let png = dir.path().join("t.png");
            std::fs::write(&png, b"\x89PNG\r\n\x1a\n").unwrap();

            // Port 9 (discard) on localhost is closed in test environments.
            let detector =
                HttpTableDetector::new("http://127.0.0.1:9/detect", None, Duration::from_secs(2), 2, 1)
                    .unwrap();
            let err = detector.detect_tables(&png).await.unwrap_err();
            match err {
                TableError::ExternalService { service, attempts, .. } => {
                    assert_eq!(service, SERVICE);
                    assert_eq!(attempts, 3);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        });
    }

    #[tokio::test]
    async fn missing_image_fails_without_request() {
        let detector =
            HttpTableDetector::new("http://127.0.0.1:9/detect", None, Duration::from_secs(1), 3, 1).unwrap();
        let err = detector
            .detect_tables(Path::new("/no/such/crop.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::ExternalService { attempts: 0, .. }));
    }
}
