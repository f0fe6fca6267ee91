//! Configuration types for PDF-to-JSON parsing.
//!
//! All parsing behaviour is controlled through [`ParseConfig`], built via its
//! [`ParseConfigBuilder`]. Every knob lives in one struct so a config can be
//! shared across tasks, logged, and diffed between two runs.

use crate::error::ParseError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for a PDF-to-JSON parse.
///
/// Built via [`ParseConfig::builder()`] or using [`ParseConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2pagejson::{ParseConfig, TableFormat};
///
/// let config = ParseConfig::builder()
///     .dpi(200)
///     .table_format(TableFormat::Html)
///     .table_service_url("http://localhost:8080/detect")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ParseConfig {
    /// Page render resolution in DPI. Range: 72–600. Default: 200.
    ///
    /// Element coordinates from the layout partitioner are expressed in the
    /// pixel space of its own 200 DPI rasterisation, so keep both in step
    /// unless the coordinates carry their layout size.
    pub dpi: u32,

    /// Extra margin around each table crop, in millimetres. Default: 0.0.
    pub crop_margin_mm: f32,

    /// Rendering mode for reconstructed tables. Default: Markdown.
    pub table_format: TableFormat,

    /// Texts seen this many times or more are treated as running
    /// headers/footers and dropped. Default: 10.
    pub repetition_threshold: usize,

    /// Count ListItem texts in the repetition counter. Default: false.
    ///
    /// When false a list item is kept only if its exact text also occurs as
    /// a Title, Text or NarrativeText element.
    pub count_list_items: bool,

    /// Pre-computed element JSON file. Takes precedence over `partition_url`.
    pub elements_path: Option<PathBuf>,

    /// Remote layout partitioner endpoint (e.g. `.../general/v0/general`).
    pub partition_url: Option<String>,

    /// API key sent to the partitioner as `unstructured-api-key`.
    pub partition_api_key: Option<String>,

    /// Partitioning strategy. Default: `hi_res` (required for table boxes).
    pub partition_strategy: String,

    /// OCR languages passed to the partitioner. Default: `["ita", "eng"]`.
    pub languages: Vec<String>,

    /// Table-detection service endpoint.
    pub table_service_url: Option<String>,

    /// Bearer token for the table-detection service.
    pub table_service_token: Option<String>,

    /// Maximum retry attempts on a transient service failure. Default: 3.
    ///
    /// Only transport errors, timeouts, 429 and 5xx responses are retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request timeout for external services, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            crop_margin_mm: 0.0,
            table_format: TableFormat::default(),
            repetition_threshold: 10,
            count_list_items: false,
            elements_path: None,
            partition_url: None,
            partition_api_key: None,
            partition_strategy: "hi_res".to_string(),
            languages: vec!["ita".to_string(), "eng".to_string()],
            table_service_url: None,
            table_service_token: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ParseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("ParseConfig")
            .field("dpi", &self.dpi)
            .field("crop_margin_mm", &self.crop_margin_mm)
            .field("table_format", &self.table_format)
            .field("repetition_threshold", &self.repetition_threshold)
            .field("count_list_items", &self.count_list_items)
            .field("elements_path", &self.elements_path)
            .field("partition_url", &self.partition_url)
            .field("partition_api_key", &redact(&self.partition_api_key))
            .field("partition_strategy", &self.partition_strategy)
            .field("languages", &self.languages)
            .field("table_service_url", &self.table_service_url)
            .field("table_service_token", &redact(&self.table_service_token))
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &redact(&self.password))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ParseProgressCallback>"),
            )
            .finish()
    }
}

impl ParseConfig {
    /// Create a new builder for `ParseConfig`.
    pub fn builder() -> ParseConfigBuilder {
        ParseConfigBuilder {
            config: Self::default(),
        }
    }

    /// Crop margin converted to whole pixels at the configured DPI.
    pub fn crop_margin_px(&self) -> u32 {
        (self.crop_margin_mm.max(0.0) * self.dpi as f32 / 25.4) as u32
    }
}

/// Builder for [`ParseConfig`].
#[derive(Debug)]
pub struct ParseConfigBuilder {
    config: ParseConfig,
}

impl ParseConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn crop_margin_mm(mut self, mm: f32) -> Self {
        self.config.crop_margin_mm = mm.max(0.0);
        self
    }

    pub fn table_format(mut self, format: TableFormat) -> Self {
        self.config.table_format = format;
        self
    }

    pub fn repetition_threshold(mut self, n: usize) -> Self {
        self.config.repetition_threshold = n;
        self
    }

    pub fn count_list_items(mut self, v: bool) -> Self {
        self.config.count_list_items = v;
        self
    }

    pub fn elements_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.elements_path = Some(path.into());
        self
    }

    pub fn partition_url(mut self, url: impl Into<String>) -> Self {
        self.config.partition_url = Some(url.into());
        self
    }

    pub fn partition_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.partition_api_key = Some(key.into());
        self
    }

    pub fn partition_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.config.partition_strategy = strategy.into();
        self
    }

    pub fn languages<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.languages = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn table_service_url(mut self, url: impl Into<String>) -> Self {
        self.config.table_service_url = Some(url.into());
        self
    }

    pub fn table_service_token(mut self, token: impl Into<String>) -> Self {
        self.config.table_service_token = Some(token.into());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ParseConfig, ParseError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ParseError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.repetition_threshold == 0 {
            return Err(ParseError::InvalidConfig(
                "Repetition threshold must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ParseError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        for (name, url) in [
            ("partition URL", &c.partition_url),
            ("table service URL", &c.table_service_url),
        ] {
            if let Some(u) = url {
                if !(u.starts_with("http://") || u.starts_with("https://")) {
                    return Err(ParseError::InvalidConfig(format!(
                        "{name} must be an HTTP/HTTPS URL, got '{u}'"
                    )));
                }
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Textual serialisation used for reconstructed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableFormat {
    /// GitHub-flavoured pipe table. (default)
    #[default]
    Markdown,
    /// `<table>` markup with a `<thead>` header row.
    Html,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ParseConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.repetition_threshold, 10);
        assert_eq!(c.table_format, TableFormat::Markdown);
        assert_eq!(c.languages, vec!["ita", "eng"]);
        assert!(!c.count_list_items);
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = ParseConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
        let c = ParseConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn builder_rejects_zero_threshold() {
        let err = ParseConfig::builder()
            .repetition_threshold(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn builder_rejects_non_http_service() {
        let err = ParseConfig::builder()
            .table_service_url("ftp://example.org")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("table service URL"));
    }

    #[test]
    fn margin_in_pixels() {
        let c = ParseConfig::builder()
            .dpi(300)
            .crop_margin_mm(2.0)
            .build()
            .unwrap();
        assert_eq!(c.crop_margin_px(), 23);
        assert_eq!(ParseConfig::default().crop_margin_px(), 0);
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = ParseConfig::builder()
            .table_service_token("s3cret")
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("s3cret"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
