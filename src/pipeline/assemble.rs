//! Document assembly: walk the element stream in order and build the
//! page-keyed document.
//!
//! ## State
//!
//! Two page numbers are tracked:
//!
//! * `current_page`: the entry text is appended to. Only a `PageBreak`
//!   moves it.
//! * `page_number`: the running counter. A `PageBreak` increments it, and a
//!   `Table` element carrying its own `page_number` overwrites it. The
//!   counter drives the first-page Title rule and the next `PageBreak`.
//!
//! The two agree unless the partitioner missed (or invented) a page break;
//! when a table's metadata disagrees with the counter the resync is logged
//! at `debug`.
//!
//! ## Tables
//!
//! Each table element gets its own temporary PNG. The page region is
//! rendered into it, sent for detection, and every detected table is
//! reconstructed and appended. A failure at any step is recorded as a
//! [`TableFailure`] and the element contributes only its leading newline.

use crate::config::{ParseConfig, TableFormat};
use crate::elements::{Element, ElementCategory};
use crate::error::TableError;
use crate::output::{page_key, ParseOutput, ParseStats, ParsedDocument, TableFailure};
use crate::pipeline::detect::{DetectedTable, TableDetector};
use crate::pipeline::render::{CropRegion, PageRenderer};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::repetition::RepetitionPolicy;
use crate::table::reconstruct;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sequential state machine over one document's elements.
pub struct DocumentAssembler<'a> {
    pdf_path: &'a Path,
    renderer: &'a dyn PageRenderer,
    detector: Option<&'a dyn TableDetector>,
    policy: &'a dyn RepetitionPolicy,
    table_format: TableFormat,
    progress: ProgressCallback,

    document: ParsedDocument,
    current_page: u32,
    page_number: u32,
    stats: ParseStats,
    failures: Vec<TableFailure>,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(
        pdf_path: &'a Path,
        renderer: &'a dyn PageRenderer,
        policy: &'a dyn RepetitionPolicy,
        config: &ParseConfig,
    ) -> Self {
        let mut document = ParsedDocument::new();
        document.seed(1);
        Self {
            pdf_path,
            renderer,
            detector: None,
            policy,
            table_format: config.table_format,
            progress: config
                .progress_callback
                .clone()
                .unwrap_or_else(|| Arc::new(NoopProgressCallback)),
            document,
            current_page: 1,
            page_number: 1,
            stats: ParseStats::default(),
            failures: Vec::new(),
        }
    }

    /// Attach the table-detection collaborator. Without one every table
    /// element is recorded as a failure.
    pub fn with_detector(mut self, detector: &'a dyn TableDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Consume `elements` in order and return the finalised document.
    pub async fn run(mut self, elements: &[Element]) -> ParseOutput {
        let start = Instant::now();
        self.stats.total_elements = elements.len();
        self.progress.on_parse_start(elements.len());

        for (index, element) in elements.iter().enumerate() {
            self.step(index, element).await;
            self.progress.on_element_done(index);
        }

        let document = self.document.finalize();
        self.stats.pages_emitted = document.len();
        self.stats.total_duration_ms = start.elapsed().as_millis() as u64;
        self.progress
            .on_parse_complete(document.len(), self.failures.len());

        info!(
            "Assembled {} page(s) from {} elements: {} table(s) rendered, {} failure(s), {} suppressed",
            self.stats.pages_emitted,
            self.stats.total_elements,
            self.stats.tables_rendered,
            self.stats.table_failures,
            self.stats.suppressed_elements
        );

        ParseOutput {
            document,
            stats: self.stats,
            failures: self.failures,
        }
    }

    async fn step(&mut self, index: usize, element: &Element) {
        match element.category {
            ElementCategory::PageBreak => self.page_break(),
            ElementCategory::ListItem => self.append_filtered(element, "\n"),
            ElementCategory::NarrativeText | ElementCategory::Text => self.append_filtered(element, " "),
            ElementCategory::Title if self.page_number == 1 => {
                if let Some(text) = element.text() {
                    self.document.append(self.current_page, text);
                    self.document.append(self.current_page, "\n");
                }
            }
            ElementCategory::Title => self.append_filtered(element, "\n"),
            ElementCategory::Table => self.table(index, element).await,
            ElementCategory::Other => {}
        }
    }

    fn page_break(&mut self) {
        self.stats.page_breaks += 1;
        self.page_number += 1;
        self.current_page = self.page_number;
        if self.document.seed(self.current_page) {
            warn!(
                "{} was seeded again after a table resync; its earlier content is discarded",
                page_key(self.current_page)
            );
        }
        debug!("Page break → {}", page_key(self.current_page));
    }

    fn append_filtered(&mut self, element: &Element, separator: &str) {
        let Some(text) = element.text() else {
            return;
        };
        if self.policy.keep(text) {
            self.document.append(self.current_page, text);
            self.document.append(self.current_page, separator);
        } else {
            self.stats.suppressed_elements += 1;
            debug!("Suppressed repeated text on {}: {:?}", page_key(self.current_page), text);
        }
    }

    async fn table(&mut self, index: usize, element: &Element) {
        self.stats.table_elements += 1;
        self.document.append(self.current_page, "\n");

        let source_page = match element.metadata.page_number {
            Some(p) if p >= 1 => {
                if p != self.page_number {
                    debug!(
                        "Table element #{} reports page {} while the counter is at {}; resyncing",
                        index, p, self.page_number
                    );
                }
                self.page_number = p;
                p
            }
            _ => self.page_number,
        };
        let crop = element
            .metadata
            .coordinates
            .as_ref()
            .and_then(CropRegion::from_coordinates);

        self.progress.on_table_start(source_page);

        let tables = match self.extract(source_page, crop.as_ref()).await {
            Ok(tables) => tables,
            Err(e) => {
                self.record_failure(index, source_page, e);
                return;
            }
        };

        let mut rendered = 0;
        for table in &tables {
            match reconstruct(&table.cells, self.table_format) {
                Ok(text) => {
                    self.document.append(self.current_page, &text);
                    self.document.append(self.current_page, "\n");
                    rendered += 1;
                }
                Err(e) => self.record_failure(index, source_page, e),
            }
        }
        self.stats.tables_rendered += rendered;
        debug!(
            "Table element #{} (page {}): {} of {} detected table(s) rendered",
            index,
            source_page,
            rendered,
            tables.len()
        );
        self.progress.on_table_complete(source_page, rendered);
    }

    /// Render the region into a fresh temp PNG and run detection on it. The
    /// file is removed on every path out of here.
    async fn extract(&self, page: u32, crop: Option<&CropRegion>) -> Result<Vec<DetectedTable>, TableError> {
        let detector = self.detector.ok_or_else(|| TableError::ExternalService {
            service: "table-detection".to_string(),
            attempts: 0,
            detail: "no table detection service configured".to_string(),
        })?;

        let image = tempfile::Builder::new()
            .prefix("table-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| TableError::RenderFailed {
                page,
                detail: format!("cannot create temporary image: {e}"),
            })?;

        let result = match self
            .renderer
            .render_page(self.pdf_path, page, image.path(), crop)
            .await
        {
            Ok(()) => detector.detect_tables(image.path()).await,
            Err(e) => Err(e),
        };

        let image_path = image.path().to_path_buf();
        match image.close() {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!("Could not remove temporary image {}: {}", image_path.display(), e);
            }
            _ => {}
        }
        result
    }

    fn record_failure(&mut self, element_index: usize, page_number: u32, error: TableError) {
        warn!("Table element #{} (page {}): {}", element_index, page_number, error);
        self.stats.table_failures += 1;
        self.progress.on_table_error(page_number, &error.to_string());
        self.failures.push(TableFailure {
            element_index,
            page_number,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repetition::FrequencyFilter;
    use crate::table::RawCell;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct BlankRenderer;

    #[async_trait]
    impl PageRenderer for BlankRenderer {
        async fn render_page(
            &self,
            _pdf: &Path,
            _page: u32,
            out: &Path,
            _crop: Option<&CropRegion>,
        ) -> Result<(), TableError> {
            std::fs::write(out, b"\x89PNG\r\n\x1a\n").map_err(|e| TableError::RenderFailed {
                page: 0,
                detail: e.to_string(),
            })
        }
    }

    /// Hands out scripted responses in order and remembers each image path.
    struct Scripted {
        responses: Mutex<Vec<Result<Vec<DetectedTable>, TableError>>>,
        seen: Mutex<Vec<std::path::PathBuf>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<Vec<DetectedTable>, TableError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TableDetector for Scripted {
        async fn detect_tables(&self, image: &Path) -> Result<Vec<DetectedTable>, TableError> {
            assert!(image.exists(), "image must exist during detection");
            self.seen.lock().unwrap().push(image.to_path_buf());
            self.responses.lock().unwrap().pop().unwrap_or(Ok(vec![]))
        }
    }

    fn cell(row: u32, col: u32, text: &str) -> RawCell {
        serde_json::from_value(json!({"row": row, "col": col, "rowspan": 1, "colspan": 1, "text": text})).unwrap()
    }

    fn name_age() -> DetectedTable {
        DetectedTable {
            cells: vec![cell(1, 1, "Name"), cell(1, 2, "Age"), cell(2, 1, "Ann"), cell(2, 2, "30")],
        }
    }

    async fn assemble(elements: &[Element], detector: &dyn TableDetector) -> ParseOutput {
        let config = ParseConfig::default();
        let policy = FrequencyFilter::from_elements(elements, 10, false);
        DocumentAssembler::new(Path::new("doc.pdf"), &BlankRenderer, &policy, &config)
            .with_detector(detector)
            .run(elements)
            .await
    }

    #[tokio::test]
    async fn separators_by_category() {
        let els = vec![
            Element::new(ElementCategory::Title, "Report"),
            Element::new(ElementCategory::NarrativeText, "Intro."),
            Element::new(ElementCategory::Text, "More."),
        ];
        let out = assemble(&els, &Scripted::new(vec![])).await;
        assert_eq!(out.document.get(1), Some("Report\nIntro. More. "));
    }

    #[tokio::test]
    async fn list_item_needs_counted_text() {
        // ListItem texts are not counted, so a lone list item has count 0.
        let els = vec![
            Element::new(ElementCategory::ListItem, "- alone"),
            Element::new(ElementCategory::ListItem, "- shared"),
            Element::new(ElementCategory::Text, "- shared"),
        ];
        let out = assemble(&els, &Scripted::new(vec![])).await;
        assert_eq!(out.document.get(1), Some("- shared\n- shared "));
        assert_eq!(out.stats.suppressed_elements, 1);
    }

    #[tokio::test]
    async fn table_is_rendered_after_newline() {
        let els = vec![
            Element::new(ElementCategory::Text, "Before"),
            Element::table(1, vec![[0.0, 0.0], [50.0, 50.0]]),
        ];
        let detector = Scripted::new(vec![Ok(vec![name_age()])]);
        let out = assemble(&els, &detector).await;

        let page = out.document.get(1).unwrap();
        assert!(page.starts_with("Before \n| Name"));
        assert!(page.ends_with("|\n"));
        assert_eq!(out.stats.tables_rendered, 1);
        assert!(out.failures.is_empty());
    }

    #[tokio::test]
    async fn temp_image_removed_after_each_table() {
        let els = vec![
            Element::table(1, vec![]),
            Element::table(1, vec![]),
        ];
        let detector = Scripted::new(vec![
            Ok(vec![name_age()]),
            Err(TableError::ExternalService {
                service: "table-detection".into(),
                attempts: 4,
                detail: "HTTP 503".into(),
            }),
        ]);
        assemble(&els, &detector).await;

        let seen = detector.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1], "each extraction gets its own file");
        for p in seen.iter() {
            assert!(!p.exists(), "{} should be deleted", p.display());
            let name = p.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("table-") && name.ends_with(".png"));
        }
    }

    #[tokio::test]
    async fn malformed_table_skipped_sibling_kept() {
        let bad = DetectedTable {
            cells: vec![serde_json::from_value(json!({"col": 1, "rowspan": 1, "colspan": 1})).unwrap()],
        };
        let els = vec![Element::table(1, vec![])];
        let detector = Scripted::new(vec![Ok(vec![bad, DetectedTable::default(), name_age()])]);
        let out = assemble(&els, &detector).await;

        assert_eq!(out.stats.tables_rendered, 1);
        assert_eq!(out.failures.len(), 2);
        assert!(matches!(out.failures[0].error, TableError::MalformedCell { ref field, .. } if field == "row"));
        assert_eq!(out.failures[1].error, TableError::EmptyTable);
        assert!(out.document.get(1).unwrap().contains("| Ann"));
    }

    #[tokio::test]
    async fn missing_detector_is_recorded() {
        let els = vec![Element::new(ElementCategory::Text, "x"), Element::table(1, vec![])];
        let config = ParseConfig::default();
        let policy = FrequencyFilter::from_elements(&els, 10, false);
        let out = DocumentAssembler::new(Path::new("doc.pdf"), &BlankRenderer, &policy, &config)
            .run(&els)
            .await;
        assert_eq!(out.document.get(1), Some("x \n"));
        assert!(matches!(out.failures[0].error, TableError::ExternalService { attempts: 0, .. }));
    }

    /// Removes the image itself before answering.
    struct Consuming;

    #[async_trait]
    impl TableDetector for Consuming {
        async fn detect_tables(&self, image: &Path) -> Result<Vec<DetectedTable>, TableError> {
            std::fs::remove_file(image).unwrap();
            Ok(vec![name_age()])
        }
    }

    #[tokio::test]
    async fn image_removed_by_detector_is_not_an_error() {
        let els = vec![Element::table(1, vec![])];
        let out = assemble(&els, &Consuming).await;
        assert!(out.failures.is_empty());
        assert!(out.document.get(1).unwrap().contains("| Ann"));
    }

    #[tokio::test]
    async fn table_metadata_resyncs_counter_only() {
        let els = vec![
            Element::new(ElementCategory::Text, "one"),
            // Counter jumps to 3; text still lands on page_1.
            Element::table(3, vec![]),
            Element::new(ElementCategory::Text, "still one"),
            Element::page_break(),
            Element::new(ElementCategory::Text, "four"),
        ];
        let out = assemble(&els, &Scripted::new(vec![])).await;
        assert_eq!(out.document.keys(), vec!["page_1", "page_4"]);
        assert_eq!(out.document.get(1), Some("one \nstill one "));
        assert_eq!(out.document.get(4), Some("four "));
    }

    #[tokio::test]
    async fn resync_then_title_uses_counter() {
        let els = vec![
            Element::table(2, vec![]),
            Element::new(ElementCategory::Title, "Heading"),
        ];
        let policy_elements: Vec<Element> = std::iter::repeat(Element::new(ElementCategory::Title, "Heading"))
            .take(12)
            .collect();
        let config = ParseConfig::default();
        let policy = FrequencyFilter::from_elements(&policy_elements, 10, false);
        let detector = Scripted::new(vec![]);
        let out = DocumentAssembler::new(Path::new("doc.pdf"), &BlankRenderer, &policy, &config)
            .with_detector(&detector)
            .run(&els)
            .await;
        // Counter is 2 after the table, so the repeated title is filtered.
        assert_eq!(out.document.get(1), Some("\n"));
    }

    #[tokio::test]
    async fn elements_without_text_are_ignored() {
        let mut silent = Element::new(ElementCategory::NarrativeText, "");
        silent.text = None;
        let els = vec![silent, Element::new(ElementCategory::Other, "footer")];
        let out = assemble(&els, &Scripted::new(vec![])).await;
        assert!(out.document.is_empty());
        assert_eq!(out.stats.suppressed_elements, 0);
    }
}
