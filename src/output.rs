//! Output types: the page-keyed document plus run statistics.

use crate::error::TableError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One page entry of a [`ParsedDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub number: u32,
    pub content: String,
}

impl PageEntry {
    /// JSON key for this page, e.g. `page_3`.
    pub fn key(&self) -> String {
        page_key(self.number)
    }
}

/// Key used for page `n` (1-based).
pub fn page_key(n: u32) -> String {
    format!("page_{n}")
}

/// Page-keyed text document.
///
/// Entries keep the order in which their page was first seeded. Serialises
/// as a JSON object `{"page_1": "...", "page_2": "..."}` in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pages: Vec<PageEntry>,
}

impl ParsedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or reset the entry for `page` to empty content.
    ///
    /// Returns `true` when an existing non-empty entry was discarded.
    pub fn seed(&mut self, page: u32) -> bool {
        match self.entry_mut(page) {
            Some(entry) => {
                let had_content = !entry.content.is_empty();
                entry.content.clear();
                had_content
            }
            None => {
                self.pages.push(PageEntry {
                    number: page,
                    content: String::new(),
                });
                false
            }
        }
    }

    /// Append `text` to `page`, creating the entry if needed.
    pub fn append(&mut self, page: u32, text: &str) {
        if self.entry_mut(page).is_none() {
            self.seed(page);
        }
        if let Some(entry) = self.entry_mut(page) {
            entry.content.push_str(text);
        }
    }

    /// Drop every page whose accumulated content is empty.
    pub fn finalize(mut self) -> Self {
        self.pages.retain(|p| !p.content.is_empty());
        self
    }

    pub fn get(&self, page: u32) -> Option<&str> {
        self.pages
            .iter()
            .find(|p| p.number == page)
            .map(|p| p.content.as_str())
    }

    pub fn keys(&self) -> Vec<String> {
        self.pages.iter().map(PageEntry::key).collect()
    }

    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn entry_mut(&mut self, page: u32) -> Option<&mut PageEntry> {
        self.pages.iter_mut().find(|p| p.number == page)
    }
}

impl Serialize for ParsedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pages.len()))?;
        for page in &self.pages {
            map.serialize_entry(&page.key(), &page.content)?;
        }
        map.end()
    }
}

/// A table element that could not be turned into text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFailure {
    /// Index of the element in the input stream.
    pub element_index: usize,
    /// Source page the table was cropped from.
    pub page_number: u32,
    pub error: TableError,
}

/// Counters collected while assembling a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub total_elements: usize,
    pub page_breaks: usize,
    pub pages_emitted: usize,
    pub table_elements: usize,
    pub tables_rendered: usize,
    pub table_failures: usize,
    pub suppressed_elements: usize,
    pub total_duration_ms: u64,
}

/// Result of a successful parse.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutput {
    pub document: ParsedDocument,
    pub stats: ParseStats,
    pub failures: Vec<TableFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_in_seed_order() {
        let mut doc = ParsedDocument::new();
        doc.seed(1);
        doc.append(1, "Intro ");
        doc.seed(2);
        doc.append(2, "Body");
        doc.seed(10);
        doc.append(10, "End");
        assert_eq!(
            doc.to_json().unwrap(),
            r#"{"page_1":"Intro ","page_2":"Body","page_10":"End"}"#
        );
    }

    #[test]
    fn finalize_prunes_empty_pages() {
        let mut doc = ParsedDocument::new();
        doc.seed(1);
        doc.seed(2);
        doc.append(2, "x");
        doc.seed(3);
        let doc = doc.finalize();
        assert_eq!(doc.keys(), vec!["page_2"]);
        assert_eq!(doc.get(2), Some("x"));
        assert_eq!(doc.get(1), None);
    }

    #[test]
    fn reseed_resets_in_place() {
        let mut doc = ParsedDocument::new();
        doc.seed(1);
        doc.append(1, "a");
        doc.seed(2);
        assert!(doc.seed(1));
        assert_eq!(doc.get(1), Some(""));
        assert_eq!(doc.keys(), vec!["page_1", "page_2"]);
        assert!(!doc.seed(2));
    }

    #[test]
    fn append_creates_missing_page() {
        let mut doc = ParsedDocument::new();
        doc.append(4, "late");
        assert_eq!(doc.get(4), Some("late"));
    }
}
