//! Boilerplate suppression: decide whether a text is unique content or a
//! running header/footer.
//!
//! The assembler only asks [`RepetitionPolicy::keep`]; how the decision is
//! made lives here so it can be tuned or replaced without touching the
//! assembler's state machine.

use crate::elements::{Element, ElementCategory};
use std::collections::HashMap;

/// Decides whether an element text should be kept in the output.
pub trait RepetitionPolicy: Send + Sync {
    fn keep(&self, text: &str) -> bool;
}

/// Document-wide frequency filter.
///
/// A text is kept when it was observed at least once and fewer than
/// `threshold` times across the counted categories. Immutable once built.
#[derive(Debug, Clone)]
pub struct FrequencyFilter {
    counts: HashMap<String, usize>,
    threshold: usize,
}

impl FrequencyFilter {
    /// Count Title, Text and NarrativeText texts (plus ListItem texts when
    /// `count_list_items` is set).
    pub fn from_elements(elements: &[Element], threshold: usize, count_list_items: bool) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for el in elements {
            let counted = match el.category {
                ElementCategory::Title | ElementCategory::Text | ElementCategory::NarrativeText => true,
                ElementCategory::ListItem => count_list_items,
                _ => false,
            };
            if !counted {
                continue;
            }
            if let Some(text) = el.text() {
                *counts.entry(text.to_string()).or_insert(0) += 1;
            }
        }
        Self { counts, threshold }
    }

    pub fn count(&self, text: &str) -> usize {
        self.counts.get(text).copied().unwrap_or(0)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of distinct texts at or above the threshold.
    pub fn repeated_texts(&self) -> usize {
        self.counts.values().filter(|&&n| n >= self.threshold).count()
    }
}

impl RepetitionPolicy for FrequencyFilter {
    fn keep(&self, text: &str) -> bool {
        let n = self.count(text);
        n > 0 && n < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeated(category: ElementCategory, text: &str, n: usize) -> Vec<Element> {
        (0..n).map(|_| Element::new(category, text)).collect()
    }

    #[test]
    fn nine_kept_ten_dropped() {
        let mut els = repeated(ElementCategory::NarrativeText, "nine", 9);
        els.extend(repeated(ElementCategory::Text, "ten", 10));
        let f = FrequencyFilter::from_elements(&els, 10, false);
        assert!(f.keep("nine"));
        assert!(!f.keep("ten"));
        assert_eq!(f.repeated_texts(), 1);
    }

    #[test]
    fn unseen_text_is_dropped() {
        let f = FrequencyFilter::from_elements(&[], 10, false);
        assert_eq!(f.count("ghost"), 0);
        assert!(!f.keep("ghost"));
    }

    #[test]
    fn categories_share_one_counter() {
        let mut els = repeated(ElementCategory::Title, "Confidential", 5);
        els.extend(repeated(ElementCategory::NarrativeText, "Confidential", 5));
        let f = FrequencyFilter::from_elements(&els, 10, false);
        assert_eq!(f.count("Confidential"), 10);
        assert!(!f.keep("Confidential"));
    }

    #[test]
    fn list_items_counted_only_on_request() {
        let els = repeated(ElementCategory::ListItem, "- item", 2);
        assert_eq!(FrequencyFilter::from_elements(&els, 10, false).count("- item"), 0);
        let f = FrequencyFilter::from_elements(&els, 10, true);
        assert_eq!(f.count("- item"), 2);
        assert!(f.keep("- item"));
    }

    #[test]
    fn tables_and_page_breaks_are_not_counted() {
        let mut els = vec![Element::page_break(), Element::table(1, vec![])];
        els[1].text = Some("x".into());
        let f = FrequencyFilter::from_elements(&els, 10, false);
        assert_eq!(f.count("x"), 0);
    }
}
