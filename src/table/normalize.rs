//! Text normalisation for table cells and header labels.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalise extracted text: newlines become spaces, whitespace runs
/// collapse to a single space, and the result is trimmed.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let joined = text.replace('\n', " ");
    RE_WHITESPACE.replace_all(&joined, " ").trim().to_string()
}
