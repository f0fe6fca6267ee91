//! Progress-callback trait for per-element parsing events.
//!
//! Inject an [`Arc<dyn ParseProgressCallback>`] via
//! [`crate::config::ParseConfigBuilder::progress_callback`] to receive events
//! as the assembler walks the element stream. The CLI uses it to drive a
//! terminal progress bar; a host application can forward the same events to
//! a channel, a log, or a job record.
//!
//! # Example
//!
//! ```rust
//! use pdf2pagejson::{ParseConfig, ParseProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct TableCounter {
//!     done: AtomicUsize,
//! }
//!
//! impl ParseProgressCallback for TableCounter {
//!     fn on_table_complete(&self, page_number: u32, tables: usize) {
//!         self.done.fetch_add(tables, Ordering::SeqCst);
//!         eprintln!("page {page_number}: {tables} table(s)");
//!     }
//! }
//!
//! let config = ParseConfig::builder()
//!     .progress_callback(Arc::new(TableCounter { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the assembler as it processes the element stream.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Elements are handled strictly in order, one at a
/// time, but implementations must still be `Send + Sync` because the
/// callback is shared through the config.
pub trait ParseProgressCallback: Send + Sync {
    /// Called once before the first element.
    fn on_parse_start(&self, total_elements: usize) {
        let _ = total_elements;
    }

    /// Called after each element, whatever its category.
    ///
    /// # Arguments
    /// * `index` — 0-based position of the element in the stream
    fn on_element_done(&self, index: usize) {
        let _ = index;
    }

    /// Called just before a table region is rendered and sent for detection.
    fn on_table_start(&self, page_number: u32) {
        let _ = page_number;
    }

    /// Called when a table element was processed without a service failure.
    ///
    /// # Arguments
    /// * `tables` — number of tables rendered from this element (may be 0)
    fn on_table_complete(&self, page_number: u32, tables: usize) {
        let _ = (page_number, tables);
    }

    /// Called for every table failure (render, detection or cell parsing).
    fn on_table_error(&self, page_number: u32, error: &str) {
        let _ = (page_number, error);
    }

    /// Called once after the document has been finalised.
    ///
    /// # Arguments
    /// * `pages`         — number of non-empty pages emitted
    /// * `failed_tables` — number of table failures recorded
    fn on_parse_complete(&self, pages: usize, failed_tables: usize) {
        let _ = (pages, failed_tables);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ParseProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ParseConfig`].
pub type ProgressCallback = Arc<dyn ParseProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        elements: AtomicUsize,
        tables: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ParseProgressCallback for Tracking {
        fn on_element_done(&self, _index: usize) {
            self.elements.fetch_add(1, Ordering::SeqCst);
        }

        fn on_table_complete(&self, _page_number: u32, tables: usize) {
            self.tables.fetch_add(tables, Ordering::SeqCst);
        }

        fn on_table_error(&self, _page_number: u32, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_parse_start(5);
        cb.on_element_done(0);
        cb.on_table_start(2);
        cb.on_table_complete(2, 1);
        cb.on_table_error(3, "boom");
        cb.on_parse_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking::default();
        t.on_element_done(0);
        t.on_element_done(1);
        t.on_table_complete(1, 2);
        t.on_table_error(2, "HTTP 500");
        assert_eq!(t.elements.load(Ordering::SeqCst), 2);
        assert_eq!(t.tables.load(Ordering::SeqCst), 2);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_parse_start(10);
    }
}
