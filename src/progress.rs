//! Progress-callback trait for per-page grading events.
//!
//! Inject an [`Arc<dyn GradingProgressCallback>`] via
//! [`crate::config::GradingConfigBuilder::progress_callback`] to receive
//! events as the run moves through the document. A grading run can take
//! minutes (every page waits for a full backend round trip plus the pacing
//! delay), so callers usually want to show something while it works.
//!
//! # Example
//!
//! ```rust
//! use pdf_gradecheck::{GradingConfig, GradingProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct WarningCounter {
//!     warnings: AtomicUsize,
//! }
//!
//! impl GradingProgressCallback for WarningCounter {
//!     fn on_page_warning(&self, page_num: usize, _total: usize, warning: &str) {
//!         self.warnings.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}: {warning}");
//!     }
//! }
//!
//! let counter = Arc::new(WarningCounter { warnings: AtomicUsize::new(0) });
//! let config = GradingConfig::builder()
//!     .progress_callback(counter as Arc<dyn GradingProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the grading run as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive strictly in page order.
pub trait GradingProgressCallback: Send + Sync {
    /// Called once after rendering, before the first backend call.
    fn on_grading_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the page is submitted and feedback requested.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a reply passed validation (or validation is off).
    ///
    /// `feedback_len` is the byte length of the reply.
    fn on_page_graded(&self, page_num: usize, total_pages: usize, feedback_len: usize) {
        let _ = (page_num, total_pages, feedback_len);
    }

    /// Called when a reply was recorded but failed validation.
    fn on_page_warning(&self, page_num: usize, total_pages: usize, warning: &str) {
        let _ = (page_num, total_pages, warning);
    }

    /// Called while the run waits before the next backend call.
    fn on_pacing_delay(&self, next_page: usize, secs: f64) {
        let _ = (next_page, secs);
    }

    /// Called once after the last page.
    ///
    /// `open_questions` lists identifiers still open at the end of the document.
    fn on_grading_complete(&self, total_pages: usize, open_questions: &[String]) {
        let _ = (total_pages, open_questions);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GradingProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GradingConfig`].
pub type ProgressCallback = Arc<dyn GradingProgressCallback>;
