//! Error types for the pdf-gradecheck library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`GradeError`] — the operation could not produce a usable result
//!   (missing credential, unreadable PDF, backend unreachable). Returned as
//!   `Err(GradeError)` from session calls and the top-level `grade*`
//!   functions.
//!
//! * [`FeedbackValidationError`] — **Advisory**: the backend replied, the
//!   reply was recorded, but it does not follow the START/END/score format.
//!   It travels inside [`GradeError::Validation`] so a single `?` still works,
//!   and [`GradeError::is_recoverable`] lets the caller keep grading.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-gradecheck library.
#[derive(Debug, Error)]
pub enum GradeError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No credential could be resolved for the backend.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    Configuration { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Backend errors ────────────────────────────────────────────────────
    /// The generation call failed (network, auth, quota, malformed reply).
    #[error("LLM backend error: {message}")]
    Backend { message: String },

    /// The generation call did not finish within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    BackendTimeout { secs: u64 },

    // ── Feedback format ───────────────────────────────────────────────────
    /// The reply was received and recorded but breaks the feedback format.
    #[error(transparent)]
    Validation(#[from] FeedbackValidationError),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document rendered to zero pages.
    #[error("PDF '{path}' has no pages to grade")]
    NoPages { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a feedback file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GradeError {
    /// True when the caller can carry on with the next page.
    ///
    /// Only format violations qualify: the reply exists and is already in the
    /// feedback history.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GradeError::Validation(_))
    }
}

/// A reply closed one or more questions without stating a score.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error(
    "Response has END marker for question(s) [{}] but missing required score (0-5). \
     Expected a score like '3/5', 'Score: 3', or '3 out of 5'.",
    .questions.join(", ")
)]
pub struct FeedbackValidationError {
    /// Identifiers whose END marker appeared in the offending reply, in order.
    pub questions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_questions_and_formats() {
        let e = FeedbackValidationError {
            questions: vec!["7".into(), "8".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("[7, 8]"), "got: {msg}");
        assert!(msg.contains("3 out of 5"), "got: {msg}");
    }

    #[test]
    fn validation_is_the_only_recoverable_error() {
        let v: GradeError = FeedbackValidationError {
            questions: vec!["1".into()],
        }
        .into();
        assert!(v.is_recoverable());
        assert!(!GradeError::Backend {
            message: "quota".into()
        }
        .is_recoverable());
        assert!(!GradeError::Configuration {
            provider: "gemini".into(),
            hint: "set GEMINI_API_KEY".into()
        }
        .is_recoverable());
    }

    #[test]
    fn validation_is_transparent_through_grade_error() {
        let inner = FeedbackValidationError {
            questions: vec!["3".into()],
        };
        let outer = GradeError::Validation(inner.clone());
        assert_eq!(outer.to_string(), inner.to_string());
    }

    #[test]
    fn backend_timeout_display() {
        let e = GradeError::BackendTimeout { secs: 90 };
        assert!(e.to_string().contains("90s"));
    }

    #[test]
    fn configuration_display() {
        let e = GradeError::Configuration {
            provider: "gemini".into(),
            hint: "Set GEMINI_API_KEY or GOOGLE_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"));
        assert!(msg.contains("GOOGLE_API_KEY"));
    }
}
