//! # pdf-gradecheck
//!
//! Grade homework PDFs page by page with a vision LLM.
//!
//! Each page is rendered to an image and appended to one running
//! conversation with the grader. After every page the grader answers with
//! feedback wrapped in `START Question X` / `END Question X` markers and a
//! 0–5 score for every finished question. Answers may span several pages, so
//! the conversation keeps every earlier page in context and a validator
//! tracks which questions are still open across page boundaries.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path and %PDF magic
//!  ├─ 2. Connect   resolve the API key, build the backend
//!  ├─ 3. Render    rasterise pages via pdfium (spawn_blocking) → PNG
//!  ├─ 4. Grade     per page: submit → request feedback → validate → save
//!  └─ 5. Report    combined text report + open-question summary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_gradecheck::{grade, GradingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from GEMINI_API_KEY or GOOGLE_API_KEY
//!     let config = GradingConfig::default();
//!     let report = grade("homework.pdf", &config).await?;
//!     println!("{}", report.render());
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a session directly
//!
//! ```rust
//! use pdf_gradecheck::{GradingSession, ScriptedBackend};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(ScriptedBackend::new([
//!     "START Question 1\nThe setup is right so far.",
//!     "Sign error in line 3.\nEND Question 1\nScore: 3/5",
//! ]));
//! let mut session = GradingSession::with_backend(backend, "scripted");
//!
//! session.submit_page(Vec::<u8>::new(), Some(1));
//! session.request_feedback(true).await?;
//! assert!(session.open_questions().contains("1"));
//!
//! session.submit_page(Vec::<u8>::new(), Some(2));
//! session.request_feedback(true).await?;
//! assert!(session.open_questions().is_empty());
//! # Ok::<(), pdf_gradecheck::GradeError>(())
//! # }).unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gradecheck` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod grade;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod transcript;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{FeedbackBackend, LlmBackend, ScriptedBackend};
pub use config::{GradingConfig, GradingConfigBuilder, DEFAULT_DELAY, DEFAULT_MODEL};
pub use error::{FeedbackValidationError, GradeError};
pub use grade::{grade, grade_from_bytes, grade_pages, grade_sync, grade_to_file};
pub use output::{GradingReport, GradingStats, PageFeedback};
pub use progress::{GradingProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::GradingSession;
pub use transcript::{Part, Role, Transcript, Turn};
pub use validate::{ReplyCheck, ResponseValidator};
