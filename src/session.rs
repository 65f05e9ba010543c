//! The grading session: one growing conversation per document.
//!
//! A session owns the transcript, the feedback history and the
//! open-question validator. Pages go in one at a time with
//! [`GradingSession::submit_page`]; each call to
//! [`GradingSession::request_feedback`] sends the whole conversation so far
//! and records the reply.
//!
//! ```text
//! submit_page(p1) ─▶ request_feedback ─▶ submit_page(p2) ─▶ request_feedback ─▶ …
//!     [Page 1]+png       reply 1              [Page 2]+png       reply 2
//! ```
//!
//! Nothing is rolled back when a reply fails validation: the reply is
//! already in the transcript and the history, and the open-question set
//! already reflects its markers. The caller decides whether to go on.

use crate::backend::{self, FeedbackBackend};
use crate::config::GradingConfig;
use crate::error::GradeError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::transcript::Transcript;
use crate::validate::ResponseValidator;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Separator used by [`GradingSession::combined_feedback`].
const FEEDBACK_RULE: &str = "==================================================";

/// Multi-turn grading conversation for one document.
pub struct GradingSession {
    backend: Arc<dyn FeedbackBackend>,
    model: String,
    system_instruction: String,
    transcript: Transcript,
    feedback_history: Vec<String>,
    validator: ResponseValidator,
}

impl std::fmt::Debug for GradingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradingSession")
            .field("model", &self.model)
            .field("turns", &self.transcript.len())
            .field("replies", &self.feedback_history.len())
            .field("open_questions", &self.validator.open_questions())
            .finish()
    }
}

impl GradingSession {
    /// Connect to the backend described by `config`.
    ///
    /// # Errors
    /// [`GradeError::Configuration`] when no credential can be resolved.
    pub fn connect(config: &GradingConfig) -> Result<Self, GradeError> {
        let backend = backend::connect(config)?;
        info!("Grading session ready: model {}", config.model);
        Ok(Self::with_backend(backend, config.model.clone())
            .with_system_instruction(config.system_instruction()))
    }

    /// Session over an already-built backend, with the default instruction.
    pub fn with_backend(backend: Arc<dyn FeedbackBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            system_instruction: DEFAULT_SYSTEM_PROMPT.to_string(),
            transcript: Transcript::new(),
            feedback_history: Vec::new(),
            validator: ResponseValidator::new(),
        }
    }

    /// Replace the system instruction sent with every request.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Append a page image, labelled `[Page N]` when a number is given.
    ///
    /// Purely local: no backend call, cannot fail.
    pub fn submit_page(&mut self, image: impl Into<Vec<u8>>, page_number: Option<usize>) {
        let image = image.into();
        debug!(
            "Submitting page {:?} ({} bytes)",
            page_number,
            image.len()
        );
        self.transcript.push_page(image, page_number);
    }

    /// Ask the backend for feedback on everything submitted so far.
    ///
    /// On success the reply is appended to the transcript and the history
    /// before validation runs. With `validate` set, a reply that closes a
    /// question without a score yields [`GradeError::Validation`]; the reply
    /// is still recorded and retrievable through
    /// [`feedback_history`](Self::feedback_history).
    ///
    /// # Errors
    /// * [`GradeError::Backend`] / [`GradeError::BackendTimeout`]: nothing is
    ///   recorded.
    /// * [`GradeError::Validation`]: recoverable, see above.
    pub async fn request_feedback(&mut self, validate: bool) -> Result<String, GradeError> {
        let reply = self
            .backend
            .generate_reply(&self.transcript, &self.system_instruction)
            .await?;

        self.transcript.push_reply(reply.as_str());
        self.feedback_history.push(reply.clone());

        if validate {
            if let Err(e) = self.validator.check(&reply) {
                warn!("Reply {} failed validation: {}", self.feedback_history.len(), e);
                return Err(e.into());
            }
        }

        Ok(reply)
    }

    /// Copy of the questions opened but not yet closed.
    pub fn open_questions(&self) -> BTreeSet<String> {
        self.validator.open_questions()
    }

    /// Raw replies, in call order.
    pub fn feedback_history(&self) -> &[String] {
        &self.feedback_history
    }

    /// Every reply so far, separated by a horizontal rule.
    pub fn combined_feedback(&self) -> String {
        self.feedback_history
            .join(&format!("\n\n{FEEDBACK_RULE}\n\n"))
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Forget the current document; the backend connection is kept.
    pub fn reset(&mut self) {
        debug!(
            "Resetting session ({} turns, {} replies)",
            self.transcript.len(),
            self.feedback_history.len()
        );
        self.transcript.clear();
        self.feedback_history.clear();
        self.validator.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;

    fn session(replies: &[&str]) -> GradingSession {
        let backend = Arc::new(ScriptedBackend::new(replies.iter().copied()));
        GradingSession::with_backend(backend, "test-model")
    }

    #[test]
    fn submit_page_is_local() {
        let mut s = session(&[]);
        s.submit_page(vec![1, 2, 3], Some(1));
        s.submit_page(vec![4, 5, 6], None);
        assert_eq!(s.transcript().len(), 2);
        assert!(s.feedback_history().is_empty());
    }

    #[tokio::test]
    async fn reply_is_appended_as_grader_turn() {
        let mut s = session(&["Instructions page."]);
        s.submit_page(vec![0], Some(1));
        let reply = s.request_feedback(true).await.unwrap();
        assert_eq!(reply, "Instructions page.");
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.feedback_history(), ["Instructions page."]);
    }

    #[tokio::test]
    async fn validation_failure_still_records_reply() {
        let mut s = session(&["START Question 7\nLooks fine.\nEND Question 7"]);
        s.submit_page(vec![0], Some(1));
        let err = s.request_feedback(true).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains('7'));
        assert_eq!(s.feedback_history().len(), 1);
        assert_eq!(s.transcript().len(), 2);
        assert!(s.open_questions().is_empty());
    }

    #[tokio::test]
    async fn unvalidated_reply_skips_bookkeeping() {
        let mut s = session(&["START Question 2"]);
        s.submit_page(vec![0], None);
        s.request_feedback(false).await.unwrap();
        assert!(s.open_questions().is_empty());
    }

    #[tokio::test]
    async fn backend_error_records_nothing() {
        let backend = Arc::new(ScriptedBackend::default().then_fail("401 unauthorized"));
        let mut s = GradingSession::with_backend(backend, "m");
        s.submit_page(vec![0], Some(1));
        let err = s.request_feedback(true).await.unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(s.transcript().len(), 1);
        assert!(s.feedback_history().is_empty());
    }

    #[tokio::test]
    async fn combined_feedback_joins_with_rule() {
        let mut s = session(&["one", "two"]);
        s.submit_page(vec![0], Some(1));
        s.request_feedback(true).await.unwrap();
        s.submit_page(vec![0], Some(2));
        s.request_feedback(true).await.unwrap();
        let all = s.combined_feedback();
        assert!(all.starts_with("one"));
        assert!(all.ends_with("two"));
        assert!(all.contains(FEEDBACK_RULE));
    }

    #[test]
    fn custom_instruction_is_kept() {
        let s = session(&[]).with_system_instruction("Be gentle.");
        assert_eq!(s.system_instruction(), "Be gentle.");
        assert_eq!(s.model(), "test-model");
    }
}
