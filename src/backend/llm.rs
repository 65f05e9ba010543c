//! Vision-LLM backend: map the transcript to chat messages and call the provider.
//!
//! ## Message Layout
//!
//! Every request carries the whole conversation, in order:
//! 1. **System message** — the grading instruction (or user-supplied override)
//! 2. For each submitter turn — a **user message** whose text is the
//!    `[Page N]` label and whose attachments are the page PNGs
//! 3. For each grader turn — an **assistant message** with the earlier reply
//!
//! Replaying earlier replies lets the model see which questions it has
//! already opened, so the END marker and score land on the right page.
//!
//! There is no retry loop: a failed call is reported to the caller, which
//! decides whether to stop the document.

use super::FeedbackBackend;
use crate::config::GradingConfig;
use crate::error::GradeError;
use crate::transcript::{Role, Transcript, Turn};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// [`FeedbackBackend`] over an `edgequake-llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Option<Duration>,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        let defaults = GradingConfig::default();
        Self::from_config(provider, &defaults)
    }

    /// Take sampling and timeout settings from `config`.
    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &GradingConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: config.api_timeout(),
        }
    }
}

/// Build `CompletionOptions` from the grading config.
fn build_options(config: &GradingConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl FeedbackBackend for LlmBackend {
    async fn generate_reply(
        &self,
        transcript: &Transcript,
        system_instruction: &str,
    ) -> Result<String, GradeError> {
        let start = Instant::now();
        let messages = build_messages(transcript, system_instruction);
        let call = self.provider.chat(&messages, Some(&self.options));
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!("LLM call exceeded {}s", limit.as_secs());
                GradeError::BackendTimeout {
                    secs: limit.as_secs(),
                }
            })?,
            None => call.await,
        };

        let response = result.map_err(|e| {
            warn!("LLM call failed — {}", e);
            GradeError::Backend {
                message: format!("{}", e),
            }
        })?;

        debug!(
            "{} messages: {} input tokens, {} output tokens, {:?}",
            messages.len(),
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(GradeError::Backend {
                message: "provider returned an empty reply".to_string(),
            });
        }

        Ok(response.content)
    }
}

/// Convert the transcript into provider chat messages, system message first.
pub fn build_messages(transcript: &Transcript, system_instruction: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(ChatMessage::system(system_instruction));
    messages.extend(transcript.turns().iter().map(turn_to_message));
    messages
}

fn turn_to_message(turn: &Turn) -> ChatMessage {
    let text = turn.text();
    match turn.role {
        Role::Grader => ChatMessage::assistant(&text),
        Role::Submitter => {
            let images: Vec<ImageData> = turn
                .images()
                .map(|(bytes, mime)| encode_image(bytes, mime))
                .collect();
            if images.is_empty() {
                ChatMessage::user(&text)
            } else {
                ChatMessage::user_with_images(&text, images)
            }
        }
    }
}

/// Base64-wrap an image for the multimodal request body.
///
/// `detail: "high"` keeps handwriting and small subscripts legible for
/// providers that tile images.
pub fn encode_image(bytes: &[u8], mime_type: &str) -> ImageData {
    ImageData::new(STANDARD.encode(bytes), mime_type).with_detail("high")
}
