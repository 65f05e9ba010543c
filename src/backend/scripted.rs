//! A backend that replays canned replies in order.
//!
//! Useful in tests and for dry runs of the grading loop without an API key:
//! each call pops the next scripted step and records what it was sent.

use super::FeedbackBackend;
use crate::error::GradeError;
use crate::transcript::{Role, Transcript};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted step: a reply or a backend failure.
#[derive(Debug, Clone)]
enum Step {
    Reply(String),
    Fail(String),
}

/// What the backend saw on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Number of turns in the transcript at call time.
    pub turns: usize,
    /// Number of submitter (page) turns among them.
    pub pages: usize,
    pub system_instruction: String,
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    /// Backend that answers with `replies`, one per call.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: Mutex::new(replies.into_iter().map(|r| Step::Reply(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Step::Reply(reply.into()));
        self
    }

    /// Queue a backend failure with `message`.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()));
        self
    }

    fn push(&self, step: Step) {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl FeedbackBackend for ScriptedBackend {
    async fn generate_reply(
        &self,
        transcript: &Transcript,
        system_instruction: &str,
    ) -> Result<String, GradeError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                turns: transcript.len(),
                pages: transcript
                    .turns()
                    .iter()
                    .filter(|t| t.role == Role::Submitter)
                    .count(),
                system_instruction: system_instruction.to_string(),
            });

        let step = self
            .steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(message)) => Err(GradeError::Backend { message }),
            None => Err(GradeError::Backend {
                message: "scripted backend has no replies left".to_string(),
            }),
        }
    }
}
