//! Response validation: the START/END/score contract on grader replies.
//!
//! The grader is told to wrap the feedback for each question in
//! `START Question X` … `END Question X` and to score every finished question
//! from 0 to 5. Answers routinely run across page breaks, so a single reply
//! may open a question, close one, do both, or contain no marker at all.
//! [`ResponseValidator`] keeps the set of questions that are open across the
//! whole document and checks one reply at a time:
//!
//! ```text
//!             START X              END X
//! unopened ───────────▶ open ───────────────▶ closed
//!                        ▲ │                    │
//!                        └─┘ START X            │ START X
//!                          (no-op)              ▼
//!                                              open
//! ```
//!
//! Within one reply every START is applied before any END, so a reply that
//! mentions both for the same question leaves it closed. The identifier is the
//! number after `Question`; sub-part suffixes (`4a`, `4.1`) are dropped.
//!
//! A reply that contains at least one END marker must also contain a score
//! token (`N/5`, `score: N`, `N out of 5`, with N in 0..=5). Marker bookkeeping
//! is applied before that check and is kept when the check fails.

use crate::error::FeedbackValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

static RE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(START|END)\s+Question\s+(\d+)").unwrap()
});

static RE_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-5])\s*/\s*5\b|\bscore[:\s]+([0-5])\b|\b([0-5])\s+out\s+of\s+5\b")
        .unwrap()
});

/// Which side of a question a marker delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Start,
    End,
}

/// One `START Question X` / `END Question X` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    /// Question number; `Question 4a` and `Question 4.1` both yield `"4"`.
    pub question: String,
}

/// What a single reply did to the open-question set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyCheck {
    /// Identifiers with a START marker, in order of appearance.
    pub started: Vec<String>,
    /// Identifiers with an END marker, in order of appearance.
    pub ended: Vec<String>,
    /// First score token found, if any.
    pub score: Option<u8>,
}

/// Extract every START/END marker from `reply`, in textual order.
pub fn scan_markers(reply: &str) -> Vec<Marker> {
    RE_MARKER
        .captures_iter(reply)
        .map(|caps| {
            let kind = if caps[1].eq_ignore_ascii_case("start") {
                MarkerKind::Start
            } else {
                MarkerKind::End
            };
            Marker {
                kind,
                question: caps[2].to_string(),
            }
        })
        .collect()
}

/// Return the first score in any accepted surface form.
///
/// Digits outside 0..=5 never match: `6/5` and `score: 7` yield `None`.
pub fn find_score(reply: &str) -> Option<u8> {
    let caps = RE_SCORE.captures(reply)?;
    (1..=3)
        .find_map(|i| caps.get(i))
        .and_then(|m| m.as_str().parse().ok())
}

/// Tracks open questions across every reply of one document.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    open: BTreeSet<String>,
}

impl ResponseValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the markers of `reply`, then enforce the score rule.
    ///
    /// All STARTs of the reply are applied before its ENDs. The open set is
    /// updated even when this returns `Err`.
    pub fn check(&mut self, reply: &str) -> Result<ReplyCheck, FeedbackValidationError> {
        let mut outcome = ReplyCheck::default();
        for marker in scan_markers(reply) {
            match marker.kind {
                MarkerKind::Start => outcome.started.push(marker.question),
                MarkerKind::End => outcome.ended.push(marker.question),
            }
        }

        for question in &outcome.started {
            self.open.insert(question.clone());
        }
        for question in &outcome.ended {
            self.open.remove(question);
        }

        outcome.score = find_score(reply);
        debug!(
            started = ?outcome.started,
            ended = ?outcome.ended,
            score = ?outcome.score,
            open = self.open.len(),
            "reply markers applied"
        );

        if !outcome.ended.is_empty() && outcome.score.is_none() {
            return Err(FeedbackValidationError {
                questions: outcome.ended,
            });
        }

        Ok(outcome)
    }

    /// Snapshot of the identifiers currently open.
    pub fn open_questions(&self) -> BTreeSet<String> {
        self.open.clone()
    }

    pub fn is_balanced(&self) -> bool {
        self.open.is_empty()
    }

    pub fn reset(&mut self) {
        self.open.clear();
    }
}
