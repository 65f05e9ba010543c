//! The conversation transcript sent to the grader on every call.
//!
//! The transcript is append-only for the lifetime of a document: each page
//! adds a submitter turn, each backend reply adds a grader turn. The grader
//! needs every earlier page in context to close a question that started
//! pages ago, so nothing is ever dropped or summarised.

use serde::{Deserialize, Serialize};

/// Mime type used for rendered pages.
pub const PNG_MIME: &str = "image/png";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The student's side: page labels and page images.
    Submitter,
    /// The model's side: feedback text.
    Grader,
}

/// One content part of a turn.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    Image { bytes: Vec<u8>, mime_type: String },
}

// Image payloads are megabytes of PNG; print their size instead.
impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Part::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Part::Image { bytes, mime_type } => f
                .debug_struct("Image")
                .field("bytes", &format_args!("<{} bytes>", bytes.len()))
                .field("mime_type", mime_type)
                .finish(),
        }
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// Concatenated text parts, newline-separated.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Image parts as `(bytes, mime_type)` pairs.
    pub fn images(&self) -> impl Iterator<Item = (&[u8], &str)> {
        self.parts.iter().filter_map(|p| match p {
            Part::Image { bytes, mime_type } => Some((bytes.as_slice(), mime_type.as_str())),
            Part::Text(_) => None,
        })
    }
}

/// Label placed before a page image so the grader can refer to page numbers.
pub fn page_label(page_number: usize) -> String {
    format!("[Page {page_number}]")
}

/// Ordered, append-only list of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page: optional `[Page N]` label followed by the image.
    pub fn push_page(&mut self, image: Vec<u8>, page_number: Option<usize>) {
        let mut parts = Vec::with_capacity(2);
        if let Some(n) = page_number {
            parts.push(Part::Text(page_label(n)));
        }
        parts.push(Part::Image {
            bytes: image,
            mime_type: PNG_MIME.to_string(),
        });
        self.turns.push(Turn {
            role: Role::Submitter,
            parts,
        });
    }

    /// Append a grader reply.
    pub fn push_reply(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Grader,
            parts: vec![Part::Text(text.into())],
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Total image payload in bytes; grows with every page.
    pub fn image_bytes(&self) -> usize {
        self.turns
            .iter()
            .flat_map(|t| t.images())
            .map(|(b, _)| b.len())
            .sum()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
