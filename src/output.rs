//! Grading results and their on-disk forms.
//!
//! Two artefacts are produced per run:
//!
//! * one `page_NNN.txt` per page, written as soon as the page is graded so a
//!   crash or an aborted run keeps everything graded so far;
//! * the combined report ([`GradingReport::render`]), written once at the end.

use crate::error::GradeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const REPORT_RULE: &str = "============================================================";

/// Feedback for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFeedback {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raw grader reply.
    pub feedback: String,
    /// Validation message when the reply broke the marker/score format.
    pub warning: Option<String>,
}

impl PageFeedback {
    /// Reply text for the per-page file, prefixed with the validation warning
    /// and a blank line if there is one.
    pub fn body(&self) -> String {
        match self.warning {
            Some(ref w) => format!("[VALIDATION WARNING: {}]\n\n{}", w, self.feedback),
            None => self.feedback.clone(),
        }
    }

    /// Content of the per-page feedback file.
    pub fn file_contents(&self) -> String {
        format!("=== Page {} Feedback ===\n\n{}", self.page_num, self.body())
    }
}

/// Counters for one grading run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingStats {
    pub total_pages: usize,
    /// Pages whose reply passed validation (or validation was off).
    pub graded_pages: usize,
    /// Pages whose reply was kept despite a validation warning.
    pub warned_pages: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// Everything a grading run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    pub pdf_path: PathBuf,
    pub model: String,
    pub pages: Vec<PageFeedback>,
    /// Questions still open after the last page, sorted.
    pub open_questions: Vec<String>,
    /// Where the per-page files were written.
    pub feedback_dir: PathBuf,
    pub stats: GradingStats,
}

impl GradingReport {
    /// True when every page passed validation and no question was left open.
    pub fn is_clean(&self) -> bool {
        self.stats.warned_pages == 0 && self.open_questions.is_empty()
    }

    /// The combined plain-text report.
    pub fn render(&self) -> String {
        let open = if self.open_questions.is_empty() {
            "None".to_string()
        } else {
            self.open_questions.join(", ")
        };

        let pages = self
            .pages
            .iter()
            .map(|p| match p.warning {
                Some(ref w) => format!(
                    "=== Page {} Feedback ===\n[VALIDATION WARNING: {}]\n{}",
                    p.page_num, w, p.feedback
                ),
                None => format!("=== Page {} Feedback ===\n{}", p.page_num, p.feedback),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "{rule}\nHOMEWORK FEEDBACK REPORT\n{rule}\n\
             PDF: {pdf}\n\
             Model: {model}\n\
             Total Pages: {total}\n\
             Open Questions: {open}\n\
             {rule}\n\n\
             {pages}\n\n\
             {rule}\nEND OF REPORT\n{rule}\n",
            rule = REPORT_RULE,
            pdf = self.pdf_path.display(),
            model = self.model,
            total = self.stats.total_pages,
        )
    }
}

/// File name for a page's feedback: `page_007.txt`.
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{page_num:03}.txt")
}

/// Write one page's feedback into `dir`, creating it if needed.
pub async fn save_page_feedback(dir: &Path, page: &PageFeedback) -> Result<PathBuf, GradeError> {
    let path = dir.join(page_file_name(page.page_num));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| GradeError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
    tokio::fs::write(&path, page.file_contents())
        .await
        .map_err(|e| GradeError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
    debug!("Saved page {} feedback to {}", page.page_num, path.display());
    Ok(path)
}

/// Write `contents` to `path` atomically (temp file + rename).
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), GradeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GradeError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| GradeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| GradeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
