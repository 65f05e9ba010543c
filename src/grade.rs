//! Whole-document grading entry points.
//!
//! [`grade`] renders the PDF, then walks the pages strictly in order through
//! one [`GradingSession`]: submit page, request feedback, save the page file,
//! wait, next page. The wait is pacing for rate-limited API tiers and is
//! skipped after the last page.
//!
//! A reply that fails validation is kept and marked with a warning; a backend
//! failure stops the run, since every later page would be graded without the
//! context the failed page should have added.

use crate::config::GradingConfig;
use crate::error::GradeError;
use crate::output::{self, GradingReport, GradingStats, PageFeedback};
use crate::pipeline::render::PageImage;
use crate::pipeline::{input, render};
use crate::session::GradingSession;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Grade a homework PDF.
///
/// # Returns
/// `Ok(GradingReport)` when every page got a reply, even if some replies
/// failed validation (see `report.stats.warned_pages`) or questions were
/// left open (see `report.open_questions`).
///
/// # Errors
/// - File not found / not a PDF / cannot be rendered
/// - No credential for the backend
/// - A backend call failed
/// - A feedback file could not be written
pub async fn grade(
    pdf_path: impl AsRef<Path>,
    config: &GradingConfig,
) -> Result<GradingReport, GradeError> {
    let total_start = Instant::now();
    let pdf_path = input::resolve_input(pdf_path)?;
    info!("Grading: {}", pdf_path.display());

    // Connect first: a missing key should fail before rendering.
    let mut session = GradingSession::connect(config)?;

    let render_start = Instant::now();
    let pages = render::render_pages(&pdf_path, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", pages.len(), render_duration_ms);

    let feedback_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| input::default_feedback_dir(&pdf_path));

    let llm_start = Instant::now();
    let results = grade_pages(&mut session, &pages, &feedback_dir, config).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let open_questions: Vec<String> = session.open_questions().into_iter().collect();
    if !open_questions.is_empty() {
        warn!(
            "Questions still open at end of document: {}",
            open_questions.join(", ")
        );
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_grading_complete(pages.len(), &open_questions);
    }

    let warned = results.iter().filter(|p| p.warning.is_some()).count();
    let stats = GradingStats {
        total_pages: pages.len(),
        graded_pages: results.len() - warned,
        warned_pages: warned,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        llm_duration_ms,
    };

    info!(
        "Grading complete: {} pages, {} warnings, {}ms total",
        stats.total_pages, stats.warned_pages, stats.total_duration_ms
    );

    Ok(GradingReport {
        pdf_path,
        model: session.model().to_string(),
        pages: results,
        open_questions,
        feedback_dir,
        stats,
    })
}

/// Drive `session` through `pages` in order, saving each page's feedback.
///
/// The session is not reset first; call [`GradingSession::reset`] to reuse
/// one across documents.
pub async fn grade_pages(
    session: &mut GradingSession,
    pages: &[PageImage],
    feedback_dir: &Path,
    config: &GradingConfig,
) -> Result<Vec<PageFeedback>, GradeError> {
    let total = pages.len();
    let mut results = Vec::with_capacity(total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_grading_start(total);
    }

    for (i, page) in pages.iter().enumerate() {
        info!("Processing page {}/{}", page.page_num, total);
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page.page_num, total);
        }

        session.submit_page(page.png.clone(), Some(page.page_num));

        let feedback = match session.request_feedback(config.validate).await {
            Ok(reply) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_graded(page.page_num, total, reply.len());
                }
                PageFeedback {
                    page_num: page.page_num,
                    feedback: reply,
                    warning: None,
                }
            }
            Err(GradeError::Validation(e)) => {
                let warning = e.to_string();
                warn!("Page {}: validation warning: {}", page.page_num, warning);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_warning(page.page_num, total, &warning);
                }
                let raw = session
                    .feedback_history()
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "No feedback received".to_string());
                PageFeedback {
                    page_num: page.page_num,
                    feedback: raw,
                    warning: Some(warning),
                }
            }
            Err(e) => return Err(e),
        };

        let saved = output::save_page_feedback(feedback_dir, &feedback).await?;
        debug!("Page {} saved to {}", page.page_num, saved.display());
        results.push(feedback);

        let is_last = i + 1 == total;
        if !is_last && !config.delay.is_zero() {
            debug!("Waiting {:?} before next request", config.delay);
            if let Some(ref cb) = config.progress_callback {
                cb.on_pacing_delay(page.page_num + 1, config.delay.as_secs_f64());
            }
            tokio::time::sleep(config.delay).await;
        }
    }

    Ok(results)
}

/// Grade a PDF and write the combined report to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial reports.
pub async fn grade_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &GradingConfig,
) -> Result<GradingReport, GradeError> {
    let report = grade(pdf_path, config).await?;
    output::write_atomic(output_path.as_ref(), &report.render()).await?;
    info!("Report saved to {}", output_path.as_ref().display());
    Ok(report)
}

/// Synchronous wrapper around [`grade`].
///
/// Creates a temporary tokio runtime internally.
pub fn grade_sync(
    pdf_path: impl AsRef<Path>,
    config: &GradingConfig,
) -> Result<GradingReport, GradeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GradeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(grade(pdf_path, config))
}

/// Grade PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed on return.
/// Set `config.output_dir`: the default feedback directory would otherwise
/// land next to the temp file.
pub async fn grade_from_bytes(
    bytes: &[u8],
    config: &GradingConfig,
) -> Result<GradingReport, GradeError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| GradeError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| GradeError::Internal(format!("tempfile write: {e}")))?;
    let path: PathBuf = tmp.path().to_path_buf();
    // `tmp` is dropped (and the file deleted) when `grade` returns
    grade(&path, config).await
}
