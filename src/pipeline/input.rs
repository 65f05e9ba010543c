//! Input resolution: validate the homework PDF before any expensive work.
//!
//! Checking existence, permissions and the `%PDF` magic bytes up front gives
//! the caller a precise error instead of a pdfium failure halfway through a
//! run that has already spent API calls.

use crate::error::GradeError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, GradeError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(GradeError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(GradeError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(GradeError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(GradeError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Default directory for per-page feedback: `<pdf_dir>/<pdf_stem>_feedback`.
pub fn default_feedback_dir(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "homework".to_string());
    let parent = pdf_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    parent.join(format!("{stem}_feedback"))
}
