//! PDF rasterisation: render every page to PNG bytes via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and blocks for the whole render. Running it on the
//! blocking pool keeps the Tokio workers free for the backend calls.
//!
//! Pages are scaled by `dpi / 72` (PDF user space is 72 units per inch) and
//! then capped at `max_rendered_pixels` on either edge.

use crate::config::GradingConfig;
use crate::error::GradeError;
use crate::pipeline::encode;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// One rendered page, ready to submit.
#[derive(Clone)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub png: Vec<u8>,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("page_num", &self.page_num)
            .field("png", &format_args!("<{} bytes>", self.png.len()))
            .finish()
    }
}

/// Rasterise every page of a PDF, in order.
pub async fn render_pages(
    pdf_path: &Path,
    config: &GradingConfig,
) -> Result<Vec<PageImage>, GradeError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, dpi, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| GradeError::Internal(format!("Render task panicked: {}", e)))?
}

/// Scale factor from PDF points to pixels at `dpi`.
fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / 72.0
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<PageImage>, GradeError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                GradeError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                GradeError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            GradeError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    if total_pages == 0 {
        return Err(GradeError::NoPages {
            path: pdf_path.to_path_buf(),
        });
    }

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale_for_dpi(dpi))
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            GradeError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        let png = encode::encode_png(&image).map_err(|e| GradeError::RasterisationFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {}", e),
        })?;

        results.push(PageImage { page_num, png });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpi_scale_is_relative_to_72() {
        assert_eq!(scale_for_dpi(72), 1.0);
        assert_eq!(scale_for_dpi(144), 2.0);
        assert!((scale_for_dpi(300) - 4.1666).abs() < 0.001);
    }

    #[test]
    fn page_image_debug_hides_bytes() {
        let p = PageImage {
            page_num: 2,
            png: vec![0; 10],
        };
        assert!(format!("{p:?}").contains("<10 bytes>"));
    }
}
