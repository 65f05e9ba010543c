//! Page source: turn a homework PDF into an ordered list of PNG pages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ GradingSession::submit_page
//! (path)    (pdfium)   (PNG)
//! ```
//!
//! 1. [`input`]  — validate the user-supplied path before spending API calls
//! 2. [`render`] — rasterise every page at the configured DPI; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — PNG-encode each `DynamicImage`

pub mod encode;
pub mod input;
pub mod render;
