//! Image encoding: `DynamicImage` → PNG bytes.
//!
//! The session treats a page as an opaque PNG blob; base64 wrapping happens
//! only when the backend builds its request. PNG is lossless, and JPEG
//! artefacts around handwriting and thin fraction bars confuse vision models.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
