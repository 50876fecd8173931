//! Image encoding: `DynamicImage` → base64 PNG data URI.
//!
//! PNG is lossless: JPEG artefacts around rendered glyphs degrade extraction
//! accuracy far more than the larger payload costs.

use crate::error::UnitError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG and wrap it as base64.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, UnitError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| UnitError::Encode(e.to_string()))?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image {} bytes PNG → {} bytes base64", buf.len(), b64.len());
    Ok(b64)
}

/// Encode an image as a `data:image/png;base64,…` URI.
pub fn encode_data_uri(img: &DynamicImage) -> Result<String, UnitError> {
    Ok(format!("data:image/png;base64,{}", encode_png_base64(img)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
        let b64 = encode_png_base64(&img).expect("encode should succeed");
        let decoded = STANDARD.decode(&b64).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn data_uri_has_png_prefix() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let uri = encode_data_uri(&img).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
