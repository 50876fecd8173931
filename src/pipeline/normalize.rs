//! Image normalisation before upload.
//!
//! Two guarantees for every image that leaves this module:
//!
//! * the longer side is at most `max_dimension` pixels (proportional
//!   Lanczos3 downscale, never an upscale);
//! * the pixel format is either `Rgb8` or `Luma8`. Transparent pixels are
//!   composited onto white first, because a transparent background encodes
//!   as black in many decoders and the model then sees white-on-black text.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use tracing::debug;

/// Bound the dimensions and canonicalise the colour mode of a page image.
///
/// Pure: the same input and `max_dimension` always produce the same output.
pub fn normalize_image(img: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let resized = downscale(img, max_dimension);
    let source = resized.as_ref().unwrap_or(img);
    canonical_colour(source)
}

/// Returns `None` when the image already fits.
fn downscale(img: &DynamicImage, max_dimension: u32) -> Option<DynamicImage> {
    let (w, h) = (img.width(), img.height());
    let longer = w.max(h);
    if longer <= max_dimension || max_dimension == 0 {
        return None;
    }

    // Integer scaling keeps the longer side exactly at `max_dimension`.
    let scale = |side: u32| ((side as u64 * max_dimension as u64 / longer as u64) as u32).max(1);
    let (nw, nh) = (scale(w), scale(h));
    debug!("Downscaling {}x{} → {}x{}", w, h, nw, nh);

    Some(img.resize_exact(nw, nh, FilterType::Lanczos3))
}

fn canonical_colour(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img.clone(),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            DynamicImage::ImageLuma8(flatten_luma_alpha(img))
        }
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        other if other.color().has_alpha() => DynamicImage::ImageRgb8(flatten_rgba(other)),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Alpha-composite `value` over an opaque white background.
#[inline]
fn over_white(value: u8, alpha: u8) -> u8 {
    let (v, a) = (value as u32, alpha as u32);
    ((v * a + 255 * (255 - a) + 127) / 255) as u8
}

fn flatten_rgba(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    })
}

fn flatten_luma_alpha(img: &DynamicImage) -> GrayImage {
    let la = img.to_luma_alpha8();
    GrayImage::from_fn(la.width(), la.height(), |x, y| {
        let [l, a] = la.get_pixel(x, y).0;
        Luma([over_white(l, a)])
    })
}
