//! Image normalisation: web-optimised slide blob → baseline RGB JPEG.
//!
//! Slide images are usually served as WebP, which many presentation viewers
//! cannot display. Every blob is decoded, flattened to 3-channel RGB (alpha
//! is dropped, not composited) and re-encoded as JPEG. The decoded pixel
//! size travels with the bytes so the assembler can size the canvas without
//! decoding again.

use crate::error::DeckError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Pixels per inch used to turn pixel sizes into page sizes.
pub const PIXELS_PER_INCH: f64 = 72.0;

/// A slide image ready for the presentation package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl NormalizedImage {
    /// Page width in inches, treating one pixel as one 72-dpi point.
    pub fn width_inches(&self) -> f64 {
        f64::from(self.pixel_width) / PIXELS_PER_INCH
    }

    /// Page height in inches, treating one pixel as one 72-dpi point.
    pub fn height_inches(&self) -> f64 {
        f64::from(self.pixel_height) / PIXELS_PER_INCH
    }
}

/// Decode `blob`, drop alpha, and re-encode it as JPEG at `quality`.
///
/// CPU-bound; the fetch scheduler calls it from `spawn_blocking`.
pub fn normalize_image(slide: u32, blob: &[u8], quality: u8) -> Result<NormalizedImage, DeckError> {
    let decoded = image::load_from_memory(blob).map_err(|e| DeckError::DecodeFailed {
        slide,
        detail: e.to_string(),
    })?;

    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let (pixel_width, pixel_height) = (rgb.width(), rgb.height());

    let mut bytes = Vec::with_capacity(blob.len());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        .map_err(|e| DeckError::DecodeFailed {
            slide,
            detail: format!("JPEG encoding failed: {e}"),
        })?;

    debug!(
        "Normalised slide {} → {}x{} px, {} → {} bytes",
        slide,
        pixel_width,
        pixel_height,
        blob.len(),
        bytes.len()
    );

    Ok(NormalizedImage {
        bytes,
        pixel_width,
        pixel_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encoded(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn png_with_alpha_becomes_rgb_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 128])));
        let out = normalize_image(1, &encoded(&img, ImageFormat::Png), 75).unwrap();

        assert_eq!((out.pixel_width, out.pixel_height), (20, 10));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
        let back = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(back.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn webp_is_accepted() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([0, 128, 255, 255])));
        let out = normalize_image(3, &encoded(&img, ImageFormat::WebP), 75).unwrap();
        assert_eq!((out.pixel_width, out.pixel_height), (8, 6));
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        let err = normalize_image(9, b"<html>not an image</html>", 75).unwrap_err();
        assert!(matches!(err, DeckError::DecodeFailed { slide: 9, .. }));
    }

    #[test]
    fn inches_are_pixels_over_72() {
        let img = NormalizedImage {
            bytes: vec![],
            pixel_width: 720,
            pixel_height: 540,
        };
        assert_eq!(img.width_inches(), 10.0);
        assert_eq!(img.height_inches(), 7.5);
    }
}
