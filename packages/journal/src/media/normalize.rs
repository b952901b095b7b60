//! Downscale and re-encode uploaded photos before they reach the blob store.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{JournalError, Result};

/// MIME type of every normalized image.
pub const NORMALIZED_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Longest edge after downscaling. Images are never upscaled.
    pub max_dimension: u32,
    /// JPEG quality, clamped to 1..=100.
    pub quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
            quality: 72,
        }
    }
}

impl From<&common::config::MediaConfig> for NormalizeOptions {
    fn from(config: &common::config::MediaConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            quality: config.quality,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Output dimensions for a `width` x `height` image bounded by `max_dimension`.
///
/// The larger edge becomes `max_dimension` and the other edge is scaled and
/// rounded. Square images are bounded by height.
pub fn bounded_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max = max_dimension.max(1);
    let scale = |edge: u32, long: u32| {
        ((edge as f64 * max as f64 / long as f64).round() as u32).max(1)
    };

    if width > height && width > max {
        (max, scale(height, width))
    } else if height >= width && height > max {
        (scale(width, height), max)
    } else {
        (width, height)
    }
}

/// Decode `input`, bound it to `options.max_dimension` and re-encode as JPEG.
pub fn normalize(input: &[u8], options: NormalizeOptions) -> Result<NormalizedImage> {
    let decoded = image::load_from_memory(input)
        .map_err(|e| JournalError::Decode(format!("not a valid image: {e}")))?;

    let (width, height) =
        bounded_dimensions(decoded.width(), decoded.height(), options.max_dimension);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let rgb = resized.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, options.quality.clamp(1, 100)).write_image(
        rgb.as_raw(),
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;

    Ok(NormalizedImage {
        bytes,
        width,
        height,
    })
}
