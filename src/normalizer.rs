//! Image normalization for model input.
//!
//! Uploaded photos arrive in whatever format and size the user's camera produced.
//! Before they are embedded in a model request they are decoded, flattened to RGB,
//! shrunk so neither side exceeds [`ImageOptions::max_dimension`], and re-encoded
//! as JPEG. When a byte ceiling is configured the JPEG quality is stepped down
//! until the payload fits or the quality floor is reached.

use std::io::{Cursor, Read, Seek, SeekFrom};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use log::{debug, warn};
use serde::Deserialize;

use crate::error::DishcoveryError;

/// MIME type of every normalized payload.
pub const JPEG_MIME: &str = "image/jpeg";

/// Knobs for [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageOptions {
    /// Longest allowed side in pixels; `None` keeps the original size
    #[serde(default = "default_max_dimension")]
    pub max_dimension: Option<u32>,
    /// JPEG quality of the first encoding attempt (1-100)
    #[serde(default = "default_initial_quality")]
    pub initial_quality: u8,
    /// Lowest quality the size-reduction loop may reach
    #[serde(default = "default_min_quality")]
    pub min_quality: u8,
    /// Amount subtracted from the quality on every retry
    #[serde(default = "default_quality_step")]
    pub quality_step: u8,
    /// Maximum encoded size in bytes; `None` disables size enforcement
    #[serde(default = "default_byte_ceiling")]
    pub byte_ceiling: Option<usize>,
}

fn default_max_dimension() -> Option<u32> {
    Some(256)
}

fn default_initial_quality() -> u8 {
    30
}

fn default_min_quality() -> u8 {
    10
}

fn default_quality_step() -> u8 {
    5
}

fn default_byte_ceiling() -> Option<usize> {
    Some(40_000)
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            initial_quality: default_initial_quality(),
            min_quality: default_min_quality(),
            quality_step: default_quality_step(),
            byte_ceiling: default_byte_ceiling(),
        }
    }
}

impl ImageOptions {
    /// Upper bound on the number of JPEG encodings a single [`normalize`] call performs.
    pub fn max_iterations(&self) -> usize {
        let span = self.initial_quality.saturating_sub(self.min_quality) as usize;
        span / self.quality_step.max(1) as usize + 1
    }

    fn validate(&self) -> Result<(), DishcoveryError> {
        if self.initial_quality == 0 || self.initial_quality > 100 {
            return Err(DishcoveryError::InvalidInput(format!(
                "initial quality must be between 1 and 100, got {}",
                self.initial_quality
            )));
        }
        if self.min_quality == 0 || self.min_quality > self.initial_quality {
            return Err(DishcoveryError::InvalidInput(format!(
                "minimum quality must be between 1 and {}, got {}",
                self.initial_quality, self.min_quality
            )));
        }
        if self.quality_step == 0 {
            return Err(DishcoveryError::InvalidInput(
                "quality step must be positive".to_string(),
            ));
        }
        if self.max_dimension == Some(0) {
            return Err(DishcoveryError::InvalidInput(
                "max dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A photo that has been decoded, resized and re-encoded for a model request.
///
/// Only [`normalize`] and [`normalize_bytes`] produce one; it cannot be changed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    mime_type: &'static str,
    quality: u8,
    width: u32,
    height: u32,
}

impl NormalizedImage {
    pub(crate) fn from_jpeg(bytes: Vec<u8>, quality: u8, (width, height): (u32, u32)) -> Self {
        NormalizedImage {
            bytes,
            mime_type: JPEG_MIME,
            quality,
            width,
            height,
        }
    }

    /// Encoded JPEG bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Always [`JPEG_MIME`]
    pub fn mime_type(&self) -> &str {
        self.mime_type
    }

    /// Quality the final encoding was produced with
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// `(width, height)` in pixels after resizing
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Return a data URL: `data:<mime>;base64,<b64>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Return the base64-encoded payload only.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Normalize an image read from `reader`.
///
/// The reader is rewound before reading, since the caller may already have
/// consumed part of it (to preview the upload, for instance).
///
/// # Errors
/// Returns [`DishcoveryError::Decode`] if the bytes are not a supported raster
/// format, [`DishcoveryError::Io`] if the reader fails, and
/// [`DishcoveryError::InvalidInput`] for inconsistent options.
pub fn normalize<R: Read + Seek>(
    mut reader: R,
    options: &ImageOptions,
) -> Result<NormalizedImage, DishcoveryError> {
    reader.seek(SeekFrom::Start(0))?;
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    normalize_bytes(&raw, options)
}

/// Normalize an in-memory image. See [`normalize`].
pub fn normalize_bytes(
    raw: &[u8],
    options: &ImageOptions,
) -> Result<NormalizedImage, DishcoveryError> {
    options.validate()?;

    if raw.is_empty() {
        return Err(DishcoveryError::Decode("image data is empty".to_string()));
    }

    let decoded = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| DishcoveryError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| DishcoveryError::Decode(e.to_string()))?;
    debug!(
        "Decoded {}x{} image ({} bytes)",
        decoded.width(),
        decoded.height(),
        raw.len()
    );

    let rgb = decoded.to_rgb8();
    let rgb = match options.max_dimension {
        Some(max) => shrink_to_fit(rgb, max),
        None => rgb,
    };

    let mut quality = options.initial_quality;
    let mut bytes = encode_jpeg(&rgb, quality)?;

    if let Some(ceiling) = options.byte_ceiling {
        while bytes.len() > ceiling && quality > options.min_quality {
            quality = quality
                .saturating_sub(options.quality_step)
                .max(options.min_quality);
            bytes = encode_jpeg(&rgb, quality)?;
            debug!("Re-encoded at quality {}: {} bytes", quality, bytes.len());
        }
        if bytes.len() > ceiling {
            warn!(
                "Image is still {} bytes at minimum quality {} (ceiling {})",
                bytes.len(),
                quality,
                ceiling
            );
        }
    }

    Ok(NormalizedImage::from_jpeg(bytes, quality, rgb.dimensions()))
}

/// Parse a data URL and return `(mime_type, raw_bytes)`.
///
/// Accepts `data:<mime>;base64,<data>` format.
pub fn parse_data_url(data_url: &str) -> Result<(String, Vec<u8>), DishcoveryError> {
    let (mime, payload) = split_data_url(data_url)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| DishcoveryError::InvalidInput(format!("invalid base64 payload: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// Split a base64 data URL into `(mime_type, base64_payload)` without decoding
/// the payload.
pub fn split_data_url(data_url: &str) -> Result<(&str, &str), DishcoveryError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| DishcoveryError::InvalidInput("not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| DishcoveryError::InvalidInput("data URL has no payload".to_string()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| DishcoveryError::InvalidInput("data URL is not base64".to_string()))?;
    if payload.is_empty() {
        return Err(DishcoveryError::InvalidInput(
            "data URL has no payload".to_string(),
        ));
    }
    Ok((mime, payload))
}

/// Shrink `img` so that neither side exceeds `max`. Smaller images are returned untouched.
fn shrink_to_fit(img: RgbImage, max: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if w <= max && h <= max {
        return img;
    }
    match fit_within(w, h, max) {
        Some((new_w, new_h)) => image::imageops::resize(&img, new_w, new_h, FilterType::Lanczos3),
        None => {
            // Aspect ratio is lost here; the payload still has to fit.
            warn!(
                "Could not compute aspect-preserving size for {}x{}, resizing to {}x{}",
                w, h, max, max
            );
            image::imageops::resize(&img, max, max, FilterType::Triangle)
        }
    }
}

/// Largest size with the aspect ratio of `w`x`h` that fits in a `max` square.
fn fit_within(w: u32, h: u32, max: u32) -> Option<(u32, u32)> {
    if w == 0 || h == 0 || max == 0 {
        return None;
    }
    let ratio = (max as f64 / w as f64).min(max as f64 / h as f64);
    let new_w = (w as f64 * ratio).round() as u32;
    let new_h = (h as f64 * ratio).round() as u32;
    if new_w == 0 || new_h == 0 {
        return None;
    }
    Some((new_w.min(max), new_h.min(max)))
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, DishcoveryError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(img)
        .map_err(|e| DishcoveryError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, Rgba, RgbaImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_default_options() {
        let options = ImageOptions::default();
        assert_eq!(options.max_dimension, Some(256));
        assert_eq!(options.initial_quality, 30);
        assert_eq!(options.min_quality, 10);
        assert_eq!(options.quality_step, 5);
        assert_eq!(options.byte_ceiling, Some(40_000));
        assert_eq!(options.max_iterations(), 5);
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        assert_eq!(fit_within(3000, 3000, 256), Some((256, 256)));
        assert_eq!(fit_within(1000, 500, 256), Some((256, 128)));
        assert_eq!(fit_within(500, 1000, 256), Some((128, 256)));
    }

    #[test]
    fn test_fit_within_degenerate_sizes() {
        assert_eq!(fit_within(0, 10, 256), None);
        // 10000:1 strip would round its short side to zero
        assert_eq!(fit_within(100_000, 10, 256), None);
    }

    #[test]
    fn test_shrink_to_fit_falls_back_to_square() {
        let strip = RgbImage::from_pixel(4000, 1, Rgb([10, 20, 30]));
        let resized = shrink_to_fit(strip, 16);
        assert_eq!(resized.dimensions(), (16, 16));
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let raw = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            20,
            Rgb([0, 128, 0]),
        )));
        let normalized = normalize_bytes(&raw, &ImageOptions::default()).unwrap();
        assert_eq!((normalized.width, normalized.height), (40, 20));
        assert_eq!(normalized.quality, 30);
    }

    #[test]
    fn test_alpha_channel_is_dropped() {
        let raw = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            8,
            8,
            Rgba([255, 0, 0, 64]),
        )));
        let normalized = normalize_bytes(&raw, &ImageOptions::default()).unwrap();
        let reloaded = image::load_from_memory(&normalized.bytes).unwrap();
        assert!(!reloaded.color().has_alpha());
    }

    #[test]
    fn test_empty_input_is_decode_error() {
        let result = normalize_bytes(&[], &ImageOptions::default());
        assert!(matches!(result, Err(DishcoveryError::Decode(_))));
    }

    #[test]
    fn test_garbage_input_is_decode_error() {
        let result = normalize_bytes(b"definitely not an image", &ImageOptions::default());
        assert!(matches!(result, Err(DishcoveryError::Decode(_))));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let raw = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let options = ImageOptions {
            min_quality: 50,
            ..ImageOptions::default()
        };
        assert!(matches!(
            normalize_bytes(&raw, &options),
            Err(DishcoveryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reader_is_rewound() {
        let raw = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let mut cursor = Cursor::new(raw);
        let mut partial = [0u8; 16];
        cursor.read_exact(&mut partial).unwrap();

        let normalized = normalize(cursor, &ImageOptions::default()).unwrap();
        assert_eq!(normalized.dimensions(), (4, 4));
    }

    #[test]
    fn test_parse_data_url_valid() {
        let (mime, bytes) = parse_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_parse_data_url_invalid() {
        assert!(parse_data_url("https://example.com/a.jpg").is_err());
        assert!(parse_data_url("data:image/jpeg,plain").is_err());
        assert!(parse_data_url("data:image/jpeg;base64,@@@").is_err());
    }

    #[test]
    fn test_data_url_prefix() {
        let img = NormalizedImage::from_jpeg(b"rawbytes".to_vec(), 30, (1, 1));
        assert!(img.to_data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(img.len(), 8);
        assert_eq!(img.bytes(), b"rawbytes");
        assert_eq!(img.mime_type(), JPEG_MIME);
        assert_eq!(img.quality(), 30);
        assert_eq!(img.dimensions(), (1, 1));
    }

    #[test]
    fn test_split_data_url_keeps_payload_encoded() {
        let img = NormalizedImage::from_jpeg(b"hello".to_vec(), 30, (1, 1));
        let url = img.to_data_url();
        let (mime, payload) = split_data_url(&url).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(payload, "aGVsbG8=");
        assert_eq!(payload, img.to_base64());
    }

    #[test]
    fn test_split_data_url_invalid() {
        assert!(split_data_url("https://example.com/a.jpg").is_err());
        assert!(split_data_url("data:image/jpeg,plain").is_err());
        assert!(split_data_url("data:image/jpeg;base64,").is_err());
    }
}
