use base64::{engine::general_purpose::STANDARD, Engine as _};
use dishcovery::{normalize, normalize_bytes, parse_data_url, DishcoveryError, ImageOptions};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn jpeg_bytes(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(img)
        .unwrap();
    out
}

fn png_bytes(img: RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Deterministic high-entropy image that compresses badly.
fn noise_image(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x1234_5678;
    RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        };
        Rgb([next(), next(), next()])
    })
}

#[test]
fn test_large_red_jpeg_scenario() {
    let red = RgbImage::from_pixel(3000, 3000, Rgb([255, 0, 0]));
    let raw = jpeg_bytes(&red, 90);

    let options = ImageOptions {
        max_dimension: Some(256),
        initial_quality: 30,
        byte_ceiling: Some(40_000),
        ..ImageOptions::default()
    };
    let normalized = normalize_bytes(&raw, &options).unwrap();

    let data_url = normalized.to_data_url();
    assert!(data_url.starts_with("data:image/jpeg;base64,"));

    let (mime, payload) = parse_data_url(&data_url).unwrap();
    assert_eq!(mime, "image/jpeg");
    assert!(payload.len() <= 40_000);

    let decoded = image::load_from_memory(&payload).unwrap();
    assert!(decoded.width() <= 256 && decoded.height() <= 256);
    assert_eq!((decoded.width(), decoded.height()), (256, 256));
}

#[test]
fn test_aspect_ratio_preserved() {
    let raw = png_bytes(RgbImage::from_pixel(1200, 600, Rgb([200, 180, 20])));
    let normalized = normalize_bytes(&raw, &ImageOptions::default()).unwrap();
    assert_eq!(normalized.dimensions(), (256, 128));
}

#[test]
fn test_quality_steps_down_to_floor() {
    let raw = png_bytes(noise_image(128, 128));
    let options = ImageOptions {
        max_dimension: None,
        byte_ceiling: Some(1),
        ..ImageOptions::default()
    };

    // Impossible ceiling: the loop has to stop at the floor and accept the result
    let normalized = normalize_bytes(&raw, &options).unwrap();
    assert_eq!(normalized.quality(), options.min_quality);
    assert!(normalized.len() > 1);
}

#[test]
fn test_ceiling_or_floor_holds() {
    let raw = png_bytes(noise_image(200, 150));
    for ceiling in [2_000, 8_000, 20_000, 60_000] {
        let options = ImageOptions {
            byte_ceiling: Some(ceiling),
            ..ImageOptions::default()
        };
        let normalized = normalize_bytes(&raw, &options).unwrap();
        assert!(
            normalized.len() <= ceiling || normalized.quality() == options.min_quality,
            "ceiling {} gave {} bytes at quality {}",
            ceiling,
            normalized.len(),
            normalized.quality()
        );
        let steps_taken =
            ((options.initial_quality - normalized.quality()) / options.quality_step) as usize + 1;
        assert!(steps_taken <= options.max_iterations());
    }
}

#[test]
fn test_no_ceiling_keeps_initial_quality() {
    let raw = png_bytes(noise_image(128, 128));
    let options = ImageOptions {
        byte_ceiling: None,
        ..ImageOptions::default()
    };
    let normalized = normalize_bytes(&raw, &options).unwrap();
    assert_eq!(normalized.quality(), 30);
}

#[test]
fn test_normalize_is_deterministic() {
    let raw = png_bytes(noise_image(300, 200));
    let options = ImageOptions::default();

    let first = normalize_bytes(&raw, &options).unwrap();
    let second = normalize(Cursor::new(raw.clone()), &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_data_url(), second.to_data_url());
}

#[test]
fn test_base64_payload_decodes_to_image() {
    let raw = png_bytes(noise_image(64, 48));
    let normalized = normalize_bytes(&raw, &ImageOptions::default()).unwrap();

    let bytes = STANDARD.decode(normalized.to_base64()).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
}

#[test]
fn test_truncated_jpeg_is_decode_error() {
    let raw = jpeg_bytes(&RgbImage::from_pixel(32, 32, Rgb([1, 2, 3])), 80);
    let result = normalize_bytes(&raw[..20], &ImageOptions::default());
    assert!(matches!(result, Err(DishcoveryError::Decode(_))));
}
