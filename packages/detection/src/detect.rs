//! The classification decision.

use std::path::Path;

use image::{imageops, imageops::FilterType, RgbImage};
use tracing::debug;

use crate::blob::find_blobs;
use crate::config::DetectConfig;
use crate::error::Result;
use crate::mask::{close, open, purple_mask, Mask};

// Shape bounds for the largest blob. The open interval on solidity
// rejects both very irregular noise and perfectly convex regions such
// as painted walls; the aspect window rejects extreme slivers.
const SOLIDITY_MIN: f32 = 0.3;
const SOLIDITY_MAX: f32 = 0.98;
const ASPECT_MIN: f32 = 0.2;
const ASPECT_MAX: f32 = 3.0;

/// Classify an image file on disk.
///
/// Returns an error only when the file cannot be read or decoded;
/// callers treat that as a negative classification.
pub fn detect_purple_blob(path: impl AsRef<Path>, config: &DetectConfig) -> Result<bool> {
    let bytes = std::fs::read(path.as_ref())?;
    let img = image::load_from_memory(&bytes)?.to_rgb8();
    Ok(detect_in_image(&img, config))
}

/// Classify a decoded image.
pub fn detect_in_image(img: &RgbImage, config: &DetectConfig) -> bool {
    let img = downscale(img, config.max_dimension);
    let mask = close(&open(&purple_mask(&img)));
    classify_mask(&mask, config.min_area)
}

/// Decide on a cleaned mask: largest blob, area threshold, solidity
/// and aspect bounds.
pub(crate) fn classify_mask(mask: &Mask, min_area: u32) -> bool {
    let blobs = find_blobs(mask);
    let Some(largest) = blobs.iter().max_by_key(|b| b.area) else {
        return false;
    };
    if largest.area < min_area {
        return false;
    }

    let solidity = largest.solidity();
    let aspect = largest.aspect();
    let hit = solidity > SOLIDITY_MIN
        && solidity < SOLIDITY_MAX
        && aspect > ASPECT_MIN
        && aspect < ASPECT_MAX;

    debug!(
        area = largest.area,
        solidity = solidity,
        aspect = aspect,
        hit = hit,
        "largest purple blob"
    );
    hit
}

fn downscale(img: &RgbImage, max_dimension: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let longer = w.max(h);
    if longer <= max_dimension {
        return img.clone();
    }
    let scale = max_dimension as f32 / longer as f32;
    let nw = ((w as f32 * scale).round() as u32).max(1);
    let nh = ((h as f32 * scale).round() as u32).max(1);
    imageops::resize(img, nw, nh, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectError;
    use image::Rgb;
    use std::io::Write;

    const PURPLE: Rgb<u8> = Rgb([170, 120, 220]);
    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    fn paint_rect(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, color);
            }
        }
    }

    fn mask_with_plus(width: u32, height: u32) -> Mask {
        // Area exactly 2000, solidity ~0.75, aspect 1.0
        let mut mask = Mask::new(width, height);
        for y in 40..60 {
            for x in 20..80 {
                mask.set(x, y, true);
            }
        }
        for y in 20..80 {
            for x in 40..60 {
                mask.set(x, y, true);
            }
        }
        mask
    }

    #[test]
    fn test_blank_image_is_negative() {
        let img = RgbImage::from_pixel(200, 200, GRAY);
        assert!(!detect_in_image(&img, &DetectConfig::default()));
    }

    #[test]
    fn test_purple_rectangle_is_rejected() {
        // In-range hue, area 2700, but solidity ~1.0 and aspect 3.0
        // both land outside the shape bounds.
        let mut img = RgbImage::from_pixel(200, 200, GRAY);
        paint_rect(&mut img, 50, 80, 90, 30, PURPLE);
        assert!(!detect_in_image(&img, &DetectConfig::default()));
    }

    #[test]
    fn test_irregular_purple_blob_is_detected() {
        // Plus shape: area 2000, solidity ~0.75, aspect 1.0
        let mut img = RgbImage::from_pixel(200, 200, GRAY);
        paint_rect(&mut img, 50, 90, 100, 20, PURPLE);
        paint_rect(&mut img, 90, 50, 20, 100, PURPLE);
        assert!(detect_in_image(&img, &DetectConfig::default()));
    }

    #[test]
    fn test_small_fleck_is_rejected() {
        let mut img = RgbImage::from_pixel(200, 200, GRAY);
        paint_rect(&mut img, 10, 10, 8, 8, PURPLE);
        assert!(!detect_in_image(&img, &DetectConfig::default()));
    }

    #[test]
    fn test_area_threshold_boundary() {
        let mask = mask_with_plus(120, 120);
        // Exactly at the threshold: positive
        assert!(classify_mask(&mask, 2000));
        // One above the blob's area: negative
        assert!(!classify_mask(&mask, 2001));
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let img = RgbImage::from_pixel(1600, 800, GRAY);
        let small = downscale(&img, 500);
        assert_eq!(small.dimensions(), (500, 250));
    }

    #[test]
    fn test_undecodable_file_is_a_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not an image at all").unwrap();
        let result = detect_purple_blob(file.path(), &DetectConfig::default());
        assert!(matches!(result, Err(DetectError::Decode(_))));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = detect_purple_blob(dir.path().join("nope.jpg"), &DetectConfig::default());
        assert!(matches!(result, Err(DetectError::Io(_))));
    }
}
