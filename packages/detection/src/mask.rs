//! Binary color mask and morphological cleanup.

use image::RgbImage;

use crate::hsv::rgb_to_hsv;

/// Inclusive HSV sub-range (OpenCV scaling).
struct HsvRange {
    h: (u8, u8),
    s: (u8, u8),
    v: (u8, u8),
}

impl HsvRange {
    fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        self.h.0 <= h
            && h <= self.h.1
            && self.s.0 <= s
            && s <= self.s.1
            && self.v.0 <= v
            && v <= self.v.1
    }
}

/// Purple/lavender sub-ranges, deep purple through very light lavender.
///
/// A single contiguous range either over- or under-captures the target
/// hue family under varying lighting, so the mask is the union of
/// several overlapping bands.
const PURPLE_RANGES: [HsvRange; 5] = [
    // Deep purple
    HsvRange { h: (130, 160), s: (20, 200), v: (100, 255) },
    // Medium purple
    HsvRange { h: (115, 140), s: (20, 180), v: (80, 255) },
    // Light purple
    HsvRange { h: (135, 165), s: (30, 255), v: (100, 255) },
    // Lavender
    HsvRange { h: (125, 145), s: (15, 100), v: (150, 255) },
    // Very light lavender
    HsvRange { h: (130, 150), s: (10, 80), v: (180, 255) },
];

/// 5x5 elliptical structuring element, as offsets from the center.
const ELLIPSE_5X5: [(i32, i32); 17] = [
    (0, -2),
    (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1),
    (-2, 0), (-1, 0), (0, 0), (1, 0), (2, 0),
    (-2, 1), (-1, 1), (0, 1), (1, 1), (2, 1),
    (0, 2),
];

/// A binary image mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; (width * height) as usize],
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    pub(crate) fn set(&mut self, x: u32, y: u32, value: bool) {
        self.bits[(y * self.width + x) as usize] = value;
    }

    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }
}

/// Build the purple mask for an image.
pub(crate) fn purple_mask(img: &RgbImage) -> Mask {
    let (width, height) = img.dimensions();
    let mut mask = Mask::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (h, s, v) = rgb_to_hsv(img.get_pixel(x, y).0);
            if PURPLE_RANGES.iter().any(|r| r.contains(h, s, v)) {
                mask.set(x, y, true);
            }
        }
    }
    mask
}

/// Morphological opening: removes small noise specks.
pub(crate) fn open(mask: &Mask) -> Mask {
    dilate(&erode(mask))
}

/// Morphological closing: fills small gaps.
pub(crate) fn close(mask: &Mask) -> Mask {
    erode(&dilate(mask))
}

fn erode(mask: &Mask) -> Mask {
    let mut out = Mask::new(mask.width, mask.height);
    for y in 0..mask.height {
        for x in 0..mask.width {
            // Offsets falling outside the image are ignored, so the
            // border behaves like replication rather than zero-padding.
            let keep = ELLIPSE_5X5.iter().all(|&(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 || nx >= mask.width as i32 || ny >= mask.height as i32 {
                    true
                } else {
                    mask.get(nx as u32, ny as u32)
                }
            });
            out.set(x, y, keep);
        }
    }
    out
}

fn dilate(mask: &Mask) -> Mask {
    let mut out = Mask::new(mask.width, mask.height);
    for y in 0..mask.height {
        for x in 0..mask.width {
            let hit = ELLIPSE_5X5.iter().any(|&(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                nx >= 0
                    && ny >= 0
                    && nx < mask.width as i32
                    && ny < mask.height as i32
                    && mask.get(nx as u32, ny as u32)
            });
            out.set(x, y, hit);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const PURPLE: [u8; 3] = [170, 120, 220];

    #[test]
    fn test_purple_mask_membership() {
        let mut img = RgbImage::from_pixel(4, 1, Rgb([128, 128, 128]));
        img.put_pixel(0, 0, Rgb(PURPLE));
        img.put_pixel(1, 0, Rgb([200, 180, 230])); // pale lavender
        img.put_pixel(2, 0, Rgb([0, 200, 0])); // green

        let mask = purple_mask(&img);
        assert!(mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(3, 0)); // gray has zero saturation
    }

    #[test]
    fn test_opening_removes_specks() {
        let mut mask = Mask::new(20, 20);
        mask.set(10, 10, true);
        mask.set(10, 11, true);
        mask.set(11, 10, true);
        assert_eq!(open(&mask).count(), 0);
    }

    #[test]
    fn test_opening_keeps_large_regions() {
        let mut mask = Mask::new(30, 30);
        for y in 5..25 {
            for x in 5..25 {
                mask.set(x, y, true);
            }
        }
        let opened = open(&mask);
        // Interior survives even if corners get rounded
        assert!(opened.get(15, 15));
        assert!(opened.count() >= 20 * 20 - 16);
    }

    #[test]
    fn test_closing_fills_holes() {
        let mut mask = Mask::new(30, 30);
        for y in 5..25 {
            for x in 5..25 {
                mask.set(x, y, true);
            }
        }
        mask.set(15, 15, false);
        mask.set(16, 15, false);
        let closed = close(&mask);
        assert!(closed.get(15, 15));
        assert!(closed.get(16, 15));
    }
}
