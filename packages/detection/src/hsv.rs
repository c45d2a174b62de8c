//! RGB to HSV conversion.
//!
//! Uses the OpenCV 8-bit scaling (hue in 0..=180, saturation and value
//! in 0..=255), which is the scale the purple ranges in `mask` are
//! tuned against.

/// Convert an 8-bit RGB pixel to OpenCV-scaled HSV.
pub(crate) fn rgb_to_hsv(rgb: [u8; 3]) -> (u8, u8, u8) {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    (
        (h / 2.0).round().min(180.0) as u8,
        s.round().min(255.0) as u8,
        v.round().min(255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_colors() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), (0, 255, 255));
        assert_eq!(rgb_to_hsv([0, 255, 0]), (60, 255, 255));
        assert_eq!(rgb_to_hsv([0, 0, 255]), (120, 255, 255));
    }

    #[test]
    fn test_achromatic() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), (0, 0, 0));
        assert_eq!(rgb_to_hsv([255, 255, 255]), (0, 0, 255));
        let (_, s, v) = rgb_to_hsv([128, 128, 128]);
        assert_eq!(s, 0);
        assert_eq!(v, 128);
    }

    #[test]
    fn test_purple() {
        // 270 degrees of hue lands at 135 on the OpenCV scale
        let (h, s, v) = rgb_to_hsv([170, 120, 220]);
        assert_eq!(h, 135);
        assert_eq!(s, 116);
        assert_eq!(v, 220);
    }
}
