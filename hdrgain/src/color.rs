//! Per-pixel color math: luminance, HSV and the sRGB transfer function.

#![allow(clippy::excessive_precision)]

use crate::types::Rgb;

/// BT.709 luminance weights.
pub const LUMA_BT709: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Relative luminance of a linear RGB triple.
#[inline]
pub fn luminance(rgb: Rgb) -> f32 {
    LUMA_BT709[0] * rgb[0] + LUMA_BT709[1] * rgb[1] + LUMA_BT709[2] * rgb[2]
}

/// sRGB OETF: linear → gamma encoded, clipped to `[0, 1]`.
#[inline]
pub fn srgb_oetf(linear: f32) -> f32 {
    let encoded = if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    encoded.clamp(0.0, 1.0)
}

/// RGB → (hue, saturation, value), hue in `[0, 1)`.
///
/// Works on unbounded linear values: value is the channel maximum and
/// saturation is relative to it.
pub fn rgb_to_hsv(rgb: Rgb) -> [f32; 3] {
    let [r, g, b] = rgb;
    let v = r.max(g).max(b);
    let delta = v - r.min(g).min(b);
    if delta == 0.0 || v == 0.0 {
        return [0.0, 0.0, v];
    }
    let s = delta / v;
    let h = if b == v {
        4.0 + (r - g) / delta
    } else if g == v {
        2.0 + (b - r) / delta
    } else {
        (g - b) / delta
    };
    [(h / 6.0).rem_euclid(1.0), s, v]
}

/// (hue, saturation, value) → RGB, inverse of [`rgb_to_hsv`].
pub fn hsv_to_rgb(hsv: [f32; 3]) -> Rgb {
    let [h, s, v] = hsv;
    let h6 = h * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    match (sector as i32).rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn luminance_weights_sum_to_one() {
        assert_abs_diff_eq!(luminance([1.0, 1.0, 1.0]), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(luminance([0.0, 1.0, 0.0]), 0.7152, epsilon = 1e-7);
    }

    #[test]
    fn srgb_oetf_segments() {
        assert_eq!(srgb_oetf(0.0), 0.0);
        assert_abs_diff_eq!(srgb_oetf(0.002), 0.002 * 12.92, epsilon = 1e-7);
        assert_abs_diff_eq!(srgb_oetf(0.18), 0.46135613, epsilon = 1e-5);
        assert_abs_diff_eq!(srgb_oetf(1.0), 1.0, epsilon = 1e-6);
        assert_eq!(srgb_oetf(4.0), 1.0);
        assert_eq!(srgb_oetf(-0.5), 0.0);
    }

    #[test]
    fn srgb_oetf_is_not_idempotent() {
        for x in [0.01f32, 0.1, 0.18, 0.5, 0.9] {
            let once = srgb_oetf(x);
            let twice = srgb_oetf(once);
            assert!((0.0..=1.0).contains(&twice));
            assert!(twice > once, "encoding {x} twice should brighten further");
        }
    }

    #[test]
    fn hsv_roundtrip() {
        let samples = [
            [0.2, 0.4, 0.8],
            [3.0, 1.0, 0.5],
            [0.5, 0.5, 0.5],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [0.1, 7.5, 0.1],
        ];
        for rgb in samples {
            let back = hsv_to_rgb(rgb_to_hsv(rgb));
            for c in 0..3 {
                assert_abs_diff_eq!(back[c], rgb[c], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn gray_has_zero_saturation() {
        let [h, s, v] = rgb_to_hsv([0.18, 0.18, 0.18]);
        assert_eq!((h, s, v), (0.0, 0.0, 0.18));
    }

    #[test]
    fn primary_hues() {
        assert_abs_diff_eq!(rgb_to_hsv([1.0, 0.0, 0.0])[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb_to_hsv([0.0, 1.0, 0.0])[0], 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb_to_hsv([0.0, 0.0, 1.0])[0], 2.0 / 3.0, epsilon = 1e-6);
    }
}
