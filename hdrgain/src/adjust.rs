//! Exposure, saturation and contrast in linear light.

use crate::color::{hsv_to_rgb, rgb_to_hsv};
use crate::error::Result;
use crate::types::{Adjustments, HdrImage, Rgb, map_pixels};

/// Apply `adj` to every pixel: exposure gain, HSV saturation scale, then
/// the `1 / contrast` power curve.
pub fn apply_adjustments(hdr: &HdrImage, adj: &Adjustments) -> Result<HdrImage> {
    adj.validate()?;
    let gain = adj.exposure.exp2();
    let exponent = 1.0 / adj.contrast;
    let saturation = adj.saturation;
    let pixels = map_pixels(hdr.pixels(), |px| adjust_pixel(*px, gain, saturation, exponent));
    Ok(HdrImage::from_parts(hdr.width(), hdr.height(), pixels))
}

#[inline]
fn adjust_pixel(px: Rgb, gain: f32, saturation: f32, exponent: f32) -> Rgb {
    let exposed = px.map(|c| c * gain);
    let [h, s, v] = rgb_to_hsv(exposed);
    let saturated = hsv_to_rgb([h, (s * saturation).clamp(0.0, 1.0), v]);
    saturated.map(|c| c.max(0.0).powf(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::rgb_to_hsv;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;

    fn single(px: Rgb) -> HdrImage {
        HdrImage::new(1, 1, vec![px]).unwrap()
    }

    #[test]
    fn neutral_adjustments_keep_pixels() {
        let hdr = HdrImage::from_fn(4, 3, |x, y| [x as f32 * 0.7, y as f32 * 2.1, 0.18]).unwrap();
        let out = apply_adjustments(&hdr, &Adjustments::default()).unwrap();
        for (a, b) in out.pixels().iter().zip(hdr.pixels()) {
            for c in 0..3 {
                assert_abs_diff_eq!(a[c], b[c], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn exposure_is_in_stops() {
        let adj = Adjustments {
            exposure: 2.0,
            ..Default::default()
        };
        let out = apply_adjustments(&single([0.25, 0.5, 1.0]), &adj).unwrap();
        let px = out.pixels()[0];
        assert_abs_diff_eq!(px[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(px[2], 4.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_saturation_produces_gray() {
        let adj = Adjustments {
            saturation: 0.0,
            ..Default::default()
        };
        let out = apply_adjustments(&single([0.9, 0.3, 0.1]), &adj).unwrap();
        let px = out.pixels()[0];
        assert_abs_diff_eq!(px[0], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.9, epsilon = 1e-6);
    }

    #[test]
    fn saturation_is_clamped_after_scaling() {
        let adj = Adjustments {
            saturation: 10.0,
            ..Default::default()
        };
        let out = apply_adjustments(&single([0.8, 0.6, 0.4]), &adj).unwrap();
        let [_, s, v] = rgb_to_hsv(out.pixels()[0]);
        assert_abs_diff_eq!(s, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(v, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn contrast_is_a_power_curve() {
        let adj = Adjustments {
            contrast: 2.0,
            ..Default::default()
        };
        let out = apply_adjustments(&single([0.25, 0.25, 0.25]), &adj).unwrap();
        assert_abs_diff_eq!(out.pixels()[0][0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn non_positive_contrast_is_rejected() {
        let adj = Adjustments {
            contrast: 0.0,
            ..Default::default()
        };
        let err = apply_adjustments(&single([0.5; 3]), &adj).unwrap_err();
        assert!(matches!(err, Error::InvalidParam(_)));
    }
}
