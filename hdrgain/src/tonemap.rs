//! Global Reinhard tone mapping.

use crate::color::luminance;
use crate::types::{HdrImage, Rgb, SdrImage, map_pixels};

/// Compress luminance with `L / (1 + L)`.
#[inline]
pub fn reinhard_luminance(l: f32) -> f32 {
    l / (1.0 + l)
}

/// Tone map a pixel by scaling all channels with the luminance ratio, which
/// keeps chromaticity.
#[inline]
pub fn reinhard_pixel(px: Rgb) -> Rgb {
    let l_in = luminance(px);
    let scale = if l_in > 0.0 {
        reinhard_luminance(l_in) / l_in
    } else {
        0.0
    };
    px.map(|c| c * scale)
}

/// Map a linear HDR image into linear SDR with luminance below 1.
///
/// Saturated colors may keep a channel above 1; [`SdrImage::to_srgb8`]
/// clips those at quantization.
pub fn reinhard(hdr: &HdrImage) -> SdrImage {
    let pixels = map_pixels(hdr.pixels(), |px| reinhard_pixel(*px));
    SdrImage::from_parts(hdr.width(), hdr.height(), pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn mid_gray_compresses_to_expected_value() {
        let hdr = HdrImage::new(2, 2, vec![[0.18; 3]; 4]).unwrap();
        let sdr = reinhard(&hdr);
        for px in sdr.pixels() {
            for c in px {
                assert_abs_diff_eq!(*c, 0.18 / 1.18, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn black_stays_black() {
        assert_eq!(reinhard_pixel([0.0; 3]), [0.0; 3]);
    }

    #[test]
    fn output_luminance_is_below_one() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let px = [
                rng.gen_range(0.0..1.0e4f32),
                rng.gen_range(0.0..1.0e4f32),
                rng.gen_range(0.0..1.0e4f32),
            ];
            let l = luminance(reinhard_pixel(px));
            assert!((0.0..1.0).contains(&l), "luminance {l} for {px:?}");
        }
    }

    #[test]
    fn saturated_channels_follow_the_luminance_ratio() {
        // L = 2.126, so every channel is scaled by 1 / (1 + L).
        let out = reinhard_pixel([10.0, 0.0, 0.0]);
        assert_abs_diff_eq!(out[0], 10.0 / 3.126, epsilon = 1e-5);
        assert_abs_diff_eq!(out[0], 3.1989763, epsilon = 1e-5);
        assert_eq!(out[1], 0.0);
        assert_eq!(out[2], 0.0);
        assert_abs_diff_eq!(luminance(out), 2.126 / 3.126, epsilon = 1e-6);
    }

    #[test]
    fn saturated_channels_clip_only_when_quantized() {
        let hdr = HdrImage::new(1, 1, vec![[10.0, 0.0, 0.0]]).unwrap();
        let sdr = reinhard(&hdr);
        assert!(sdr.pixels()[0][0] > 1.0);
        assert_eq!(sdr.to_srgb8().get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn luminance_approaches_one_monotonically() {
        let mut prev = 0.0;
        for l in [0.01f32, 0.1, 1.0, 10.0, 100.0, 1000.0] {
            let out = reinhard_luminance(l);
            assert!(out > prev);
            assert!(out < 1.0);
            prev = out;
        }
        assert!(reinhard_luminance(1000.0) > 0.99);
    }

    #[test]
    fn chromaticity_is_preserved() {
        let px = [4.0, 2.0, 1.0];
        let out = reinhard_pixel(px);
        assert_abs_diff_eq!(out[0] / out[1], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out[1] / out[2], 2.0, epsilon = 1e-5);
    }
}
