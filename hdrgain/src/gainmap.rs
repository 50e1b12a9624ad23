//! Luminance-ratio gain maps in log2 space.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};

use crate::color::luminance;
use crate::error::{Error, Result};
use crate::types::{GainMap, GainMapMetadata, HdrImage, SdrImage, map_pixels, zip_pixels};

/// Stand-in for an SDR luminance of exactly zero.
pub const SDR_LUMINANCE_EPSILON: f32 = 1e-6;

/// Default upper bound on the HDR/SDR luminance ratio.
pub const DEFAULT_MAX_GAIN_RATIO: f32 = 100.0;

/// Gain map computation options.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GainMapConfig {
    /// Clip ratios to `[0, max_gain_ratio]` before taking log2. `None`
    /// keeps ratios unbounded.
    pub max_gain_ratio: Option<f32>,
}

impl Default for GainMapConfig {
    fn default() -> Self {
        Self {
            max_gain_ratio: Some(DEFAULT_MAX_GAIN_RATIO),
        }
    }
}

impl GainMapConfig {
    pub fn validate(&self) -> Result<()> {
        match self.max_gain_ratio {
            Some(r) if !r.is_finite() || r < 1.0 => Err(Error::invalid_param(format!(
                "max gain ratio must be a finite number >= 1, got {r}"
            ))),
            _ => Ok(()),
        }
    }
}

/// log2 of the brightening gain from `sdr_l` to `hdr_l`; never negative.
#[inline]
pub fn log2_gain(hdr_l: f32, sdr_l: f32, max_gain_ratio: Option<f32>) -> f32 {
    let sdr_l = if sdr_l == 0.0 {
        SDR_LUMINANCE_EPSILON
    } else {
        sdr_l
    };
    let mut gain = hdr_l / sdr_l;
    if let Some(max) = max_gain_ratio {
        gain = gain.clamp(0.0, max);
    }
    gain.max(1.0).log2()
}

/// Compute the normalized gain map taking `sdr` to `hdr`.
pub fn compute_gain_map(
    hdr: &HdrImage,
    sdr: &SdrImage,
    config: &GainMapConfig,
) -> Result<(GainMap, GainMapMetadata)> {
    if hdr.dimensions() != sdr.dimensions() {
        return Err(Error::ImageSizeMismatch {
            expected: hdr.dimensions(),
            received: sdr.dimensions(),
        });
    }
    config.validate()?;

    let max_ratio = config.max_gain_ratio;
    let log2_map = zip_pixels(hdr.pixels(), sdr.pixels(), |h, s| {
        log2_gain(luminance(*h), luminance(*s), max_ratio)
    });
    let max_log2 = log2_map.iter().copied().fold(0.0f32, f32::max);

    let values = if max_log2 > 0.0 {
        map_pixels(&log2_map, |v| v / max_log2)
    } else {
        log::warn!("gain map is empty: HDR never exceeds SDR luminance");
        vec![0.0; log2_map.len()]
    };
    log::debug!(
        "gain map {}x{}: max log2 gain {max_log2:.4}",
        hdr.width(),
        hdr.height()
    );

    Ok((
        GainMap::from_parts(hdr.width(), hdr.height(), values),
        GainMapMetadata::from_max_log2(max_log2),
    ))
}

/// Recover HDR luminance from SDR luminance and a normalized gain value.
#[inline]
pub fn reconstruct_luminance(sdr_l: f32, gain: f32, gain_map_max_log2: f32) -> f32 {
    sdr_l * (gain * gain_map_max_log2).exp2()
}

impl GainMap {
    /// Shrink each dimension by `scale` (at least one pixel) with a triangle filter.
    pub fn downsample(&self, scale: u32) -> Result<GainMap> {
        if scale == 0 {
            return Err(Error::invalid_param("gain map scale factor must be >= 1"));
        }
        if scale == 1 {
            return Ok(self.clone());
        }
        let (width, height) = self.dimensions();
        let new_w = (width / scale).max(1);
        let new_h = (height / scale).max(1);
        let buf: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_raw(width, height, self.values().to_vec())
                .ok_or_else(|| Error::invalid_param("gain map buffer does not match its size"))?;
        let small = imageops::resize(&buf, new_w, new_h, FilterType::Triangle);
        let values = small.into_raw().into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
        Ok(GainMap::from_parts(new_w, new_h, values))
    }
}
