use image::{GrayImage, Luma, Rgb32FImage, RgbImage};

use crate::color::{luminance, srgb_oetf};
use crate::error::{Error, Result};

/// Linear-light RGB triple.
pub type Rgb = [f32; 3];

/// Which of the two JPEGs a quality setting applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImgLabel {
    /// The SDR base rendition (primary image).
    Base,
    /// The gain map (secondary image).
    GainMap,
}

/// Linear HDR radiance image. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl HdrImage {
    /// Wrap a row-major pixel buffer. Values must be finite and non-negative.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgb>) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(Error::invalid_param(format!(
                "pixel buffer holds {} pixels, {}x{} needs {}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        if pixels.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::invalid_param(
                "HDR samples must be finite and non-negative",
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb) -> Result<Self> {
        let mut pixels = Vec::with_capacity(pixel_count(width, height)?);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    /// Convert a decoded float buffer, replacing negative and non-finite samples with zero.
    pub fn from_rgb32f(img: &Rgb32FImage) -> Self {
        let (width, height) = img.dimensions();
        let mut replaced = 0usize;
        let pixels = img
            .pixels()
            .map(|p| {
                p.0.map(|v| {
                    if v.is_finite() && v >= 0.0 {
                        v
                    } else {
                        replaced += 1;
                        0.0
                    }
                })
            })
            .collect();
        if replaced > 0 {
            log::warn!("replaced {replaced} negative or non-finite samples with zero");
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn to_rgb32f(&self) -> Rgb32FImage {
        Rgb32FImage::from_fn(self.width, self.height, |x, y| {
            image::Rgb(self.pixels[self.index(x, y)])
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<Rgb>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Luminance statistics, used for diagnostics.
    pub fn stats(&self) -> HdrStats {
        let mut min = f32::INFINITY;
        let mut max = 0.0f32;
        let mut sum = 0.0f64;
        for px in &self.pixels {
            let l = luminance(*px);
            min = min.min(l);
            max = max.max(l);
            sum += l as f64;
        }
        if self.pixels.is_empty() {
            min = 0.0;
        }
        HdrStats {
            min_luminance: min,
            max_luminance: max,
            mean_luminance: (sum / self.pixels.len().max(1) as f64) as f32,
        }
    }
}

/// Luminance summary of an [`HdrImage`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HdrStats {
    pub min_luminance: f32,
    pub max_luminance: f32,
    pub mean_luminance: f32,
}

/// Tone-mapped image: linear RGB with luminance in `[0, 1)`, not yet gamma
/// encoded. Saturated channels may exceed 1 until quantized.
#[derive(Debug, Clone, PartialEq)]
pub struct SdrImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl SdrImage {
    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<Rgb>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Gamma-encode with the sRGB transfer function and quantize to 8 bits.
    ///
    /// This is the only path from linear SDR to display values, so the
    /// transfer function cannot be applied twice.
    pub fn to_srgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let px = self.pixels[y as usize * self.width as usize + x as usize];
            image::Rgb(px.map(|c| quantize(srgb_oetf(c))))
        })
    }
}

/// Single-channel gain map with values normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GainMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl GainMap {
    pub(crate) fn from_parts(width: u32, height: u32, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), width as usize * height as usize);
        Self {
            width,
            height,
            values,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Quantize to an 8-bit grayscale image (linear, gamma 1.0).
    pub fn to_luma8(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| Luma([quantize(self.get(x, y))]))
    }
}

/// Numbers needed to invert the gain map normalization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GainMapMetadata {
    /// log2 gain that a normalized value of 1.0 stands for.
    pub gain_map_max_log2: f32,
    /// Headroom of the HDR rendition in stops; equal to `gain_map_max_log2`.
    pub hdr_capacity_max: f32,
}

impl GainMapMetadata {
    pub const VERSION: &'static str = "1.0";
    pub const GAIN_MAP_MIN: f32 = 0.0;
    pub const GAMMA: f32 = 1.0;
    pub const OFFSET_SDR: f32 = 0.0;
    pub const OFFSET_HDR: f32 = 0.0;
    pub const HDR_CAPACITY_MIN: f32 = 0.0;

    pub fn from_max_log2(gain_map_max_log2: f32) -> Self {
        Self {
            gain_map_max_log2,
            hdr_capacity_max: gain_map_max_log2,
        }
    }

    /// Largest linear boost the map encodes.
    pub fn max_content_boost(&self) -> f32 {
        self.gain_map_max_log2.exp2()
    }
}

/// User adjustments applied in linear light before tone mapping.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Adjustments {
    /// Power-curve contrast; the curve exponent is `1 / contrast`.
    pub contrast: f32,
    /// Exposure compensation in stops.
    pub exposure: f32,
    /// HSV saturation multiplier.
    pub saturation: f32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            exposure: 0.0,
            saturation: 1.0,
        }
    }
}

impl Adjustments {
    pub fn validate(&self) -> Result<()> {
        if !self.contrast.is_finite() || self.contrast <= 0.0 {
            return Err(Error::invalid_param(format!(
                "contrast must be a positive number, got {}",
                self.contrast
            )));
        }
        if !self.exposure.is_finite() {
            return Err(Error::invalid_param(format!(
                "exposure must be finite, got {}",
                self.exposure
            )));
        }
        if !self.saturation.is_finite() || self.saturation < 0.0 {
            return Err(Error::invalid_param(format!(
                "saturation must be non-negative, got {}",
                self.saturation
            )));
        }
        Ok(())
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything the pipeline derives from one HDR image.
#[derive(Debug, Clone)]
pub struct Rendition {
    pub sdr: SdrImage,
    pub gain_map: GainMap,
    pub metadata: GainMapMetadata,
}

pub(crate) fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub(crate) fn pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| Error::invalid_param("image dimensions overflow"))
}

/// Apply `f` to every element, in parallel when the `rayon` feature is on.
pub(crate) fn map_pixels<T, U, F>(src: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        src.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        src.iter().map(f).collect()
    }
}

/// Pairwise variant of [`map_pixels`]; both slices must have the same length.
pub(crate) fn zip_pixels<A, B, U, F>(a: &[A], b: &[B], f: F) -> Vec<U>
where
    A: Sync,
    B: Sync,
    U: Send,
    F: Fn(&A, &B) -> U + Sync + Send,
{
    debug_assert_eq!(a.len(), b.len());
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        a.par_iter().zip(b.par_iter()).map(|(x, y)| f(x, y)).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        a.iter().zip(b.iter()).map(|(x, y)| f(x, y)).collect()
    }
}
