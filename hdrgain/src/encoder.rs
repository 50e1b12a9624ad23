use image::{GrayImage, RgbImage};
use jpeg_encoder::ColorType;

use crate::container::EncodedImage;
use crate::error::{Error, Result};
use crate::gainmap::GainMapConfig;
use crate::pipeline::render;
use crate::types::{Adjustments, HdrImage, ImgLabel, Rendition};

/// JPEG quality used for both images unless overridden.
pub const DEFAULT_QUALITY: u8 = 95;
/// Gain map resolution divisor unless overridden.
pub const DEFAULT_GAINMAP_SCALE: u32 = 2;

/// Turns an [`HdrImage`] into an SDR JPEG and a gain map JPEG.
#[derive(Debug, Clone)]
pub struct Encoder {
    adjustments: Adjustments,
    base_quality: u8,
    gainmap_quality: u8,
    gainmap_scale: u32,
    gain_map: GainMapConfig,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            adjustments: Adjustments::default(),
            base_quality: DEFAULT_QUALITY,
            gainmap_quality: DEFAULT_QUALITY,
            gainmap_scale: DEFAULT_GAINMAP_SCALE,
            gain_map: GainMapConfig::default(),
        }
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_adjustments(&mut self, adjustments: Adjustments) -> Result<()> {
        adjustments.validate()?;
        self.adjustments = adjustments;
        Ok(())
    }

    pub fn set_quality(&mut self, quality: u8, label: ImgLabel) -> Result<()> {
        if !(1..=100).contains(&quality) {
            return Err(Error::invalid_param(format!(
                "quality must be within 1..=100, got {quality}"
            )));
        }
        match label {
            ImgLabel::Base => self.base_quality = quality,
            ImgLabel::GainMap => self.gainmap_quality = quality,
        }
        Ok(())
    }

    pub fn set_gainmap_scale_factor(&mut self, factor: u32) -> Result<()> {
        if factor == 0 {
            return Err(Error::invalid_param("gain map scale factor must be >= 1"));
        }
        self.gainmap_scale = factor;
        Ok(())
    }

    pub fn set_max_gain_ratio(&mut self, ratio: Option<f32>) -> Result<()> {
        let config = GainMapConfig {
            max_gain_ratio: ratio,
        };
        config.validate()?;
        self.gain_map = config;
        Ok(())
    }

    pub fn adjustments(&self) -> &Adjustments {
        &self.adjustments
    }

    pub fn quality(&self, label: ImgLabel) -> u8 {
        match label {
            ImgLabel::Base => self.base_quality,
            ImgLabel::GainMap => self.gainmap_quality,
        }
    }

    pub fn gainmap_scale_factor(&self) -> u32 {
        self.gainmap_scale
    }

    pub fn gain_map_config(&self) -> &GainMapConfig {
        &self.gain_map
    }

    /// Run the pipeline without compressing anything.
    pub fn render(&self, hdr: &HdrImage) -> Result<Rendition> {
        render(hdr, &self.adjustments, &self.gain_map)
    }

    /// Compress a rendition: sRGB SDR JPEG plus a downsampled grayscale gain map JPEG.
    pub fn encode_rendition(&self, rendition: &Rendition) -> Result<EncodedImage> {
        let sdr_jpeg = encode_rgb_jpeg(&rendition.sdr.to_srgb8(), self.base_quality)?;
        let gain_map = rendition.gain_map.downsample(self.gainmap_scale)?;
        let gainmap_jpeg = encode_luma_jpeg(&gain_map.to_luma8(), self.gainmap_quality)?;
        log::debug!(
            "encoded SDR {} bytes, gain map {}x{} {} bytes",
            sdr_jpeg.len(),
            gain_map.width(),
            gain_map.height(),
            gainmap_jpeg.len()
        );
        Ok(EncodedImage {
            sdr_jpeg,
            gainmap_jpeg,
            metadata: rendition.metadata,
        })
    }

    pub fn encode(&self, hdr: &HdrImage) -> Result<EncodedImage> {
        let rendition = self.render(hdr)?;
        self.encode_rendition(&rendition)
    }
}

fn jpeg_dims(width: u32, height: u32) -> Result<(u16, u16)> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(Error::invalid_param(format!(
            "{width}x{height} exceeds the JPEG limit of 65535 pixels per side"
        ))),
    }
}

pub fn encode_rgb_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = jpeg_dims(img.width(), img.height())?;
    let mut out = Vec::new();
    jpeg_encoder::Encoder::new(&mut out, quality).encode(img.as_raw(), w, h, ColorType::Rgb)?;
    Ok(out)
}

pub fn encode_luma_jpeg(img: &GrayImage, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = jpeg_dims(img.width(), img.height())?;
    let mut out = Vec::new();
    jpeg_encoder::Encoder::new(&mut out, quality).encode(img.as_raw(), w, h, ColorType::Luma)?;
    Ok(out)
}
