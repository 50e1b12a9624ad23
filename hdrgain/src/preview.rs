//! Low-resolution previews for interactive tuning of [`Adjustments`].

use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::error::Result;
use crate::gainmap::GainMapConfig;
use crate::pipeline::render;
use crate::types::{Adjustments, HdrImage, Rendition, SdrImage};

/// Height of the preview buffer.
pub const PREVIEW_HEIGHT: u32 = 512;

/// Highlight boost of [`PreviewMode::HdrVisualized`].
pub const HDR_VISUALIZATION_GAIN: f32 = 5.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PreviewMode {
    /// The tone-mapped SDR rendition.
    #[default]
    Sdr,
    /// SDR brightened by the gain map so the HDR headroom is visible on an
    /// SDR display. A visualization, not an HDR rendering.
    HdrVisualized,
}

/// A full-resolution image and its preview copy. Both buffers are fixed at
/// construction; every render is a pure function of them and the request.
#[derive(Debug, Clone)]
pub struct PreviewSession {
    full: HdrImage,
    preview: HdrImage,
    gain_map: GainMapConfig,
}

impl PreviewSession {
    pub fn new(full: HdrImage) -> Result<Self> {
        Self::with_config(full, GainMapConfig::default())
    }

    pub fn with_config(full: HdrImage, gain_map: GainMapConfig) -> Result<Self> {
        gain_map.validate()?;
        let preview = downscale_to_height(&full, PREVIEW_HEIGHT);
        log::debug!(
            "preview session: full {}x{}, preview {}x{}",
            full.width(),
            full.height(),
            preview.width(),
            preview.height()
        );
        Ok(Self {
            full,
            preview,
            gain_map,
        })
    }

    pub fn full(&self) -> &HdrImage {
        &self.full
    }

    pub fn preview(&self) -> &HdrImage {
        &self.preview
    }

    pub fn render_preview(&self, adj: &Adjustments, mode: PreviewMode) -> Result<RgbImage> {
        let rendition = render(&self.preview, adj, &self.gain_map)?;
        Ok(match mode {
            PreviewMode::Sdr => rendition.sdr.to_srgb8(),
            PreviewMode::HdrVisualized => visualize_hdr(&rendition).to_srgb8(),
        })
    }

    pub fn render_full(&self, adj: &Adjustments) -> Result<Rendition> {
        render(&self.full, adj, &self.gain_map)
    }
}

fn visualize_hdr(rendition: &Rendition) -> SdrImage {
    let sdr = &rendition.sdr;
    let pixels = sdr
        .pixels()
        .iter()
        .zip(rendition.gain_map.values())
        .map(|(px, g)| px.map(|c| (c * g * HDR_VISUALIZATION_GAIN).clamp(0.0, 1.0)))
        .collect();
    SdrImage::from_parts(sdr.width(), sdr.height(), pixels)
}

/// Shrink to `target_height` keeping the aspect ratio; never upscales.
fn downscale_to_height(full: &HdrImage, target_height: u32) -> HdrImage {
    let (width, height) = full.dimensions();
    if height <= target_height {
        return full.clone();
    }
    let new_w = ((u64::from(width) * u64::from(target_height)) / u64::from(height)).max(1) as u32;

    // Float resampling clamps to [0, 1], so resample a normalized copy.
    let peak = full.pixels().iter().flatten().copied().fold(0.0f32, f32::max);
    if peak == 0.0 {
        let len = new_w as usize * target_height as usize;
        return HdrImage::from_parts(new_w, target_height, vec![[0.0; 3]; len]);
    }
    let mut buf = full.to_rgb32f();
    buf.pixels_mut().for_each(|p| p.0 = p.0.map(|c| c / peak));
    let mut small = imageops::resize(&buf, new_w, target_height, FilterType::Triangle);
    small.pixels_mut().for_each(|p| p.0 = p.0.map(|c| c * peak));
    HdrImage::from_rgb32f(&small)
}
