//! HDR10 AVIF output: PQ transfer, BT.2020 primaries and display metadata.
//!
//! Linear 1.0 is SDR white at [`AvifOptions::sdr_white_nits`]. `rav1e` codes
//! the still picture and `avif-serialize` writes the container.

use std::fmt;
use std::str::FromStr;

use avif_serialize::constants as nclx;
use rav1e::prelude::{
    ChromaSamplePosition, ChromaSampling, ChromaticityPoint, ColorDescription, ColorPrimaries,
    Config, ContentLight, Context, EncoderConfig, EncoderStatus, MatrixCoefficients,
    MasteringDisplay as Av1MasteringDisplay, Pixel, PixelRange, PixelType, SpeedSettings,
    TransferCharacteristics,
};

use crate::error::{Error, Result};
use crate::types::{HdrImage, Rgb, map_pixels};

pub const DEFAULT_AVIF_QUALITY: u8 = 25;
pub const DEFAULT_AVIF_SPEED: u8 = 4;
pub const DEFAULT_AVIF_BIT_DEPTH: u8 = 10;
/// Nits assigned to linear 1.0 (BT.2408 reference white).
pub const DEFAULT_SDR_WHITE_NITS: f32 = 203.0;

const PQ_PEAK_NITS: f32 = 10_000.0;
const MAX_AVIF_QUALITY: u8 = 63;
const MAX_AVIF_SPEED: u8 = 10;

// BT.2020 non-constant-luminance weights.
const KR: f32 = 0.2627;
const KB: f32 = 0.0593;
const KG: f32 = 1.0 - KR - KB;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ChromaSubsampling {
    #[default]
    Yuv444,
    Yuv422,
    Yuv420,
}

impl ChromaSubsampling {
    /// Horizontal and vertical chroma decimation as shifts.
    fn shifts(self) -> (u32, u32) {
        match self {
            Self::Yuv444 => (0, 0),
            Self::Yuv422 => (1, 0),
            Self::Yuv420 => (1, 1),
        }
    }

    fn av1(self) -> ChromaSampling {
        match self {
            Self::Yuv444 => ChromaSampling::Cs444,
            Self::Yuv422 => ChromaSampling::Cs422,
            Self::Yuv420 => ChromaSampling::Cs420,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yuv444 => "444",
            Self::Yuv422 => "422",
            Self::Yuv420 => "420",
        }
    }
}

impl fmt::Display for ChromaSubsampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChromaSubsampling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches("yuv") {
            "444" => Ok(Self::Yuv444),
            "422" => Ok(Self::Yuv422),
            "420" => Ok(Self::Yuv420),
            _ => Err(Error::invalid_param(format!(
                "chroma subsampling must be 444, 422 or 420, got {s:?}"
            ))),
        }
    }
}

/// Mastering display colour volume (SMPTE ST 2086), CIE 1931 xy.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MasteringDisplay {
    /// Red, green, blue.
    pub primaries: [[f32; 2]; 3],
    pub white_point: [f32; 2],
    pub max_luminance: f32,
    pub min_luminance: f32,
}

impl MasteringDisplay {
    /// P3 primaries inside the BT.2020 container, D65, 1000 / 0.0001 nits.
    pub const HDR10_1000_NITS: Self = Self {
        primaries: [[0.680, 0.320], [0.265, 0.690], [0.150, 0.060]],
        white_point: [0.3127, 0.3290],
        max_luminance: 1000.0,
        min_luminance: 0.0001,
    };

    fn av1(&self) -> Av1MasteringDisplay {
        // Chromaticity in 0.16, max luminance in 24.8, min luminance in 18.14.
        let point = |[x, y]: [f32; 2]| ChromaticityPoint {
            x: (x * 65536.0).round().clamp(0.0, 65535.0) as u16,
            y: (y * 65536.0).round().clamp(0.0, 65535.0) as u16,
        };
        Av1MasteringDisplay {
            primaries: self.primaries.map(point),
            white_point: point(self.white_point),
            max_luminance: (self.max_luminance * 256.0).round() as u32,
            min_luminance: (self.min_luminance * 16384.0).round() as u32,
        }
    }
}

impl Default for MasteringDisplay {
    fn default() -> Self {
        Self::HDR10_1000_NITS
    }
}

/// MaxCLL / MaxFALL in nits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ContentLightLevel {
    pub max_cll: u16,
    pub max_fall: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvifOptions {
    /// 0 (best) to 63.
    pub quality: u8,
    /// 0 (slowest) to 10.
    pub speed: u8,
    /// 8, 10 or 12.
    pub bit_depth: u8,
    pub subsampling: ChromaSubsampling,
    pub sdr_white_nits: f32,
    pub mastering_display: MasteringDisplay,
    pub content_light: Option<ContentLightLevel>,
}

impl Default for AvifOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_AVIF_QUALITY,
            speed: DEFAULT_AVIF_SPEED,
            bit_depth: DEFAULT_AVIF_BIT_DEPTH,
            subsampling: ChromaSubsampling::default(),
            sdr_white_nits: DEFAULT_SDR_WHITE_NITS,
            mastering_display: MasteringDisplay::default(),
            content_light: None,
        }
    }
}

impl AvifOptions {
    pub fn validate(&self) -> Result<()> {
        if self.quality > MAX_AVIF_QUALITY {
            return Err(Error::invalid_param(format!(
                "AVIF quality must be 0-{MAX_AVIF_QUALITY}, got {}",
                self.quality
            )));
        }
        if self.speed > MAX_AVIF_SPEED {
            return Err(Error::invalid_param(format!(
                "AVIF speed must be 0-{MAX_AVIF_SPEED}, got {}",
                self.speed
            )));
        }
        if !matches!(self.bit_depth, 8 | 10 | 12) {
            return Err(Error::invalid_param(format!(
                "AVIF bit depth must be 8, 10 or 12, got {}",
                self.bit_depth
            )));
        }
        if !self.sdr_white_nits.is_finite() || self.sdr_white_nits <= 0.0 {
            return Err(Error::invalid_param(format!(
                "SDR white must be a positive number of nits, got {}",
                self.sdr_white_nits
            )));
        }
        let md = &self.mastering_display;
        if !(md.min_luminance >= 0.0 && md.max_luminance > md.min_luminance) {
            return Err(Error::invalid_param(format!(
                "mastering display luminance range {}..{} is empty",
                md.min_luminance, md.max_luminance
            )));
        }
        Ok(())
    }

    /// rav1e quantizer (0-255) for the 0-63 quality scale.
    fn quantizer(&self) -> usize {
        (usize::from(self.quality) * 255 + 31) / usize::from(MAX_AVIF_QUALITY)
    }
}

/// SMPTE ST 2084 inverse EOTF: absolute luminance in nits to a `[0, 1]` signal.
pub fn pq_oetf(nits: f32) -> f32 {
    const M1: f32 = 2610.0 / 16384.0;
    const M2: f32 = 2523.0 / 4096.0 * 128.0;
    const C1: f32 = 3424.0 / 4096.0;
    const C2: f32 = 2413.0 / 4096.0 * 32.0;
    const C3: f32 = 2392.0 / 4096.0 * 32.0;

    let y = (nits / PQ_PEAK_NITS).clamp(0.0, 1.0);
    let ym = y.powf(M1);
    ((C1 + C2 * ym) / (1.0 + C3 * ym)).powf(M2)
}

/// Linear BT.709 RGB to linear BT.2020 RGB.
pub fn bt709_to_bt2020(rgb: Rgb) -> Rgb {
    const M: [[f32; 3]; 3] = [
        [0.627_404, 0.329_283, 0.043_313],
        [0.069_097, 0.919_540, 0.011_362],
        [0.016_391, 0.088_013, 0.895_595],
    ];
    M.map(|row| (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).max(0.0))
}

/// Quantized full-range Y'CbCr planes, chroma possibly decimated.
#[derive(Debug)]
struct YuvPlanes {
    width: usize,
    height: usize,
    chroma_width: usize,
    y: Vec<u16>,
    cb: Vec<u16>,
    cr: Vec<u16>,
}

fn to_yuv(hdr: &HdrImage, opts: &AvifOptions) -> YuvPlanes {
    let white = opts.sdr_white_nits;
    let ycbcr = map_pixels(hdr.pixels(), |px| {
        let [r, g, b] = bt709_to_bt2020(*px).map(|c| pq_oetf(c * white));
        let y = KR * r + KG * g + KB * b;
        [y, (b - y) / (2.0 * (1.0 - KB)), (r - y) / (2.0 * (1.0 - KR))]
    });

    let max = f32::from((1u16 << opts.bit_depth) - 1);
    let mid = f32::from(1u16 << (opts.bit_depth - 1));
    let luma = |v: f32| (v * max).round().clamp(0.0, max) as u16;
    let chroma = |v: f32| (v * max + mid).round().clamp(0.0, max) as u16;

    let (width, height) = (hdr.width() as usize, hdr.height() as usize);
    let (sx, sy) = opts.subsampling.shifts();
    let chroma_width = (width + (1 << sx) - 1) >> sx;
    let chroma_height = (height + (1 << sy) - 1) >> sy;

    let mut cb = Vec::with_capacity(chroma_width * chroma_height);
    let mut cr = Vec::with_capacity(chroma_width * chroma_height);
    for cy in 0..chroma_height {
        for cx in 0..chroma_width {
            let (mut sum_b, mut sum_r, mut n) = (0.0, 0.0, 0.0);
            for y in (cy << sy)..((cy + 1) << sy).min(height) {
                for x in (cx << sx)..((cx + 1) << sx).min(width) {
                    let [_, b, r] = ycbcr[y * width + x];
                    sum_b += b;
                    sum_r += r;
                    n += 1.0;
                }
            }
            cb.push(chroma(sum_b / n));
            cr.push(chroma(sum_r / n));
        }
    }

    YuvPlanes {
        width,
        height,
        chroma_width,
        y: ycbcr.iter().map(|p| luma(p[0])).collect(),
        cb,
        cr,
    }
}

/// Encode `hdr` as an HDR10 AVIF file.
pub fn encode_avif(hdr: &HdrImage, opts: &AvifOptions) -> Result<Vec<u8>> {
    opts.validate()?;
    if hdr.width() == 0 || hdr.height() == 0 {
        return Err(Error::invalid_param("cannot encode an empty image"));
    }

    let planes = to_yuv(hdr, opts);
    let config = encoder_config(&planes, opts);
    let av1 = if opts.bit_depth == 8 {
        encode_av1::<u8>(config, &planes)?
    } else {
        encode_av1::<u16>(config, &planes)?
    };

    let (sx, sy) = opts.subsampling.shifts();
    let mut aviffy = avif_serialize::Aviffy::new();
    aviffy
        .set_color_primaries(nclx::ColorPrimaries::Bt2020)
        .set_transfer_characteristics(nclx::TransferCharacteristics::Smpte2084)
        .set_matrix_coefficients(nclx::MatrixCoefficients::Bt2020Ncl)
        .set_full_color_range(true)
        .set_chroma_subsampling((sx == 1, sy == 1));
    let out = aviffy.to_vec(&av1, None, hdr.width(), hdr.height(), opts.bit_depth);
    log::debug!(
        "AVIF {}x{} {}-bit {}: {} bytes (AV1 payload {})",
        hdr.width(),
        hdr.height(),
        opts.bit_depth,
        opts.subsampling,
        out.len(),
        av1.len()
    );
    Ok(out)
}

fn encoder_config(planes: &YuvPlanes, opts: &AvifOptions) -> EncoderConfig {
    let quantizer = opts.quantizer();
    EncoderConfig {
        width: planes.width,
        height: planes.height,
        bit_depth: usize::from(opts.bit_depth),
        chroma_sampling: opts.subsampling.av1(),
        chroma_sample_position: ChromaSamplePosition::Unknown,
        pixel_range: PixelRange::Full,
        color_description: Some(ColorDescription {
            color_primaries: ColorPrimaries::BT2020,
            transfer_characteristics: TransferCharacteristics::SMPTE2084,
            matrix_coefficients: MatrixCoefficients::BT2020NCL,
        }),
        mastering_display: Some(opts.mastering_display.av1()),
        content_light: opts.content_light.map(|cll| ContentLight {
            max_content_light_level: cll.max_cll,
            max_frame_average_light_level: cll.max_fall,
        }),
        still_picture: true,
        quantizer,
        min_quantizer: quantizer as u8,
        speed_settings: SpeedSettings::from_preset(opts.speed),
        ..Default::default()
    }
}

fn encode_av1<P: Pixel>(config: EncoderConfig, planes: &YuvPlanes) -> Result<Vec<u8>> {
    let mut ctx: Context<P> = Config::new()
        .with_encoder_config(config)
        .new_context()
        .map_err(|e| av1_error(e))?;

    let bytewidth = match P::type_enum() {
        PixelType::U8 => 1,
        PixelType::U16 => 2,
    };
    let raw = |values: &[u16]| -> Vec<u8> {
        if bytewidth == 1 {
            values.iter().map(|v| *v as u8).collect()
        } else {
            values.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
    };

    let mut frame = ctx.new_frame();
    let sources = [
        (raw(&planes.y), planes.width),
        (raw(&planes.cb), planes.chroma_width),
        (raw(&planes.cr), planes.chroma_width),
    ];
    for (plane, (bytes, width)) in frame.planes.iter_mut().zip(&sources) {
        plane.copy_from_raw_u8(bytes, width * bytewidth, bytewidth);
    }

    ctx.send_frame(frame).map_err(|e| av1_error(e))?;
    ctx.flush();

    let mut out = Vec::new();
    loop {
        match ctx.receive_packet() {
            Ok(mut packet) => out.append(&mut packet.data),
            Err(EncoderStatus::Encoded) => continue,
            Err(EncoderStatus::LimitReached) => break,
            Err(e) => return Err(av1_error(e)),
        }
    }
    if out.is_empty() {
        return Err(Error::Encode("AV1 encoder produced no data".to_string()));
    }
    Ok(out)
}

fn av1_error(e: impl fmt::Display) -> Error {
    Error::Encode(format!("AV1 encoder: {e}"))
}
