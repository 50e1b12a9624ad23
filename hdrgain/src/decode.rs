//! Reading linear HDR images from disk.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::DynamicImage;
use image::codecs::hdr::HdrDecoder;

use crate::error::{Error, Result};
use crate::types::HdrImage;

/// One way of turning a file into an [`HdrImage`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DecodeStrategy {
    /// Strict Radiance RGBE (`.hdr`) decoder.
    Radiance,
    /// Sniff the container from its content and accept any 32-bit float RGB
    /// result, e.g. OpenEXR.
    GuessedFormat,
}

impl DecodeStrategy {
    /// Strategies tried by [`read_hdr`], in order.
    pub const ORDER: [DecodeStrategy; 2] = [Self::Radiance, Self::GuessedFormat];

    pub fn name(self) -> &'static str {
        match self {
            Self::Radiance => "radiance",
            Self::GuessedFormat => "guessed format",
        }
    }

    pub fn decode(self, path: &Path) -> Result<HdrImage> {
        let decode_err = |detail: String| Error::Decode {
            path: path.to_path_buf(),
            detail,
        };
        let img = match self {
            Self::Radiance => {
                let reader = BufReader::new(File::open(path)?);
                let decoder = HdrDecoder::new(reader).map_err(|e| decode_err(e.to_string()))?;
                DynamicImage::from_decoder(decoder).map_err(|e| decode_err(e.to_string()))?
            }
            Self::GuessedFormat => image::ImageReader::open(path)?
                .with_guessed_format()?
                .decode()
                .map_err(|e| decode_err(e.to_string()))?,
        };
        from_dynamic(img).map_err(|e| match e {
            Error::InvalidParam(detail) => decode_err(detail),
            other => other,
        })
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accept three-channel float data only.
pub fn from_dynamic(img: DynamicImage) -> Result<HdrImage> {
    match img {
        DynamicImage::ImageRgb32F(buf) => Ok(HdrImage::from_rgb32f(&buf)),
        DynamicImage::ImageRgba32F(_) => Err(Error::UnsupportedChannels(4)),
        other => Err(Error::invalid_param(format!(
            "not floating point: decoded as {:?}",
            other.color()
        ))),
    }
}

/// Decode `path` with [`DecodeStrategy::ORDER`].
pub fn read_hdr(path: impl AsRef<Path>) -> Result<HdrImage> {
    read_hdr_with(path, &DecodeStrategy::ORDER)
}

/// Try each strategy in turn; the first success wins.
///
/// When all of them fail, a channel-layout failure is reported as such,
/// anything else as [`Error::Decode`] listing every attempt.
pub fn read_hdr_with(path: impl AsRef<Path>, strategies: &[DecodeStrategy]) -> Result<HdrImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    if strategies.is_empty() {
        return Err(Error::invalid_param("no decode strategy given"));
    }

    let mut attempts = Vec::with_capacity(strategies.len());
    for &strategy in strategies {
        match strategy.decode(path) {
            Ok(hdr) => {
                let stats = hdr.stats();
                log::debug!(
                    "{}: decoded {}x{} with {strategy} (luminance min {:.4}, max {:.4}, mean {:.4})",
                    path.display(),
                    hdr.width(),
                    hdr.height(),
                    stats.min_luminance,
                    stats.max_luminance,
                    stats.mean_luminance
                );
                return Ok(hdr);
            }
            Err(e) => {
                log::debug!("{}: {strategy} decoder failed: {e}", path.display());
                attempts.push((strategy, e));
            }
        }
    }

    if let Some(channels) = attempts.iter().find_map(|(_, e)| match e {
        Error::UnsupportedChannels(n) => Some(*n),
        _ => None,
    }) {
        return Err(Error::UnsupportedChannels(channels));
    }
    let detail = attempts
        .iter()
        .map(|(strategy, e)| match e {
            Error::Decode { detail, .. } => format!("{strategy}: {detail}"),
            other => format!("{strategy}: {other}"),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::Decode {
        path: path.to_path_buf(),
        detail,
    })
}
