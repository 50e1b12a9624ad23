use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, builder::ValueHint};
use hdrgain::Adjustments;

/// Command-line arguments for hdrgain-bake.
#[derive(Parser, Debug)]
#[command(
    name = "hdrgain-bake",
    about = "Tone map Radiance HDR images into JPEGs with an embedded gain map.",
    author,
    version,
    arg_required_else_help = true,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub bake: BakeArgs,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    /// Without a subcommand the top-level arguments mean `bake`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Bake(self.bake))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert HDR files (or a directory of them) into gain map JPEGs
    Bake(BakeArgs),
    /// Render a 512 px high preview of a conversion
    Preview(PreviewArgs),
    /// Show the gain map metadata of a JPEG
    Probe(ProbeArgs),
    /// Convert every TIFF in a directory to PNG
    Tiff2png(Tiff2PngArgs),
    /// Resize every JPEG/PNG/GIF in a directory in place
    Resize(ResizeArgs),
    /// Encode HDR files (or a directory of them) as HDR10 AVIF
    #[cfg(feature = "avif")]
    Avif(AvifArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BakeArgs {
    /// Radiance HDR file, or a directory searched recursively for *.hdr
    #[arg(value_name = "INPUT", value_hint = ValueHint::AnyPath)]
    pub input: Option<PathBuf>,

    /// Output JPEG, or a directory (trailing separator, existing directory, or directory input)
    #[arg(value_name = "OUTPUT", value_hint = ValueHint::AnyPath)]
    pub output: Option<PathBuf>,

    /// JPEG quality for the SDR image and the gain map (1-100)
    #[arg(
        long,
        short = 'q',
        alias = "base-q",
        default_value_t = hdrgain::DEFAULT_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub quality: u8,

    /// JPEG quality for the gain map alone (1-100) [default: --quality]
    #[arg(
        long = "gm-q",
        alias = "gainmap-q",
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub gainmap_quality: Option<u8>,

    /// Gain map scale factor (each side divided by this)
    #[arg(
        long = "scale",
        default_value_t = hdrgain::DEFAULT_GAINMAP_SCALE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub gainmap_scale: u32,

    #[command(flatten)]
    pub adjust: AdjustArgs,

    /// Upper bound on the HDR/SDR luminance ratio
    #[arg(
        long = "max-gain-ratio",
        value_name = "RATIO",
        default_value_t = hdrgain::DEFAULT_MAX_GAIN_RATIO
    )]
    pub max_gain_ratio: f32,

    /// Do not bound the HDR/SDR luminance ratio
    #[arg(long, conflicts_with = "max_gain_ratio")]
    pub unclipped: bool,

    /// Write <stem>_sdr.jpg and <stem>_gain_map.jpg instead of one container JPEG
    #[arg(long)]
    pub siblings: bool,

    /// Replace outputs that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Worker threads for directory inputs (default: one per core)
    #[arg(long, short = 'j', value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,
}

impl BakeArgs {
    pub fn gainmap_quality(&self) -> u8 {
        self.gainmap_quality.unwrap_or(self.quality)
    }

    pub fn max_gain_ratio(&self) -> Option<f32> {
        (!self.unclipped).then_some(self.max_gain_ratio)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AdjustArgs {
    /// Contrast; the tone curve exponent is 1/contrast (> 0)
    #[arg(long, default_value_t = 1.0)]
    pub contrast: f32,

    /// Exposure compensation in stops
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub exposure: f32,

    /// Saturation multiplier (>= 0)
    #[arg(long, default_value_t = 1.0)]
    pub saturation: f32,
}

impl AdjustArgs {
    pub fn to_adjustments(&self) -> Adjustments {
        Adjustments {
            contrast: self.contrast,
            exposure: self.exposure,
            saturation: self.saturation,
        }
    }
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Radiance HDR file
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output image (format from extension, e.g. .png or .jpg)
    #[arg(value_name = "OUTPUT", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Brighten the preview by the gain map to visualize HDR headroom
    #[arg(long = "hdr-visualized")]
    pub hdr_visualized: bool,

    #[command(flatten)]
    pub adjust: AdjustArgs,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// JPEG to inspect
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct Tiff2PngArgs {
    /// Directory holding *.tif / *.tiff files
    #[arg(value_name = "SRC_DIR", value_hint = ValueHint::DirPath)]
    pub src: PathBuf,

    /// Directory for the PNG files (created if missing)
    #[arg(value_name = "DST_DIR", value_hint = ValueHint::DirPath)]
    pub dst: PathBuf,

    /// Replace PNGs that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Worker threads (default: one per core)
    #[arg(long, short = 'j', value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ResizeArgs {
    /// Directory holding the images to resize
    #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub dir: PathBuf,

    /// New size as a percentage of the old one
    #[arg(value_name = "PERCENT", value_parser = clap::value_parser!(u32).range(1..))]
    pub percent: u32,

    /// Confirm that files are overwritten in place
    #[arg(long)]
    pub yes: bool,

    /// Worker threads (default: one per core)
    #[arg(long, short = 'j', value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,
}

#[cfg(feature = "avif")]
#[derive(Args, Debug)]
pub struct AvifArgs {
    /// Radiance HDR file, or a directory searched recursively for *.hdr
    #[arg(value_name = "INPUT", value_hint = ValueHint::AnyPath)]
    pub input: PathBuf,

    /// Output AVIF, or a directory mirroring the input tree
    #[arg(value_name = "OUTPUT", value_hint = ValueHint::AnyPath)]
    pub output: PathBuf,

    /// Quantizer-style quality, 0 (best) to 63
    #[arg(
        long,
        short = 'q',
        default_value_t = hdrgain::DEFAULT_AVIF_QUALITY,
        value_parser = clap::value_parser!(u8).range(0..=63)
    )]
    pub quality: u8,

    /// Encoder speed, 0 (slowest) to 10
    #[arg(
        long,
        short = 's',
        default_value_t = hdrgain::DEFAULT_AVIF_SPEED,
        value_parser = clap::value_parser!(u8).range(0..=10)
    )]
    pub speed: u8,

    /// Bits per sample
    #[arg(
        long,
        short = 'd',
        default_value_t = hdrgain::DEFAULT_AVIF_BIT_DEPTH,
        value_parser = parse_bit_depth
    )]
    pub depth: u8,

    /// Chroma subsampling: 444, 422 or 420
    #[arg(long = "yuv-format", alias = "yuv_format", default_value = "444")]
    pub yuv_format: hdrgain::ChromaSubsampling,

    /// Maximum content light level in nits (needs --max-fall)
    #[arg(long = "max-cll", alias = "max_cll")]
    pub max_cll: Option<u16>,

    /// Maximum frame-average light level in nits (needs --max-cll)
    #[arg(long = "max-fall", alias = "max_fall")]
    pub max_fall: Option<u16>,

    /// Nits that linear 1.0 maps to
    #[arg(long = "sdr-white", default_value_t = hdrgain::DEFAULT_SDR_WHITE_NITS)]
    pub sdr_white: f32,

    /// Replace outputs that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Worker threads for directory inputs (default: one per core)
    #[arg(long, short = 'j', value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,
}

#[cfg(feature = "avif")]
fn parse_bit_depth(s: &str) -> Result<u8, String> {
    match s.parse::<u8>() {
        Ok(depth @ (8 | 10 | 12)) => Ok(depth),
        _ => Err(format!("expected 8, 10 or 12, got {s}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bake_args(argv: &[&str]) -> BakeArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.into_command() {
            Command::Bake(args) => args,
            other => panic!("expected bake, got {other:?}"),
        }
    }

    #[test]
    fn gain_map_quality_follows_quality() {
        let args = bake_args(&["hdrgain-bake", "in.hdr", "out.jpg", "--quality", "40"]);
        assert_eq!(args.quality, 40);
        assert_eq!(args.gainmap_quality(), 40);

        let args = bake_args(&[
            "hdrgain-bake",
            "bake",
            "in.hdr",
            "out.jpg",
            "-q",
            "40",
            "--gm-q",
            "90",
        ]);
        assert_eq!(args.gainmap_quality(), 90);

        let args = bake_args(&["hdrgain-bake", "in.hdr", "out.jpg"]);
        assert_eq!(args.gainmap_quality(), hdrgain::DEFAULT_QUALITY);
    }

    #[test]
    fn unclipped_drops_the_ratio() {
        let args = bake_args(&["hdrgain-bake", "in.hdr", "out.jpg", "--unclipped"]);
        assert_eq!(args.max_gain_ratio(), None);
        let args = bake_args(&["hdrgain-bake", "in.hdr", "out.jpg", "--max-gain-ratio", "8"]);
        assert_eq!(args.max_gain_ratio(), Some(8.0));
    }

    #[cfg(feature = "avif")]
    #[test]
    fn avif_defaults_and_bit_depths() {
        let parse = |argv: &[&str]| match Cli::try_parse_from(argv).map(Cli::into_command) {
            Ok(Command::Avif(args)) => Ok(args),
            Ok(other) => panic!("expected avif, got {other:?}"),
            Err(e) => Err(e),
        };
        let args = parse(&["hdrgain-bake", "avif", "in.hdr", "out.avif"]).unwrap();
        assert_eq!(args.quality, hdrgain::DEFAULT_AVIF_QUALITY);
        assert_eq!(args.depth, 10);
        assert_eq!(args.yuv_format, hdrgain::ChromaSubsampling::Yuv444);

        let args = parse(&["hdrgain-bake", "avif", "a", "b", "-d", "12", "--yuv_format", "420"])
            .unwrap();
        assert_eq!(args.depth, 12);
        assert_eq!(args.yuv_format, hdrgain::ChromaSubsampling::Yuv420);

        assert!(parse(&["hdrgain-bake", "avif", "a", "b", "-d", "9"]).is_err());
        assert!(parse(&["hdrgain-bake", "avif", "a", "b", "-q", "64"]).is_err());
    }
}
