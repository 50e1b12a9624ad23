//! Turn linear HDR images into SDR JPEGs that carry a gain map.
//!
//! The pipeline is a chain of pure stages over whole buffers:
//! - [`read_hdr`] decodes Radiance (and other float) images into an [`HdrImage`].
//! - [`apply_adjustments`] applies exposure, saturation and contrast in linear light.
//! - [`reinhard`] tone maps to an [`SdrImage`].
//! - [`compute_gain_map`] derives a normalized log2 [`GainMap`] and its
//!   [`GainMapMetadata`].
//! - [`Encoder`] compresses both renditions, and [`EncodedImage`] packages them
//!   as one JPEG with XMP (or two sibling files).
//!
//! With the `avif` feature, `encode_avif` writes the HDR image itself as a
//! PQ / BT.2020 AVIF instead.
//!
//! [`PreviewSession`] wraps the same pipeline for low-resolution tuning, and
//! [`plan_jobs`]/[`run_jobs`] drive batch conversions. The command-line front
//! end lives in the companion `hdrgain-bake` package.

mod adjust;
#[cfg(feature = "avif")]
mod avif;
mod batch;
mod color;
mod container;
mod decode;
mod encoder;
mod error;
mod gainmap;
mod pipeline;
mod preview;
mod tonemap;
mod types;
pub mod xmp;

pub use adjust::apply_adjustments;
#[cfg(feature = "avif")]
pub use avif::{
    AvifOptions, ChromaSubsampling, ContentLightLevel, DEFAULT_AVIF_BIT_DEPTH,
    DEFAULT_AVIF_QUALITY, DEFAULT_AVIF_SPEED, DEFAULT_SDR_WHITE_NITS, MasteringDisplay,
    bt709_to_bt2020, encode_avif, pq_oetf,
};
pub use batch::{BatchReport, Job, has_extension, is_dir_like, plan_jobs, run_jobs};
pub use color::{LUMA_BT709, hsv_to_rgb, luminance, rgb_to_hsv, srgb_oetf};
pub use container::{
    EncodedImage, ProbedGainMap, SiblingPaths, XmpLayout, probe_gainmap_metadata,
};
pub use decode::{DecodeStrategy, from_dynamic, read_hdr, read_hdr_with};
pub use encoder::{
    DEFAULT_GAINMAP_SCALE, DEFAULT_QUALITY, Encoder, encode_luma_jpeg, encode_rgb_jpeg,
};
pub use error::{Error, Result};
pub use gainmap::{
    DEFAULT_MAX_GAIN_RATIO, GainMapConfig, SDR_LUMINANCE_EPSILON, compute_gain_map, log2_gain,
    reconstruct_luminance,
};
pub use pipeline::render;
pub use preview::{HDR_VISUALIZATION_GAIN, PREVIEW_HEIGHT, PreviewMode, PreviewSession};
pub use tonemap::{reinhard, reinhard_luminance, reinhard_pixel};
pub use types::*;
