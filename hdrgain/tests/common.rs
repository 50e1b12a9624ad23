//! Synthetic images and scratch directories shared by the integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hdrgain::HdrImage;
use image::codecs::hdr::HdrEncoder;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Horizontal gray ramp from 0 to `peak`.
pub fn create_hdr_gradient(width: u32, height: u32, peak: f32) -> HdrImage {
    HdrImage::from_fn(width, height, |x, _| {
        let t = x as f32 / (width - 1).max(1) as f32;
        [t * peak; 3]
    })
    .unwrap()
}

pub fn create_hdr_solid(width: u32, height: u32, rgb: [f32; 3]) -> HdrImage {
    HdrImage::from_fn(width, height, |_, _| rgb).unwrap()
}

/// Seeded per-pixel noise with channels in `[0, peak)`.
pub fn create_hdr_noise(width: u32, height: u32, peak: f32, seed: u64) -> HdrImage {
    let mut rng = SmallRng::seed_from_u64(seed);
    HdrImage::from_fn(width, height, |_, _| {
        [
            rng.gen_range(0.0..peak),
            rng.gen_range(0.0..peak),
            rng.gen_range(0.0..peak),
        ]
    })
    .unwrap()
}

/// A dark scene with a few very bright highlights.
pub fn create_hdr_highlights(width: u32, height: u32) -> HdrImage {
    HdrImage::from_fn(width, height, |x, y| {
        if (x % 16 == 0) && (y % 16 == 0) {
            [40.0, 38.0, 30.0]
        } else {
            [0.05, 0.06, 0.08]
        }
    })
    .unwrap()
}

/// Fresh, empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hdrgain-it-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_radiance(path: &Path, hdr: &HdrImage) {
    let pixels: Vec<image::Rgb<f32>> = hdr.pixels().iter().map(|p| image::Rgb(*p)).collect();
    let file = BufWriter::new(File::create(path).unwrap());
    HdrEncoder::new(file)
        .encode(&pixels, hdr.width() as usize, hdr.height() as usize)
        .unwrap();
}
