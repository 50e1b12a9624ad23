use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use hdrgain::{BatchReport, Error, Job, has_extension, plan_jobs, run_jobs};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};

use crate::cli::{ResizeArgs, Tiff2PngArgs};

const TIFF_EXTS: &[&str] = &["tif", "tiff"];
const RESIZABLE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif"];

pub fn run_tiff2png(args: &Tiff2PngArgs) -> Result<BatchReport> {
    ensure!(
        args.src.is_dir(),
        "Source {} is not a directory",
        args.src.display()
    );
    fs::create_dir_all(&args.dst)
        .with_context(|| format!("Failed to create {}", args.dst.display()))?;
    let jobs = plan_jobs(&args.src, &args.dst, TIFF_EXTS, "png")
        .with_context(|| format!("Failed to list {}", args.src.display()))?;

    crate::with_pool(args.jobs, || {
        run_jobs(&jobs, args.overwrite, |job| {
            tiff_to_png(job)?;
            println!("Converted {} -> {}", job.input.display(), job.output.display());
            Ok(())
        })
    })
}

fn open_image(path: &Path) -> hdrgain::Result<DynamicImage> {
    image::open(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn tiff_to_png(job: &Job) -> hdrgain::Result<()> {
    let img = open_image(&job.input)?;
    // PNG has no float samples.
    let img = match img.color() {
        ColorType::Rgb32F => DynamicImage::ImageRgb16(img.to_rgb16()),
        ColorType::Rgba32F => DynamicImage::ImageRgba16(img.to_rgba16()),
        _ => img,
    };
    img.save_with_format(&job.output, ImageFormat::Png)?;
    Ok(())
}

pub fn run_resize(args: &ResizeArgs) -> Result<BatchReport> {
    ensure!(
        args.yes,
        "Resizing overwrites the images in {} in place; pass --yes to confirm",
        args.dir.display()
    );
    ensure!(
        args.dir.is_dir(),
        "{} is not a directory",
        args.dir.display()
    );

    let mut jobs = Vec::new();
    for entry in fs::read_dir(&args.dir)
        .with_context(|| format!("Failed to list directory {}", args.dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, RESIZABLE_EXTS) {
            jobs.push(Job {
                input: path.clone(),
                output: path,
            });
        }
    }
    jobs.sort_by(|a, b| a.input.cmp(&b.input));

    let percent = args.percent;
    crate::with_pool(args.jobs, || {
        run_jobs(&jobs, true, |job| {
            let (w, h) = resize_in_place(&job.input, percent)?;
            println!("Resized {} to {w}x{h}", job.input.display());
            Ok(())
        })
    })
}

/// `floor(side * percent / 100)` for both sides; `None` when a side no
/// longer fits in `u32`.
pub fn scaled_size(width: u32, height: u32, percent: u32) -> Option<(u32, u32)> {
    let scale = |side: u32| u32::try_from(u64::from(side) * u64::from(percent) / 100).ok();
    Some((scale(width)?, scale(height)?))
}

fn resize_in_place(path: &Path, percent: u32) -> hdrgain::Result<(u32, u32)> {
    let img = open_image(path)?;
    let (w, h) = scaled_size(img.width(), img.height(), percent).ok_or_else(|| {
        Error::InvalidParam(format!(
            "{}x{} at {percent}% is too large",
            img.width(),
            img.height()
        ))
    })?;
    if w == 0 || h == 0 {
        return Err(Error::InvalidParam(format!(
            "{}x{} at {percent}% has a zero-sized side",
            img.width(),
            img.height()
        )));
    }
    img.resize_exact(w, h, FilterType::CatmullRom).save(path)?;
    Ok((w, h))
}
