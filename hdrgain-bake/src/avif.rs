use std::fs;

use anyhow::{Context, Result, bail, ensure};
use hdrgain::{
    AvifOptions, BatchReport, ContentLightLevel, Error, Job, encode_avif, plan_jobs, read_hdr,
    run_jobs,
};

use crate::cli::AvifArgs;

pub fn build_options(args: &AvifArgs) -> Result<AvifOptions> {
    let content_light = match (args.max_cll, args.max_fall) {
        (Some(max_cll), Some(max_fall)) => Some(ContentLightLevel { max_cll, max_fall }),
        (None, None) => None,
        _ => {
            log::warn!(
                "--max-cll and --max-fall must be given together; ignoring content light level"
            );
            None
        }
    };
    let opts = AvifOptions {
        quality: args.quality,
        speed: args.speed,
        bit_depth: args.depth,
        subsampling: args.yuv_format,
        sdr_white_nits: args.sdr_white,
        content_light,
        ..AvifOptions::default()
    };
    opts.validate()?;
    Ok(opts)
}

pub fn run_avif(args: &AvifArgs) -> Result<BatchReport> {
    ensure!(
        args.input.exists(),
        "Input {} does not exist",
        args.input.display()
    );
    if args.input.is_dir() && args.output.is_file() {
        bail!(
            "Input {} is a directory, so output {} must be a directory too",
            args.input.display(),
            args.output.display()
        );
    }
    let opts = build_options(args)?;

    let jobs = plan_jobs(&args.input, &args.output, &["hdr"], "avif")
        .with_context(|| format!("Failed to collect inputs from {}", args.input.display()))?;
    if jobs.is_empty() {
        println!("No .hdr files found under {}", args.input.display());
        return Ok(BatchReport::default());
    }
    log::info!(
        "{} job(s): quality {}, speed {}, {}-bit, yuv{}",
        jobs.len(),
        opts.quality,
        opts.speed,
        opts.bit_depth,
        opts.subsampling
    );

    crate::with_pool(args.jobs, || {
        run_jobs(&jobs, args.overwrite, |job| encode_one(&opts, job))
    })
}

fn encode_one(opts: &AvifOptions, job: &Job) -> hdrgain::Result<()> {
    let hdr = read_hdr(&job.input)?;
    let bytes = encode_avif(&hdr, opts)?;
    fs::write(&job.output, &bytes).map_err(|e| Error::Output {
        path: job.output.clone(),
        source: e,
    })?;
    println!("Wrote {} ({} bytes)", job.output.display(), bytes.len());
    Ok(())
}
