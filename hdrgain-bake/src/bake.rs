use std::collections::HashMap;

use anyhow::{Context, Result, bail, ensure};
use hdrgain::{
    BatchReport, Encoder, ImgLabel, Job, SiblingPaths, is_dir_like, plan_jobs, read_hdr, run_jobs,
};

use crate::cli::BakeArgs;

pub fn build_encoder(args: &BakeArgs) -> Result<Encoder> {
    let mut enc = Encoder::new();
    enc.set_adjustments(args.adjust.to_adjustments())?;
    enc.set_quality(args.quality, ImgLabel::Base)?;
    enc.set_quality(args.gainmap_quality(), ImgLabel::GainMap)?;
    enc.set_gainmap_scale_factor(args.gainmap_scale)?;
    enc.set_max_gain_ratio(args.max_gain_ratio())?;
    Ok(enc)
}

pub fn run_bake(args: &BakeArgs) -> Result<BatchReport> {
    let (Some(input), Some(output)) = (args.input.as_deref(), args.output.as_deref()) else {
        bail!("Provide an input HDR path and an output path");
    };
    ensure!(
        !(input.is_dir() && output.is_file()),
        "Input {} is a directory, so output {} must be a directory too",
        input.display(),
        output.display()
    );
    let encoder = build_encoder(args)?;

    let mut jobs = plan_jobs(input, output, &["hdr"], "jpg")
        .with_context(|| format!("Failed to collect inputs from {}", input.display()))?;
    if jobs.is_empty() {
        println!("No .hdr files found under {}", input.display());
        return Ok(BatchReport::default());
    }
    if input.is_dir() || is_dir_like(output) {
        log::info!("{} job(s) from {}", jobs.len(), input.display());
    }

    // Sibling outputs are skipped or written by their SDR file name.
    let mut siblings = HashMap::new();
    if args.siblings {
        for job in &mut jobs {
            let paths = SiblingPaths::for_output(&job.output);
            job.output = paths.sdr.clone();
            siblings.insert(job.input.clone(), paths);
        }
    }

    crate::with_pool(args.jobs, || {
        run_jobs(&jobs, args.overwrite, |job| {
            bake_one(&encoder, job, siblings.get(&job.input))
        })
    })
}

fn bake_one(encoder: &Encoder, job: &Job, siblings: Option<&SiblingPaths>) -> hdrgain::Result<()> {
    let hdr = read_hdr(&job.input)?;
    let encoded = encoder.encode(&hdr)?;
    match siblings {
        Some(paths) => {
            encoded.write_pair(paths)?;
            println!(
                "Wrote {} and {} (gain map max {:.3} stops)",
                paths.sdr.display(),
                paths.gain_map.display(),
                encoded.metadata.gain_map_max_log2
            );
        }
        None => {
            let len = encoded.write_gainmap_jpeg(&job.output)?;
            println!(
                "Wrote {} ({} bytes, gain map max {:.3} stops)",
                job.output.display(),
                len,
                encoded.metadata.gain_map_max_log2
            );
        }
    }
    Ok(())
}
