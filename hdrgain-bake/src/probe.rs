use std::fs;

use anyhow::{Context, Result};
use hdrgain::{XmpLayout, probe_gainmap_metadata};

use crate::cli::ProbeArgs;

pub fn run_probe(args: &ProbeArgs) -> Result<()> {
    let bytes = fs::read(&args.file)
        .with_context(|| format!("Failed to read JPEG {}", args.file.display()))?;
    let probed = probe_gainmap_metadata(&bytes)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    let Some(probed) = probed else {
        println!("{}: no gain map metadata found", args.file.display());
        return Ok(());
    };
    let layout = match probed.layout {
        XmpLayout::Inline => "inline XMP",
        XmpLayout::Extended => "extended XMP",
    };
    let (w, h) = probed.gain_map_dimensions;
    println!("{}", args.file.display());
    println!("  gain map version: {}", probed.version);
    println!(
        "  GainMapMax:       {:.6} (max boost {:.3}x)",
        probed.metadata.gain_map_max_log2,
        probed.metadata.max_content_boost()
    );
    println!("  HDRCapacityMax:   {:.6}", probed.metadata.hdr_capacity_max);
    println!(
        "  gain map image:   {w}x{h}, {} bytes in {layout}",
        probed.gain_map_jpeg.len()
    );
    Ok(())
}
