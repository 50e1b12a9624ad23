use anyhow::{Context, Result};
use hdrgain::{PreviewMode, PreviewSession, read_hdr};

use crate::cli::PreviewArgs;

pub fn run_preview(args: &PreviewArgs) -> Result<()> {
    let hdr = read_hdr(&args.input)
        .with_context(|| format!("Failed to read HDR image {}", args.input.display()))?;
    let session = PreviewSession::new(hdr)?;
    let mode = if args.hdr_visualized {
        PreviewMode::HdrVisualized
    } else {
        PreviewMode::Sdr
    };

    let img = session.render_preview(&args.adjust.to_adjustments(), mode)?;
    img.save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!(
        "Wrote {:?} preview {} ({}x{})",
        mode,
        args.output.display(),
        img.width(),
        img.height()
    );
    Ok(())
}
