use std::time::Instant;

use crate::adjust::apply_adjustments;
use crate::error::{Error, Result};
use crate::gainmap::{GainMapConfig, compute_gain_map};
use crate::tonemap::reinhard;
use crate::types::{Adjustments, HdrImage, Rendition};

/// Adjust, tone map and derive the gain map for one image.
///
/// The gain map is computed against the adjusted HDR buffer, so the
/// adjustments are visible in both renditions.
pub fn render(hdr: &HdrImage, adj: &Adjustments, config: &GainMapConfig) -> Result<Rendition> {
    if hdr.width() == 0 || hdr.height() == 0 {
        return Err(Error::invalid_param("image has no pixels"));
    }
    let start = Instant::now();

    let adjusted = if adj.is_neutral() {
        None
    } else {
        Some(apply_adjustments(hdr, adj)?)
    };
    let hdr = adjusted.as_ref().unwrap_or(hdr);
    let sdr = reinhard(hdr);
    let (gain_map, metadata) = compute_gain_map(hdr, &sdr, config)?;

    log::debug!(
        "rendered {}x{} in {:.1?} (headroom {:.3} stops)",
        hdr.width(),
        hdr.height(),
        start.elapsed(),
        metadata.hdr_capacity_max
    );
    Ok(Rendition {
        sdr,
        gain_map,
        metadata,
    })
}
