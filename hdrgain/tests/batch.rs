//! Directory conversions where some inputs are broken.

mod common;

use std::fs;

use common::{create_hdr_gradient, create_hdr_highlights, scratch_dir, write_radiance};
use hdrgain::{Encoder, plan_jobs, probe_gainmap_metadata, read_hdr, run_jobs};

fn convert(jobs: &[hdrgain::Job], overwrite: bool) -> hdrgain::BatchReport {
    let encoder = Encoder::new();
    run_jobs(jobs, overwrite, |job| {
        let hdr = read_hdr(&job.input)?;
        encoder.encode(&hdr)?.write_gainmap_jpeg(&job.output)?;
        Ok(())
    })
}

#[test]
fn corrupted_inputs_do_not_stop_the_batch() {
    let root = scratch_dir("batch-mixed");
    let input = root.join("in");
    let output = root.join("out");
    fs::create_dir_all(input.join("nested")).unwrap();

    write_radiance(&input.join("a.hdr"), &create_hdr_gradient(24, 8, 10.0));
    write_radiance(&input.join("nested/b.hdr"), &create_hdr_highlights(32, 32));
    write_radiance(&input.join("c.HDR"), &create_hdr_gradient(8, 8, 2.0));
    fs::write(input.join("broken.hdr"), b"garbage").unwrap();
    fs::write(input.join("nested/empty.hdr"), b"").unwrap();
    fs::write(input.join("notes.txt"), b"ignored").unwrap();

    let jobs = plan_jobs(&input, &output, &["hdr"], "jpg").unwrap();
    assert_eq!(jobs.len(), 5);

    let report = convert(&jobs, false);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.total(), 5);

    let mut failed: Vec<_> = report
        .failed
        .iter()
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    failed.sort();
    assert_eq!(failed, ["broken.hdr", "empty.hdr"]);

    let nested = fs::read(output.join("nested/b.jpg")).unwrap();
    let probed = probe_gainmap_metadata(&nested).unwrap().unwrap();
    assert_eq!(probed.gain_map_dimensions, (16, 16));
    assert!(output.join("c.jpg").is_file());
    assert!(!output.join("broken.jpg").exists());

    // A second run leaves finished outputs alone and retries the failures.
    let rerun = convert(&jobs, false);
    assert_eq!(rerun.skipped, 3);
    assert_eq!(rerun.succeeded, 0);
    assert_eq!(rerun.failed.len(), 2);

    let forced = convert(&jobs, true);
    assert_eq!(forced.succeeded, 3);
    assert_eq!(forced.skipped, 0);
    let _ = fs::remove_dir_all(&root);
}
