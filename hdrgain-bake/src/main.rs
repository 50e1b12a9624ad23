use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use hdrgain::BatchReport;

#[cfg(feature = "avif")]
mod avif;
mod bake;
mod cli;
mod preview;
mod probe;
mod raster;

fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);
    run(args.into_command())
}

fn run(cmd: cli::Command) -> Result<ExitCode> {
    match cmd {
        cli::Command::Bake(args) => {
            let report = bake::run_bake(&args)?;
            Ok(summarize("Baked", &report))
        }
        cli::Command::Preview(args) => {
            preview::run_preview(&args)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Probe(args) => {
            probe::run_probe(&args)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Tiff2png(args) => {
            let report = raster::run_tiff2png(&args)?;
            Ok(summarize("Converted", &report))
        }
        cli::Command::Resize(args) => {
            let report = raster::run_resize(&args)?;
            Ok(summarize("Resized", &report))
        }
        #[cfg(feature = "avif")]
        cli::Command::Avif(args) => {
            let report = avif::run_avif(&args)?;
            Ok(summarize("Encoded", &report))
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Run `f` on a rayon pool with `jobs` threads (rayon's default when `None`).
pub(crate) fn with_pool<T, F>(jobs: Option<u32>, f: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = jobs {
        builder = builder.num_threads(n as usize);
    }
    let pool = builder.build().context("Failed to create thread pool")?;
    Ok(pool.install(f))
}

/// Print the batch summary; failures turn into exit status 1.
fn summarize(verb: &str, report: &BatchReport) -> ExitCode {
    for (path, err) in &report.failed {
        eprintln!("Failed {}: {err}", path.display());
    }
    println!(
        "{verb} {} file(s), skipped {}, failed {}",
        report.succeeded,
        report.skipped,
        report.failed.len()
    );
    if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
