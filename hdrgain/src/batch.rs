//! Planning and running one conversion per file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One input file and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Outcome counts of [`run_jobs`].
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

enum Outcome {
    Done,
    Skipped,
    Failed(PathBuf, Error),
}

/// True when `path` names a directory: it exists as one or is spelled
/// with a trailing separator.
pub fn is_dir_like(path: &Path) -> bool {
    path.is_dir()
        || path
            .as_os_str()
            .to_string_lossy()
            .ends_with(std::path::is_separator)
}

/// Whether `path` has one of `exts` (case-insensitive, without dots).
pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Resolve `input` (a file, or a directory searched recursively for
/// `input_exts`) against `output`.
///
/// Directory inputs mirror their relative layout below `output`. A file
/// input writes to `output` itself unless `output` is a directory.
pub fn plan_jobs(
    input: &Path,
    output: &Path,
    input_exts: &[&str],
    output_ext: &str,
) -> Result<Vec<Job>> {
    if !input.exists() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }

    if input.is_file() {
        let output = if is_dir_like(output) {
            output.join(renamed(input, output_ext)?)
        } else {
            output.to_path_buf()
        };
        return Ok(vec![Job {
            input: input.to_path_buf(),
            output,
        }]);
    }

    if output.is_file() {
        return Err(Error::invalid_param(format!(
            "input {} is a directory but output {} is a file",
            input.display(),
            output.display()
        )));
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(input).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), input_exts) {
            continue;
        }
        let rel = entry.path().strip_prefix(input).map_err(|_| {
            Error::invalid_param(format!(
                "{} is not below {}",
                entry.path().display(),
                input.display()
            ))
        })?;
        let target_dir = output.join(rel.parent().unwrap_or_else(|| Path::new("")));
        jobs.push(Job {
            input: entry.path().to_path_buf(),
            output: target_dir.join(renamed(entry.path(), output_ext)?),
        });
    }
    log::debug!("planned {} jobs under {}", jobs.len(), input.display());
    Ok(jobs)
}

fn renamed(input: &Path, ext: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::invalid_param(format!("{} has no file name", input.display())))?;
    Ok(PathBuf::from(stem).with_extension(ext))
}

/// Run `f` for every job, in parallel when the `rayon` feature is on.
///
/// Jobs whose output already exists are skipped unless `overwrite`. A
/// failing job is recorded and never stops the others.
pub fn run_jobs<F>(jobs: &[Job], overwrite: bool, f: F) -> BatchReport
where
    F: Fn(&Job) -> Result<()> + Sync + Send,
{
    let process = |job: &Job| -> Outcome {
        if !overwrite && job.output.exists() {
            log::info!("skipping existing {}", job.output.display());
            return Outcome::Skipped;
        }
        if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty())
            && let Err(e) = fs::create_dir_all(parent)
        {
            return Outcome::Failed(job.input.clone(), Error::output(parent, e));
        }
        match f(job) {
            Ok(()) => Outcome::Done,
            Err(e) => {
                log::debug!("{} failed: {e}", job.input.display());
                Outcome::Failed(job.input.clone(), e)
            }
        }
    };

    #[cfg(feature = "rayon")]
    let outcomes: Vec<Outcome> = {
        use rayon::prelude::*;
        jobs.par_iter().map(process).collect()
    };
    #[cfg(not(feature = "rayon"))]
    let outcomes: Vec<Outcome> = jobs.iter().map(process).collect();

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Done => report.succeeded += 1,
            Outcome::Skipped => report.skipped += 1,
            Outcome::Failed(path, e) => report.failed.push((path, e)),
        }
    }
    report
}
