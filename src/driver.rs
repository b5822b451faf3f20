use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{error, info, warn};

use crate::container::builder::{build_container, Provenance};
use crate::container::storage::{write_container, CONTAINER_EXTENSION};
use crate::data::loader::load_log;
use crate::data::units::ConversionConfig;

/// Extension of raw logger files.
pub const LOG_EXTENSION: &str = "json";

// ---------------------------------------------------------------------------
// Job planning
// ---------------------------------------------------------------------------

/// One raw log and the container it turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Resolve the input/output arguments into conversion jobs.
///
/// * file → `.parquet` path: convert into exactly that file;
/// * file → anything else: treat output as a directory;
/// * directory → directory: every `.json` below input, depth first, sorted by
///   name. Containers land flat in the output directory.
///
/// Output directories are created as needed.
pub fn plan_jobs(input: &Path, output: &Path) -> Result<Vec<ConversionJob>> {
    if !input.exists() {
        bail!("input {} does not exist", input.display());
    }

    if input.is_file() && has_extension(output, CONTAINER_EXTENSION) {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
        return Ok(vec![ConversionJob {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }]);
    }

    create_dir(output)?;

    let logs = if input.is_dir() {
        let mut logs = Vec::new();
        collect_logs(input, &mut logs)?;
        logs
    } else {
        vec![input.to_path_buf()]
    };

    let mut jobs: Vec<ConversionJob> = Vec::with_capacity(logs.len());
    for log in logs {
        let target = output_path(&log, output)?;
        if jobs.iter().any(|j| j.output == target) {
            warn!(
                "{} and another log both map to {}; the later one wins",
                log.display(),
                target.display()
            );
        }
        jobs.push(ConversionJob {
            input: log,
            output: target,
        });
    }
    Ok(jobs)
}

/// `<output_dir>/<input stem>.parquet`
pub fn output_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .with_context(|| format!("{} has no file name", input.display()))?;
    let mut path = output_dir.join(stem);
    path.set_extension(CONTAINER_EXTENSION);
    Ok(path)
}

fn collect_logs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("listing {}", dir.display()))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_logs(&path, out)?;
        } else if has_extension(&path, LOG_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Repair, parse, build and write one log.
pub fn convert_file(
    job: &ConversionJob,
    config: &ConversionConfig,
    provenance: &Provenance,
) -> Result<()> {
    let log = load_log(&job.input).with_context(|| format!("parsing {}", job.input.display()))?;
    let container = build_container(&log.records, &log.series, config, provenance)
        .with_context(|| format!("building container for {}", job.input.display()))?;
    write_container(&container, &job.output)
        .with_context(|| format!("writing {}", job.output.display()))?;
    Ok(())
}

/// Outcome of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub converted: usize,
    pub failed: Vec<PathBuf>,
}

/// Convert every job in turn. A failing log is reported and skipped; its
/// output file, if any, must not be trusted.
pub fn run_jobs(
    jobs: &[ConversionJob],
    config: &ConversionConfig,
    command_line: &str,
) -> RunReport {
    let mut report = RunReport::default();
    for job in jobs {
        info!("Processing {}", job.input.display());
        let provenance = Provenance::now(command_line);
        match convert_file(job, config, &provenance) {
            Ok(()) => {
                info!("Wrote {}", job.output.display());
                report.converted += 1;
            }
            Err(e) => {
                error!("{:#}", e);
                report.failed.push(job.input.clone());
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_swaps_extension() {
        let p = output_path(
            Path::new("raw/2016-04-07/2016-04-07_12-00-07_environmentlogger.json"),
            Path::new("out"),
        )
        .unwrap();
        assert_eq!(
            p,
            PathBuf::from("out/2016-04-07_12-00-07_environmentlogger.parquet")
        );
    }

    #[test]
    fn directory_input_is_walked_depth_first_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        std::fs::create_dir_all(raw.join("2016-04-08")).unwrap();
        std::fs::write(raw.join("b.json"), "").unwrap();
        std::fs::write(raw.join("a.JSON"), "").unwrap();
        std::fs::write(raw.join("notes.txt"), "").unwrap();
        std::fs::write(raw.join("2016-04-08").join("c.json"), "").unwrap();

        let out = dir.path().join("out");
        let jobs = plan_jobs(&raw, &out).unwrap();
        let inputs: Vec<_> = jobs
            .iter()
            .map(|j| j.input.strip_prefix(&raw).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            inputs,
            vec![
                PathBuf::from("2016-04-08/c.json"),
                PathBuf::from("a.JSON"),
                PathBuf::from("b.json"),
            ]
        );
        assert!(out.is_dir());
        assert_eq!(jobs[2].output, out.join("b.parquet"));
    }

    #[test]
    fn file_to_parquet_path_is_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("log.json");
        std::fs::write(&input, "").unwrap();
        let target = dir.path().join("nested").join("x.parquet");

        let jobs = plan_jobs(&input, &target).unwrap();
        assert_eq!(jobs, vec![ConversionJob { input, output: target.clone() }]);
        assert!(target.parent().unwrap().is_dir());
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(plan_jobs(&dir.path().join("nope"), dir.path()).is_err());
    }
}
