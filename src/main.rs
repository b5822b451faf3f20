use anyhow::{bail, Context};

use envlog_converter::cli;
use envlog_converter::data::units::ConversionConfig;
use envlog_converter::driver::{plan_jobs, run_jobs};

fn main() -> anyhow::Result<()> {
    let cli = cli::parse_cli();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.units {
        Some(path) => ConversionConfig::from_json_file(path)
            .with_context(|| format!("loading unit table {}", path.display()))?,
        None => ConversionConfig::default(),
    };

    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    let jobs = plan_jobs(&cli.input, &cli.output)?;
    if jobs.is_empty() {
        log::warn!("no .json logs found under {}", cli.input.display());
    }

    let report = run_jobs(&jobs, &config, &command_line);
    log::info!(
        "converted {} of {} logs",
        report.converted,
        report.converted + report.failed.len()
    );
    if !report.failed.is_empty() {
        bail!("{} log(s) failed to convert", report.failed.len());
    }
    Ok(())
}
