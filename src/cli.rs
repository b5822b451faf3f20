use std::path::PathBuf;

use clap::Parser;

/// Convert environmental logger JSON streams into Parquet containers.
#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Raw logger file, or a directory searched recursively for `.json` logs.
    /// Every converted log is rewritten in place as strict JSON.
    pub input: PathBuf,

    /// Output directory (created if absent), or a `.parquet` file path when
    /// INPUT is a single file
    pub output: PathBuf,

    /// JSON file with extra unit/name translations:
    /// `{"units": {"W/m^2": "watt meter-2"}, "names": {...}}`
    #[arg(long)]
    pub units: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_paths_and_flags() {
        let cli = Cli::try_parse_from([
            "envlog-converter",
            "raw/",
            "out/",
            "--units",
            "units.json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("raw/"));
        assert_eq!(cli.output, PathBuf::from("out/"));
        assert_eq!(cli.units, Some(PathBuf::from("units.json")));
        assert!(cli.verbose);
    }

    #[test]
    fn output_is_required() {
        assert!(Cli::try_parse_from(["envlog-converter", "raw/"]).is_err());
    }
}
