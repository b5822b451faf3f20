use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the conversion core.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Everything that can go wrong while turning one raw log into a container.
///
/// None of these are retried: a failed file leaves its output path in an
/// unknown state and must be reconverted from the original raw log.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A wavelength/spectrum line whose value text is not a number.
    #[error("line {line}: '{text}' is not a number")]
    InvalidNumber { line: usize, text: String },

    #[error("repaired log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("element {index} has no environment_sensor_set_reading object")]
    MissingReading { index: usize },

    #[error("field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// A record disagrees with the field set or shapes of the first record.
    #[error("record {record}, field '{field}': {reason}")]
    SchemaMismatch {
        record: usize,
        field: String,
        reason: String,
    },

    #[error("unrecognised unit '{0}'")]
    UnknownUnit(String),

    #[error("spectrum shape: {0}")]
    SpectrumShape(String),

    #[error("{records} records but {series} spectrometer arrays")]
    SeriesMismatch { records: usize, series: usize },

    #[error("variable '{0}' is defined twice")]
    DuplicateVariable(String),

    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("container metadata: {0}")]
    Metadata(String),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}
