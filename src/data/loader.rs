use std::path::Path;

use log::debug;
use serde_json::Value as JsonValue;

use super::model::{validate_schema, ReadingRecord, SpectralSeries};
use super::repair::{repair_file, repair_text, RepairedLog};
use crate::error::{ConvertError, Result};

/// Top-level key wrapping each reading's fields.
pub const READING_KEY: &str = "environment_sensor_set_reading";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// A fully parsed log: readings in file order plus their spectrometer arrays.
#[derive(Debug, Clone)]
pub struct ParsedLog {
    pub records: Vec<ReadingRecord>,
    pub series: SpectralSeries,
}

/// Repair the raw log at `path` in place and parse it.
///
/// The file is rewritten as strict JSON before parsing, so this must only be
/// called on a log straight from the logger.
pub fn load_log(path: &Path) -> Result<ParsedLog> {
    let repaired = repair_file(path)?;
    // Parse the normalized file as it now sits on disk.
    let text = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
    parse_repaired(&text, repaired.series)
}

/// Same as [`load_log`] for raw text that is already in memory.
pub fn load_str(raw: &str) -> Result<ParsedLog> {
    let RepairedLog { text, series, .. } = repair_text(raw)?;
    parse_repaired(&text, series)
}

// ---------------------------------------------------------------------------
// JSON array → records
// ---------------------------------------------------------------------------

/// Expected layout after repair:
///
/// ```json
/// [
///   { "environment_sensor_set_reading": { "timestamp": "...", ... } },
///   ...
/// ]
/// ```
fn parse_repaired(text: &str, series: SpectralSeries) -> Result<ParsedLog> {
    let root: JsonValue = serde_json::from_str(text)?;
    let elements = root.as_array().ok_or_else(|| {
        ConvertError::Metadata("repaired log is not a JSON array".to_string())
    })?;

    let records = elements
        .iter()
        .enumerate()
        .map(|(index, el)| {
            let reading = el
                .get(READING_KEY)
                .and_then(JsonValue::as_object)
                .ok_or(ConvertError::MissingReading { index })?;
            ReadingRecord::from_json(reading)
        })
        .collect::<Result<Vec<_>>>()?;

    validate_schema(&records)?;

    if series.wavelengths.len() != records.len() || series.spectra.len() != records.len() {
        return Err(ConvertError::SeriesMismatch {
            records: records.len(),
            series: series.len(),
        });
    }

    debug!("parsed {} readings", records.len());
    Ok(ParsedLog { records, series })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FieldValue;
    use crate::data::sample::{render_raw_log, RawReading};

    fn readings() -> Vec<RawReading> {
        let wl = vec![500.0, 600.0, 700.0];
        vec![
            RawReading::example("t0", wl.clone(), vec![0.1, 0.2, 0.3]),
            RawReading::example("t1", wl, vec![0.15, 0.25, 0.35]),
        ]
    }

    #[test]
    fn loads_records_and_series() {
        let log = load_str(&render_raw_log(&readings())).unwrap();
        assert_eq!(log.records.len(), 2);
        assert_eq!(log.series.len(), 2);
        assert_eq!(log.records[1].timestamp(), Some("t1"));
        assert!(matches!(
            log.records[0].get("weather station"),
            Some(FieldValue::Text(t)) if t == "Thies Clima"
        ));
    }

    #[test]
    fn element_without_reading_is_rejected() {
        let raw = "{\n\"something_else\": {}\n}\n";
        let err = load_str(raw).unwrap_err();
        assert!(matches!(err, ConvertError::MissingReading { index: 0 }));
    }

    #[test]
    fn differing_field_sets_are_a_schema_mismatch() {
        let mut rs = readings();
        rs[1].scalars.pop();
        let err = load_str(&render_raw_log(&rs)).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::SchemaMismatch { record: 1, ref field, .. } if field == "air pressure"
        ));
    }

    #[test]
    fn load_log_normalizes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2016-04-07_12-00-07_environmentlogger.json");
        std::fs::write(&path, render_raw_log(&readings())).unwrap();

        let log = load_log(&path).unwrap();
        assert_eq!(log.records.len(), 2);
        let on_disk: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.as_array().map(Vec::len), Some(2));
    }
}
