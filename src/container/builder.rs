use log::debug;
use time::macros::format_description;
use time::OffsetDateTime;

use super::{Container, Variable, TIME_DIM, WAVELENGTH_DIM};
use crate::data::model::{FieldValue, ReadingRecord, SpectralSeries, TIMESTAMP_FIELD};
use crate::data::units::ConversionConfig;
use crate::error::{ConvertError, Result};

pub const MAX_FIXED_INTENSITY_VAR: &str = "Spectrometer_maxFixedIntensity";
pub const INTEGRATION_TIME_VAR: &str = "Spectrometer_Integration_Time_In_Microseconds";
pub const SPECTRUM_VAR: &str = "spectrum";
pub const HISTORY_ATTR: &str = "history";
const RAW_VALUE_SUFFIX: &str = "_rawValue";

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// When and how a container was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub timestamp: String,
    pub command_line: String,
}

impl Provenance {
    /// Stamp with the current local time (UTC if the local offset is unknown).
    pub fn now(command_line: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let fmt = format_description!(
            "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [year]"
        );
        Provenance {
            // The description only uses components every OffsetDateTime has.
            timestamp: now.format(fmt).unwrap_or_default(),
            command_line: command_line.into(),
        }
    }

    pub fn history(&self) -> String {
        format!("{}: {}", self.timestamp, self.command_line)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Map reading records and their spectra onto a container.
///
/// The first record is the schema template: each of its fields becomes one or
/// more variables, and the same field is read from every record. Records are
/// expected to have passed [`crate::data::model::validate_schema`]; a record
/// that still disagrees with the template fails with `SchemaMismatch`.
pub fn build_container(
    records: &[ReadingRecord],
    series: &SpectralSeries,
    config: &ConversionConfig,
    provenance: &Provenance,
) -> Result<Container> {
    let n = records.len();
    let mut container = Container::new();
    container.add_dimension(TIME_DIM, n, true)?;

    let times = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            r.timestamp()
                .map(str::to_string)
                .ok_or_else(|| mismatch(i, TIMESTAMP_FIELD, "missing text timestamp"))
        })
        .collect::<Result<Vec<_>>>()?;
    container.add_variable(Variable::text(TIME_DIM, &[TIME_DIM], times))?;

    if let Some(template) = records.first() {
        for (field, value) in template.iter() {
            add_field(&mut container, records, field, value, config)?;
        }
    }

    add_spectra(&mut container, series, n)?;

    container.set_attribute(HISTORY_ATTR, provenance.history());
    Ok(container)
}

fn add_field(
    container: &mut Container,
    records: &[ReadingRecord],
    field: &str,
    template: &FieldValue,
    config: &ConversionConfig,
) -> Result<()> {
    let name = config.variable_name(field);
    match template {
        FieldValue::Text(text) => {
            // Text members are constant over a log; keep the first record's.
            container.add_variable(Variable::text(name, &[], vec![text.clone()]))
        }
        FieldValue::Scalar(desc) => {
            let values = collect(records, field, |v| match v {
                FieldValue::Scalar(s) => Some(s.value),
                _ => None,
            })?;
            let mut var = Variable::float(name.clone(), &[TIME_DIM], values);
            if let Some(unit) = &desc.unit {
                var = var.with_attribute("units", config.unit(unit)?);
            }
            container.add_variable(var)?;

            if desc.raw_value.is_some() {
                let raw = collect(records, field, |v| match v {
                    FieldValue::Scalar(s) => s.raw_value,
                    _ => None,
                })?;
                container.add_variable(Variable::float(
                    format!("{name}{RAW_VALUE_SUFFIX}"),
                    &[TIME_DIM],
                    raw,
                ))?;
            }
            Ok(())
        }
        FieldValue::Spectrometer(_) => {
            let intensity = collect(records, field, |v| match v {
                FieldValue::Spectrometer(s) => Some(s.max_fixed_intensity),
                _ => None,
            })?;
            let integration = collect(records, field, |v| match v {
                FieldValue::Spectrometer(s) => Some(s.integration_time_us),
                _ => None,
            })?;
            container.add_variable(Variable::float(
                MAX_FIXED_INTENSITY_VAR,
                &[TIME_DIM],
                intensity,
            ))?;
            container.add_variable(Variable::float(
                INTEGRATION_TIME_VAR,
                &[TIME_DIM],
                integration,
            ))
        }
    }
}

/// Read one numeric member of `field` from every record.
fn collect(
    records: &[ReadingRecord],
    field: &str,
    pick: impl Fn(&FieldValue) -> Option<f64>,
) -> Result<Vec<f32>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let value = r
                .get(field)
                .ok_or_else(|| mismatch(i, field, "missing"))?;
            pick(value)
                .map(|v| v as f32)
                .ok_or_else(|| mismatch(i, field, &format!("unexpected {}", value.kind())))
        })
        .collect()
}

fn add_spectra(container: &mut Container, series: &SpectralSeries, n: usize) -> Result<()> {
    // Every reading carries exactly one spectrometer pair.
    if series.wavelengths.len() != n || series.spectra.len() != n {
        return Err(ConvertError::SeriesMismatch {
            records: n,
            series: series.len(),
        });
    }
    let Some(axis_len) = series.axis_len()? else {
        return Ok(());
    };
    if axis_len == 0 {
        debug!("readings carry no spectrometer bands");
        return Ok(());
    }

    let axis = &series.wavelengths[0];
    if series.wavelengths.iter().skip(1).any(|w| w != axis) {
        // Only the first axis is stored.
        debug!("wavelength axis varies between readings; keeping the first");
    }
    debug!("spectrum: {n} readings x {axis_len} wavelengths");

    container.add_dimension(WAVELENGTH_DIM, axis_len, false)?;
    container.add_variable(Variable::float(
        WAVELENGTH_DIM,
        &[WAVELENGTH_DIM],
        axis.iter().map(|&w| w as f32).collect(),
    ))?;
    let matrix = series
        .spectra
        .iter()
        .flat_map(|row| row.iter().map(|&v| v as f32))
        .collect();
    container.add_variable(Variable::float(
        SPECTRUM_VAR,
        &[TIME_DIM, WAVELENGTH_DIM],
        matrix,
    ))
}

fn mismatch(record: usize, field: &str, reason: &str) -> ConvertError {
    ConvertError::SchemaMismatch {
        record,
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
