use std::fmt;

use serde_json::{Map, Value as JsonValue};

use crate::error::{ConvertError, Result};

/// Key of the sub-object that carries the spectrometer calibration fields.
pub const SPECTROMETER_FIELD: &str = "spectrometer";
/// Field holding the acquisition time of a reading.
pub const TIMESTAMP_FIELD: &str = "timestamp";

// ---------------------------------------------------------------------------
// FieldValue – one field of a reading record
// ---------------------------------------------------------------------------

/// A measured scalar: calibrated value plus the optional raw counts and unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarDescriptor {
    pub value: f64,
    pub raw_value: Option<f64>,
    /// Unit as written by the logger, untranslated (e.g. `DegCelsius`).
    pub unit: Option<String>,
}

/// Calibration fields of the spectrometer sub-object.
///
/// The wavelength/spectrum arrays are harvested by the repairer and live in
/// [`SpectralSeries`], not here.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrometerDescriptor {
    pub max_fixed_intensity: f64,
    pub integration_time_us: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarDescriptor),
    Text(String),
    Spectrometer(SpectrometerDescriptor),
}

/// The shape of a field, used to check later records against the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar { has_raw_value: bool },
    Text,
    Spectrometer,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar {
                has_raw_value: true,
            } => write!(f, "scalar with rawValue"),
            FieldKind::Scalar {
                has_raw_value: false,
            } => write!(f, "scalar"),
            FieldKind::Text => write!(f, "text"),
            FieldKind::Spectrometer => write!(f, "spectrometer"),
        }
    }
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Scalar(s) => FieldKind::Scalar {
                has_raw_value: s.raw_value.is_some(),
            },
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Spectrometer(_) => FieldKind::Spectrometer,
        }
    }

    /// Interpret one JSON member of a reading.
    pub fn from_json(name: &str, val: &JsonValue) -> Result<Self> {
        match val {
            JsonValue::String(s) => Ok(FieldValue::Text(s.clone())),
            JsonValue::Object(obj) if name == SPECTROMETER_FIELD => {
                spectrometer_from_json(name, obj).map(FieldValue::Spectrometer)
            }
            JsonValue::Object(obj) => scalar_from_json(name, obj).map(FieldValue::Scalar),
            other => Err(ConvertError::InvalidField {
                field: name.to_string(),
                reason: format!("expected a string or an object, found {}", json_type(other)),
            }),
        }
    }
}

fn scalar_from_json(name: &str, obj: &Map<String, JsonValue>) -> Result<ScalarDescriptor> {
    let value = json_number(name, "value", obj.get("value"))?;
    let raw_value = match obj.get("rawValue") {
        Some(v) => Some(json_number(name, "rawValue", Some(v))?),
        None => None,
    };
    let unit = match obj.get("unit") {
        Some(JsonValue::String(u)) => Some(u.clone()),
        Some(other) => {
            return Err(ConvertError::InvalidField {
                field: name.to_string(),
                reason: format!("'unit' must be a string, found {}", json_type(other)),
            })
        }
        None => None,
    };
    Ok(ScalarDescriptor {
        value,
        raw_value,
        unit,
    })
}

fn spectrometer_from_json(
    name: &str,
    obj: &Map<String, JsonValue>,
) -> Result<SpectrometerDescriptor> {
    let max_fixed_intensity = json_number(name, "maxFixedIntensity", obj.get("maxFixedIntensity"))?;
    // The logger spells the key "integration time in µs" with whatever
    // encoding it was built with; match on the stable prefix.
    let integration = obj
        .iter()
        .find(|(k, _)| k.starts_with("integration time"))
        .map(|(_, v)| v);
    let integration_time_us = json_number(name, "integration time", integration)?;
    Ok(SpectrometerDescriptor {
        max_fixed_intensity,
        integration_time_us,
    })
}

/// Numbers arrive either as JSON numbers or as numeric strings (`"21.4"`).
fn json_number(field: &str, member: &str, val: Option<&JsonValue>) -> Result<f64> {
    let invalid = |reason: String| ConvertError::InvalidField {
        field: field.to_string(),
        reason,
    };
    match val {
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("'{member}' is out of range"))),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("'{member}' = '{s}' is not a number"))),
        Some(other) => Err(invalid(format!(
            "'{member}' must be a number, found {}",
            json_type(other)
        ))),
        None => Err(invalid(format!("missing '{member}'"))),
    }
}

fn json_type(val: &JsonValue) -> &'static str {
    match val {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// ReadingRecord – one sampling event
// ---------------------------------------------------------------------------

/// One sampling event. Field order is the order the logger wrote them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingRecord {
    fields: Vec<(String, FieldValue)>,
}

impl ReadingRecord {
    /// Build a record from the body of an `environment_sensor_set_reading`.
    pub fn from_json(obj: &Map<String, JsonValue>) -> Result<Self> {
        let fields = obj
            .iter()
            .map(|(name, val)| Ok((name.clone(), FieldValue::from_json(name, val)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(ReadingRecord { fields })
    }

    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The record's `timestamp` text, if it has one.
    pub fn timestamp(&self) -> Option<&str> {
        match self.get(TIMESTAMP_FIELD) {
            Some(FieldValue::Text(t)) => Some(t),
            _ => None,
        }
    }
}

/// Check that every record has exactly the fields of the first record, with
/// the same shapes.
///
/// The first record is the schema template for the whole file; the container
/// builder relies on this having been checked.
pub fn validate_schema(records: &[ReadingRecord]) -> Result<()> {
    let Some(template) = records.first() else {
        return Ok(());
    };

    for (i, rec) in records.iter().enumerate().skip(1) {
        for (name, tmpl_val) in template.iter() {
            let found = rec.get(name).ok_or_else(|| ConvertError::SchemaMismatch {
                record: i,
                field: name.to_string(),
                reason: "missing".to_string(),
            })?;
            if found.kind() != tmpl_val.kind() {
                return Err(ConvertError::SchemaMismatch {
                    record: i,
                    field: name.to_string(),
                    reason: format!("expected {}, found {}", tmpl_val.kind(), found.kind()),
                });
            }
        }
        if let Some((extra, _)) = rec.iter().find(|(n, _)| template.get(n).is_none()) {
            return Err(ConvertError::SchemaMismatch {
                record: i,
                field: extra.to_string(),
                reason: "not present in the first record".to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SpectralSeries – wavelength/spectrum arrays, one pair per record
// ---------------------------------------------------------------------------

/// Spectrometer arrays harvested from the raw text, index-aligned with the
/// reading records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralSeries {
    /// Wavelength axis per record (nm).
    pub wavelengths: Vec<Vec<f64>>,
    /// Intensity per record – same length as the matching wavelength entry.
    pub spectra: Vec<Vec<f64>>,
}

impl SpectralSeries {
    /// Number of records covered (the shorter of the two series).
    pub fn len(&self) -> usize {
        self.wavelengths.len().min(self.spectra.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the wavelength axis, if every entry agrees on it.
    ///
    /// Fails when entries disagree or a spectrum does not match its axis.
    pub fn axis_len(&self) -> Result<Option<usize>> {
        if self.wavelengths.len() != self.spectra.len() {
            return Err(ConvertError::SpectrumShape(format!(
                "{} wavelength arrays but {} spectrum arrays",
                self.wavelengths.len(),
                self.spectra.len()
            )));
        }
        let Some(first) = self.wavelengths.first() else {
            return Ok(None);
        };
        let n = first.len();
        for (i, (wl, sp)) in self.wavelengths.iter().zip(&self.spectra).enumerate() {
            if wl.len() != n {
                return Err(ConvertError::SpectrumShape(format!(
                    "record {i} has {} wavelengths, record 0 has {n}",
                    wl.len()
                )));
            }
            if sp.len() != n {
                return Err(ConvertError::SpectrumShape(format!(
                    "record {i} has {} spectrum values for {n} wavelengths",
                    sp.len()
                )));
            }
        }
        Ok(Some(n))
    }
}
