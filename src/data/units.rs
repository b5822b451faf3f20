use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConvertError, Result};

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Unit strings written by the logger → unit names stored in the container.
const DEFAULT_UNITS: &[(&str, &str)] = &[
    ("", ""),
    ("?mol/(m^2*s)", "micromole meters-2 second-1"),
    ("DegCelsius", "Celsius"),
    ("degrees", "degrees"),
    ("hPa", "hecto-Pascal"),
    ("kilo Lux", "kilo Lux"),
    ("m", "meter"),
    ("m/s", "meter second-1"),
    ("mm/h", "milimeters hour-1"),
    ("relHumPerCent", "percent"),
    ("s", "second"),
];

/// Field names that get a descriptive variable name.
const DEFAULT_NAMES: &[(&str, &str)] = &[("sensor par", "Sensor Photosynthetical Active Radiation")];

// ---------------------------------------------------------------------------
// ConversionConfig
// ---------------------------------------------------------------------------

/// Unit and name translation tables handed to the container builder.
///
/// The unit table is closed: a unit missing from it is an error, never passed
/// through.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    units: BTreeMap<String, String>,
    names: BTreeMap<String, String>,
}

/// On-disk overrides, merged over the built-in tables.
///
/// ```json
/// { "units": { "W/m^2": "watt meter-2" }, "names": { "sensor co2": "CO2 concentration" } }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigOverrides {
    units: BTreeMap<String, String>,
    names: BTreeMap<String, String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let to_map = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        ConversionConfig {
            units: to_map(DEFAULT_UNITS),
            names: to_map(DEFAULT_NAMES),
        }
    }
}

impl ConversionConfig {
    /// Built-in tables extended (and overridden) by a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::default().with_overrides_json(&text)
    }

    fn with_overrides_json(mut self, text: &str) -> Result<Self> {
        let overrides: ConfigOverrides = serde_json::from_str(text)?;
        self.units.extend(overrides.units);
        self.names.extend(overrides.names);
        Ok(self)
    }

    /// Translate a logger unit string.
    pub fn unit(&self, raw: &str) -> Result<&str> {
        self.units
            .get(raw)
            .map(String::as_str)
            .ok_or_else(|| ConvertError::UnknownUnit(raw.to_string()))
    }

    /// Container variable name for a record field.
    ///
    /// Known aliases are replaced first, then non-ASCII characters are dropped
    /// and spaces become underscores.
    pub fn variable_name(&self, field: &str) -> String {
        let name = self
            .units
            .get(field)
            .or_else(|| self.names.get(field))
            .map(String::as_str)
            .unwrap_or(field);
        name.chars()
            .filter(char::is_ascii)
            .map(|c| if c == ' ' { '_' } else { c })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_known_units() {
        let cfg = ConversionConfig::default();
        assert_eq!(cfg.unit("DegCelsius").unwrap(), "Celsius");
        assert_eq!(cfg.unit("relHumPerCent").unwrap(), "percent");
        assert_eq!(cfg.unit("").unwrap(), "");
        assert_eq!(cfg.unit("mm/h").unwrap(), "milimeters hour-1");
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let err = ConversionConfig::default().unit("furlong").unwrap_err();
        assert!(matches!(err, ConvertError::UnknownUnit(u) if u == "furlong"));
    }

    #[test]
    fn variable_names() {
        let cfg = ConversionConfig::default();
        assert_eq!(cfg.variable_name("wind velocity"), "wind_velocity");
        assert_eq!(
            cfg.variable_name("sensor par"),
            "Sensor_Photosynthetical_Active_Radiation"
        );
        assert_eq!(cfg.variable_name("m"), "meter");
        assert_eq!(cfg.variable_name("integration time in µs"), "integration_time_in_s");
    }

    #[test]
    fn overrides_extend_defaults() {
        let cfg = ConversionConfig::default()
            .with_overrides_json(r#"{"units": {"W/m^2": "watt meter-2", "hPa": "hPa"}}"#)
            .unwrap();
        assert_eq!(cfg.unit("W/m^2").unwrap(), "watt meter-2");
        assert_eq!(cfg.unit("hPa").unwrap(), "hPa");
        assert_eq!(cfg.unit("DegCelsius").unwrap(), "Celsius");
    }

    #[test]
    fn override_file_rejects_unknown_sections() {
        let err = ConversionConfig::default()
            .with_overrides_json(r#"{"unitz": {}}"#)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Json(_)));
    }
}
