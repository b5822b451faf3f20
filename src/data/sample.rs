//! Rendering of synthetic raw logs in the environment logger's dialect.
//!
//! Used by the `generate_sample` binary and by tests. The output mimics what
//! the logger writes: CRLF line endings, numbers quoted as strings in scalar
//! descriptors, one `band` entry per wavelength, and consecutive readings
//! joined on a bare `}{` line.

/// A measured scalar as the logger writes it.
#[derive(Debug, Clone)]
pub struct RawScalar {
    pub name: String,
    pub value: f64,
    pub raw_value: Option<f64>,
    pub unit: Option<String>,
}

/// One reading to render.
#[derive(Debug, Clone)]
pub struct RawReading {
    pub timestamp: String,
    /// Constant text members, e.g. the station name.
    pub text_fields: Vec<(String, String)>,
    pub scalars: Vec<RawScalar>,
    pub max_fixed_intensity: u32,
    pub integration_time_us: u32,
    pub wavelengths: Vec<f64>,
    pub spectrum: Vec<f64>,
}

impl RawReading {
    /// A reading with a typical field set: one text member, a temperature
    /// with raw counts, a PAR sensor and a pressure without raw counts.
    pub fn example(timestamp: &str, wavelengths: Vec<f64>, spectrum: Vec<f64>) -> Self {
        RawReading {
            timestamp: timestamp.to_string(),
            text_fields: vec![("weather station".into(), "Thies Clima".into())],
            scalars: vec![
                RawScalar {
                    name: "temperature".into(),
                    value: 21.5,
                    raw_value: Some(2150.0),
                    unit: Some("DegCelsius".into()),
                },
                RawScalar {
                    name: "sensor par".into(),
                    value: 812.0,
                    raw_value: Some(4096.0),
                    unit: Some("?mol/(m^2*s)".into()),
                },
                RawScalar {
                    name: "air pressure".into(),
                    value: 1013.25,
                    raw_value: None,
                    unit: Some("hPa".into()),
                },
            ],
            max_fixed_intensity: 16383,
            integration_time_us: 5000,
            wavelengths,
            spectrum,
        }
    }
}

/// Render readings as one raw log, the way the logger concatenates them.
pub fn render_raw_log(readings: &[RawReading]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (i, reading) in readings.iter().enumerate() {
        lines.push(if i == 0 { "{".into() } else { "}{".into() });
        render_reading(reading, &mut lines);
    }
    if !readings.is_empty() {
        lines.push("}".into());
    }
    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

fn render_reading(r: &RawReading, lines: &mut Vec<String>) {
    lines.push("    \"environment_sensor_set_reading\": {".into());
    lines.push(format!("        \"timestamp\": \"{}\",", r.timestamp));
    for (name, text) in &r.text_fields {
        lines.push(format!("        \"{name}\": \"{text}\","));
    }

    for s in &r.scalars {
        lines.push(format!("        \"{}\": {{", s.name));
        let mut members = vec![format!("\"value\": \"{}\"", s.value)];
        if let Some(unit) = &s.unit {
            members.push(format!("\"unit\": \"{unit}\""));
        }
        if let Some(raw) = s.raw_value {
            members.push(format!("\"rawValue\": \"{raw}\""));
        }
        let last = members.len() - 1;
        for (j, m) in members.into_iter().enumerate() {
            let sep = if j == last { "" } else { "," };
            lines.push(format!("            {m}{sep}"));
        }
        lines.push("        },".into());
    }

    lines.push("        \"spectrometer\": {".into());
    lines.push(format!(
        "            \"maxFixedIntensity\": \"{}\",",
        r.max_fixed_intensity
    ));
    lines.push(format!(
        "            \"integration time in ?s\": \"{}\",",
        r.integration_time_us
    ));
    lines.push("            \"band\": [".into());
    let bands = r.wavelengths.len().min(r.spectrum.len());
    for (j, (wl, sp)) in r.wavelengths.iter().zip(&r.spectrum).enumerate() {
        lines.push("                {".into());
        lines.push(format!("                    \"wavelength\": {wl:?},"));
        lines.push(format!("                    \"spectrum\": {sp:?}"));
        let sep = if j + 1 == bands { "" } else { "," };
        lines.push(format!("                }}{sep}"));
    }
    lines.push("            ]".into());
    lines.push("        }".into());
    lines.push("    }".into());
}
