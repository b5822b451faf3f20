//! Repair of the environment logger's concatenated-object stream.
//!
//! The logger appends one JSON object per reading with no enclosing array and
//! no separating commas; consecutive objects meet on a single junction line
//! (`}{`). Each reading also embeds its spectrometer bands as
//! `"wavelength": <n>` / `"spectrum": <n>` lines, which are harvested here
//! while the text is being stitched back into a JSON array.
//!
//! The scan is line driven. [`classify_line`] and [`extract_value`] hold every
//! assumption about the logger's text layout; the [`Scanner`] state machine
//! only sees [`LineEvent`]s.

use std::path::Path;

use log::debug;

use super::model::SpectralSeries;
use crate::error::{ConvertError, Result};

/// Key that opens every reading in the raw log.
pub const RECORD_MARKER: &str = "\"environment_sensor_set_reading\"";
const WAVELENGTH_KEY: &str = "\"wavelength\"";
const SPECTRUM_KEY: &str = "\"spectrum\"";

/// Replacement written over every boundary line.
const JUNCTION: &str = "},{";

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineEvent {
    /// The line opens a new reading.
    RecordStart,
    Wavelength(f64),
    Spectrum(f64),
    /// An array-closing line (`]`).
    ArrayEnd,
    Other,
}

/// Classify one raw line. `line_no` is 1-based and only used for errors.
pub fn classify_line(line: &str, line_no: usize) -> Result<LineEvent> {
    if line.contains(RECORD_MARKER) {
        Ok(LineEvent::RecordStart)
    } else if line.contains(WAVELENGTH_KEY) {
        extract_value(line, line_no).map(LineEvent::Wavelength)
    } else if line.contains(SPECTRUM_KEY) {
        extract_value(line, line_no).map(LineEvent::Spectrum)
    } else if line.trim_start().starts_with(']') {
        Ok(LineEvent::ArrayEnd)
    } else {
        Ok(LineEvent::Other)
    }
}

/// Pull the number out of a `"key": value,` line.
///
/// The value is whatever follows the first colon, minus the trailing line
/// punctuation (carriage return, whitespace, one comma). This is a textual
/// convention of the logger, not JSON parsing: anything else on the line makes
/// the conversion fail.
pub fn extract_value(line: &str, line_no: usize) -> Result<f64> {
    let invalid = |text: &str| ConvertError::InvalidNumber {
        line: line_no,
        text: text.trim().to_string(),
    };
    let (_, rest) = line.split_once(':').ok_or_else(|| invalid(line))?;
    let rest = rest.trim_end();
    let text = rest.strip_suffix(',').unwrap_or(rest).trim();
    text.parse::<f64>().map_err(|_| invalid(text))
}

// ---------------------------------------------------------------------------
// Scanner state machine
// ---------------------------------------------------------------------------

/// Where the scanner is inside the current reading.
///
/// The array states only track position: a `]` leaves them for `InRecord`
/// without closing anything. Wavelength and spectrum values accumulate for
/// the whole reading and the pair is pushed when the reading ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    OutsideRecord,
    InRecord,
    InWavelengthArray,
    InSpectrumArray,
}

/// Walks the classified lines and collects boundaries and spectrometer data.
#[derive(Debug)]
pub struct Scanner {
    state: ScanState,
    records: usize,
    boundaries: Vec<usize>,
    series: SpectralSeries,
    wavelengths: Vec<f64>,
    spectrum: Vec<f64>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            state: ScanState::OutsideRecord,
            records: 0,
            boundaries: Vec::new(),
            series: SpectralSeries::default(),
            wavelengths: Vec::new(),
            spectrum: Vec::new(),
        }
    }
}

impl Scanner {
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Feed the event for line `idx` (0-based).
    pub fn step(&mut self, idx: usize, event: LineEvent) -> Result<()> {
        match event {
            LineEvent::RecordStart => {
                if self.records > 0 {
                    // The line before a repeated marker joins two objects.
                    if let Some(boundary) = idx.checked_sub(1) {
                        self.boundaries.push(boundary);
                    }
                    self.finish_record();
                }
                self.records += 1;
                self.state = ScanState::InRecord;
            }
            LineEvent::Wavelength(v) => {
                self.require_record(idx, "wavelength")?;
                self.wavelengths.push(v);
                self.state = ScanState::InWavelengthArray;
            }
            LineEvent::Spectrum(v) => {
                self.require_record(idx, "spectrum")?;
                self.spectrum.push(v);
                self.state = ScanState::InSpectrumArray;
            }
            LineEvent::ArrayEnd => {
                if matches!(
                    self.state,
                    ScanState::InWavelengthArray | ScanState::InSpectrumArray
                ) {
                    self.state = ScanState::InRecord;
                }
            }
            LineEvent::Other => {}
        }
        Ok(())
    }

    /// Close the last record and hand back boundaries plus the series.
    pub fn finish(mut self) -> (Vec<usize>, SpectralSeries, usize) {
        if self.records > 0 {
            self.finish_record();
        }
        (self.boundaries, self.series, self.records)
    }

    fn finish_record(&mut self) {
        self.series
            .wavelengths
            .push(std::mem::take(&mut self.wavelengths));
        self.series.spectra.push(std::mem::take(&mut self.spectrum));
    }

    fn require_record(&self, idx: usize, what: &str) -> Result<()> {
        if self.state == ScanState::OutsideRecord {
            return Err(ConvertError::SpectrumShape(format!(
                "{what} value on line {} precedes the first reading",
                idx + 1
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Result of repairing one log.
#[derive(Debug, Clone)]
pub struct RepairedLog {
    /// The log rewritten as a JSON array of reading objects.
    pub text: String,
    /// Spectrometer arrays, one entry per reading.
    pub series: SpectralSeries,
    /// Number of readings seen by the scanner.
    pub records: usize,
}

/// Repair raw log text in memory.
pub fn repair_text(raw: &str) -> Result<RepairedLog> {
    let mut lines: Vec<&str> = raw.split('\n').collect();

    let mut scanner = Scanner::default();
    for (idx, line) in lines.iter().enumerate() {
        let event = classify_line(line, idx + 1)?;
        scanner.step(idx, event)?;
    }
    let (boundaries, series, records) = scanner.finish();

    for &b in &boundaries {
        lines[b] = JUNCTION;
    }

    let first_open = lines.first().is_some_and(|l| l.contains('['));
    let last_close = lines.last().is_some_and(|l| l.contains(']'));
    let text = if !first_open && !last_close {
        format!("[\n{}\n]", lines.join("\n"))
    } else {
        lines.join("\n")
    };

    debug!(
        "repaired {records} readings ({} boundaries, {} spectra)",
        boundaries.len(),
        series.spectra.len()
    );
    Ok(RepairedLog {
        text,
        series,
        records,
    })
}

/// Repair the log at `path`, rewriting the file in place as strict JSON.
///
/// Running this on a file it already normalized is not supported.
pub fn repair_file(path: &Path) -> Result<RepairedLog> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
    let repaired = repair_text(&raw)?;
    std::fs::write(path, &repaired.text).map_err(|e| ConvertError::io(path, e))?;
    Ok(repaired)
}
