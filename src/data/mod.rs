/// Data layer: raw log repair, parsing, and the reading record model.
///
/// Architecture:
/// ```text
///  raw logger .json (concatenated objects)
///        │
///        ▼
///   ┌──────────┐
///   │  repair   │  stitch objects into a JSON array, harvest spectra
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse array → Vec<ReadingRecord>, validate schema
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────────────────┐
///   │ ParsedLog { records, series } │  handed to the container builder
///   └──────────────────────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod repair;
pub mod sample;
pub mod units;
