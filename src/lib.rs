//! Conversion of environmental logger JSON streams into self-describing
//! Parquet containers.
//!
//! The logger writes one JSON object per reading with no array around them
//! and no commas between them, and embeds a spectrometer band table in every
//! reading. [`data`] repairs that stream and parses it into typed reading
//! records plus the wavelength/spectrum arrays; [`container`] maps those onto
//! a dimensioned variable model (time, wavelength, time × wavelength) and
//! stores it as Parquet. [`driver`] is the batch glue used by the binary.

pub mod cli;
pub mod container;
pub mod data;
pub mod driver;
pub mod error;

pub use error::{ConvertError, Result};
