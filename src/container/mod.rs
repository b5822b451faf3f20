/// Container layer: the dimensioned variable model, the builder that maps
/// reading records onto it, and Parquet storage.
///
/// ```text
///   ParsedLog ──► builder ──► Container ──► storage::write_container ──► .parquet
/// ```
pub mod builder;
pub mod storage;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Name of the record dimension.
pub const TIME_DIM: &str = "time";
/// Name of the spectrometer wavelength dimension.
pub const WAVELENGTH_DIM: &str = "wavelength";

// ---------------------------------------------------------------------------
// Dimension / Variable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
    /// Appendable along this dimension.
    pub unlimited: bool,
}

/// Values of a variable, flattened row-major over its dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum VariableData {
    Float(Vec<f32>),
    Text(Vec<String>),
}

impl VariableData {
    pub fn len(&self) -> usize {
        match self {
            VariableData::Float(v) => v.len(),
            VariableData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f32]> {
        match self {
            VariableData::Float(v) => Some(v),
            VariableData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            VariableData::Text(v) => Some(v),
            VariableData::Float(_) => None,
        }
    }
}

/// A named, dimensioned array with string attributes (`units`, ...).
///
/// A variable with no dimensions is a scalar and holds exactly one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: VariableData,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Variable {
    pub fn float(name: impl Into<String>, dims: &[&str], values: Vec<f32>) -> Self {
        Self::new(name, dims, VariableData::Float(values))
    }

    pub fn text(name: impl Into<String>, dims: &[&str], values: Vec<String>) -> Self {
        Self::new(name, dims, VariableData::Text(values))
    }

    fn new(name: impl Into<String>, dims: &[&str], data: VariableData) -> Self {
        Variable {
            name: name.into(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the first dimension is the record dimension.
    pub fn is_time_indexed(&self) -> bool {
        self.dims.first().is_some_and(|d| d == TIME_DIM)
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// An in-memory self-describing array container.
///
/// Variables keep their insertion order. Every insertion is checked against
/// the declared dimensions, so a `Container` is always internally consistent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    dimensions: Vec<Dimension>,
    variables: Vec<Variable>,
    attributes: BTreeMap<String, String>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dimension(&mut self, name: &str, len: usize, unlimited: bool) -> Result<()> {
        if self.dimension(name).is_some() {
            return Err(ConvertError::Metadata(format!(
                "dimension '{name}' is defined twice"
            )));
        }
        self.dimensions.push(Dimension {
            name: name.to_string(),
            len,
            unlimited,
        });
        Ok(())
    }

    /// Add a variable; its value count must equal the product of its
    /// dimension lengths.
    pub fn add_variable(&mut self, var: Variable) -> Result<()> {
        if self.variable(&var.name).is_some() {
            return Err(ConvertError::DuplicateVariable(var.name));
        }
        let mut expected = 1usize;
        for d in &var.dims {
            let dim = self.dimension(d).ok_or_else(|| {
                ConvertError::Metadata(format!(
                    "variable '{}' uses undefined dimension '{d}'",
                    var.name
                ))
            })?;
            expected *= dim.len;
        }
        if var.data.len() != expected {
            return Err(ConvertError::Metadata(format!(
                "variable '{}' has {} values, its dimensions need {expected}",
                var.name,
                var.data.len()
            )));
        }
        self.variables.push(var);
        Ok(())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Length of the record dimension (0 when absent).
    pub fn time_len(&self) -> usize {
        self.dimension(TIME_DIM).map_or(0, |d| d.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_must_match_their_dimensions() {
        let mut c = Container::new();
        c.add_dimension(TIME_DIM, 2, true).unwrap();
        c.add_dimension(WAVELENGTH_DIM, 3, false).unwrap();

        c.add_variable(Variable::float("spectrum", &[TIME_DIM, WAVELENGTH_DIM], vec![0.0; 6]))
            .unwrap();
        c.add_variable(Variable::text("station", &[], vec!["x".into()]))
            .unwrap();

        let short = Variable::float("short", &[TIME_DIM], vec![1.0]);
        assert!(matches!(c.add_variable(short), Err(ConvertError::Metadata(_))));

        let undefined = Variable::float("depth", &["depth"], vec![]);
        assert!(c.add_variable(undefined).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut c = Container::new();
        c.add_dimension(TIME_DIM, 1, true).unwrap();
        c.add_variable(Variable::float("a", &[TIME_DIM], vec![1.0])).unwrap();
        let err = c
            .add_variable(Variable::float("a", &[TIME_DIM], vec![2.0]))
            .unwrap_err();
        assert!(matches!(err, ConvertError::DuplicateVariable(n) if n == "a"));
        assert!(c.add_dimension(TIME_DIM, 1, true).is_err());
    }

    #[test]
    fn time_indexing() {
        let v = Variable::float("t", &[TIME_DIM, WAVELENGTH_DIM], vec![]);
        assert!(v.is_time_indexed());
        assert!(!Variable::float("w", &[WAVELENGTH_DIM], vec![]).is_time_indexed());
        assert!(!Variable::text("s", &[], vec![]).is_time_indexed());
    }
}
