//! Parquet storage for [`Container`]s.
//!
//! Layout of a container file:
//! * one row per step of the `time` dimension;
//! * every time-indexed variable is a column: `Float32` or `Utf8` for 1-D
//!   variables, `FixedSizeList<Float32>` for (time, wavelength) variables;
//! * a column's dimensions and attributes (`units`, ...) live in the Arrow
//!   field metadata;
//! * dimensions, variable order, global attributes and every variable that is
//!   not time-indexed (constant text, the wavelength axis) live in the schema
//!   key/value metadata as JSON.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, FixedSizeListArray, Float32Array, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Container, Dimension, Variable, VariableData, TIME_DIM};
use crate::error::{ConvertError, Result};

/// Extension of container files.
pub const CONTAINER_EXTENSION: &str = "parquet";

const DIMENSIONS_KEY: &str = "container:dimensions";
const VARIABLES_KEY: &str = "container:variables";
const ATTRIBUTES_KEY: &str = "container:attributes";
const VARIABLE_PREFIX: &str = "container:variable:";
/// Field metadata key holding a column's dimension names.
const FIELD_DIMS_KEY: &str = "container:dims";

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write `container` to `path`, replacing any existing file.
pub fn write_container(container: &Container, path: &Path) -> Result<()> {
    let rows = container.time_len();

    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    let mut metadata = HashMap::new();

    for var in container.variables() {
        if var.is_time_indexed() {
            let (field, column) = to_column(container, var)?;
            fields.push(field);
            columns.push(column);
        } else {
            metadata.insert(format!("{VARIABLE_PREFIX}{}", var.name), to_json(var)?);
        }
    }

    let order: Vec<&str> = container.variables().iter().map(|v| v.name.as_str()).collect();
    metadata.insert(DIMENSIONS_KEY.to_string(), to_json(container.dimensions())?);
    metadata.insert(VARIABLES_KEY.to_string(), to_json(&order)?);
    metadata.insert(ATTRIBUTES_KEY.to_string(), to_json(container.attributes())?);

    let schema = Arc::new(Schema::new_with_metadata(fields, metadata));
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    let batch = RecordBatch::try_new_with_options(schema.clone(), columns, &options)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn to_column(container: &Container, var: &Variable) -> Result<(Field, ArrayRef)> {
    let mut field_meta: HashMap<String, String> = var
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    field_meta.insert(FIELD_DIMS_KEY.to_string(), to_json(&var.dims)?);

    let (data_type, column): (DataType, ArrayRef) = match (&var.data, var.dims.len()) {
        (VariableData::Float(values), 1) => {
            (DataType::Float32, Arc::new(Float32Array::from(values.clone())))
        }
        (VariableData::Text(values), 1) => {
            (DataType::Utf8, Arc::new(StringArray::from(values.clone())))
        }
        (VariableData::Float(values), 2) => {
            let inner = container
                .dimension(&var.dims[1])
                .map(|d| d.len)
                .unwrap_or_default();
            let size = i32::try_from(inner).map_err(|_| {
                ConvertError::Metadata(format!("dimension '{}' is too long", var.dims[1]))
            })?;
            let item = Arc::new(Field::new("item", DataType::Float32, false));
            let list = FixedSizeListArray::try_new(
                item.clone(),
                size,
                Arc::new(Float32Array::from(values.clone())),
                None,
            )?;
            (DataType::FixedSizeList(item, size), Arc::new(list))
        }
        _ => {
            return Err(ConvertError::Metadata(format!(
                "variable '{}' with dimensions {:?} cannot be stored as a column",
                var.name, var.dims
            )))
        }
    };

    let field = Field::new(&var.name, data_type, false).with_metadata(field_meta);
    Ok((field, column))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read a container written by [`write_container`].
pub fn read_container(path: &Path) -> Result<Container> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;

    let meta = schema.metadata();
    let dimensions: Vec<Dimension> = from_json(meta, DIMENSIONS_KEY)?;
    let order: Vec<String> = from_json(meta, VARIABLES_KEY)?;
    let attributes: BTreeMap<String, String> = from_json(meta, ATTRIBUTES_KEY)?;

    let mut container = Container::new();
    for d in &dimensions {
        container.add_dimension(&d.name, d.len, d.unlimited)?;
    }
    for name in &order {
        let var = match meta.get(&format!("{VARIABLE_PREFIX}{name}")) {
            Some(json) => parse_json(json, name)?,
            None => from_column(&batch, name)?,
        };
        container.add_variable(var)?;
    }
    for (k, v) in attributes {
        container.set_attribute(k, v);
    }
    Ok(container)
}

fn from_column(batch: &RecordBatch, name: &str) -> Result<Variable> {
    let schema = batch.schema();
    let (idx, field) = schema
        .column_with_name(name)
        .ok_or_else(|| ConvertError::Metadata(format!("missing column '{name}'")))?;
    let column = batch.column(idx);

    let mut attributes: BTreeMap<String, String> = field
        .metadata()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let dims_json = attributes.remove(FIELD_DIMS_KEY).ok_or_else(|| {
        ConvertError::Metadata(format!("column '{name}' has no dimension list"))
    })?;
    let dims: Vec<String> = parse_json(&dims_json, name)?;

    let data = match column.data_type() {
        DataType::Float32 => VariableData::Float(float_values(column.as_ref(), name)?),
        DataType::Utf8 => {
            let arr = column
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| wrong_type(name))?;
            VariableData::Text((0..arr.len()).map(|i| arr.value(i).to_string()).collect())
        }
        DataType::FixedSizeList(_, _) => {
            let arr = column
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| wrong_type(name))?;
            VariableData::Float(float_values(arr.values().as_ref(), name)?)
        }
        other => {
            return Err(ConvertError::Metadata(format!(
                "column '{name}' has unsupported type {other:?}"
            )))
        }
    };

    Ok(Variable {
        name: name.to_string(),
        dims,
        data,
        attributes,
    })
}

fn float_values(array: &dyn Array, name: &str) -> Result<Vec<f32>> {
    let arr = array
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| wrong_type(name))?;
    Ok(arr.values().to_vec())
}

fn wrong_type(name: &str) -> ConvertError {
    ConvertError::Metadata(format!("column '{name}' does not match its declared type"))
}

// -- JSON metadata helpers --

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ConvertError::Metadata(e.to_string()))
}

fn from_json<T: DeserializeOwned>(meta: &HashMap<String, String>, key: &str) -> Result<T> {
    let json = meta
        .get(key)
        .ok_or_else(|| ConvertError::Metadata(format!("missing '{key}' entry")))?;
    parse_json(json, key)
}

fn parse_json<T: DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| ConvertError::Metadata(format!("{what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::WAVELENGTH_DIM;

    fn sample() -> Container {
        let mut c = Container::new();
        c.add_dimension(TIME_DIM, 2, true).unwrap();
        c.add_dimension(WAVELENGTH_DIM, 3, false).unwrap();
        c.add_variable(Variable::text(TIME_DIM, &[TIME_DIM], vec!["t0".into(), "t1".into()]))
            .unwrap();
        c.add_variable(Variable::text("station", &[], vec!["Thies Clima".into()]))
            .unwrap();
        c.add_variable(
            Variable::float("temperature", &[TIME_DIM], vec![20.5, 21.0])
                .with_attribute("units", "Celsius"),
        )
        .unwrap();
        c.add_variable(Variable::float(
            WAVELENGTH_DIM,
            &[WAVELENGTH_DIM],
            vec![500.0, 600.0, 700.0],
        ))
        .unwrap();
        c.add_variable(Variable::float(
            "spectrum",
            &[TIME_DIM, WAVELENGTH_DIM],
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
        ))
        .unwrap();
        c.set_attribute("history", "Thu Apr 07 12:00:07 2016: envlog-converter a b");
        c
    }

    #[test]
    fn container_survives_a_parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.parquet");
        let original = sample();

        write_container(&original, &path).unwrap();
        let restored = read_container(&path).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn units_are_field_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.parquet");
        write_container(&sample(), &path).unwrap();

        let file = File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let schema = builder.schema();
        let field = schema.field_with_name("temperature").unwrap();
        assert_eq!(field.metadata().get("units").map(String::as_str), Some("Celsius"));
        assert!(schema.field_with_name("station").is_err());
        assert!(matches!(
            schema.field_with_name("spectrum").unwrap().data_type(),
            DataType::FixedSizeList(_, 3)
        ));
    }

    #[test]
    fn empty_time_dimension_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.parquet");
        let mut c = Container::new();
        c.add_dimension(TIME_DIM, 0, true).unwrap();
        c.add_variable(Variable::text(TIME_DIM, &[TIME_DIM], vec![])).unwrap();

        write_container(&c, &path).unwrap();
        assert_eq!(read_container(&path).unwrap(), c);
    }

    #[test]
    fn reading_a_foreign_parquet_file_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.parquet");
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Float32, false)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Float32Array::from(vec![1.0f32]))],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        assert!(matches!(read_container(&path), Err(ConvertError::Metadata(_))));
    }
}
