//! Parquet reader and writer for feature snapshots
//!
//! Schema: `timestamp` (µs, UTC), `entity_id` (utf8), `price` (f64), followed
//! by one nullable f64 column per feature.

use super::types::{DataSourceError, SnapshotRecord};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TIMESTAMP_COLUMN: &str = "timestamp";
const ENTITY_COLUMN: &str = "entity_id";
const PRICE_COLUMN: &str = "price";

/// Snapshot schema for a given set of feature names
pub fn snapshot_schema(feature_names: &[String]) -> Schema {
    let mut fields = vec![
        Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new(ENTITY_COLUMN, DataType::Utf8, false),
        Field::new(PRICE_COLUMN, DataType::Float64, false),
    ];
    for name in feature_names {
        fields.push(Field::new(name, DataType::Float64, true));
    }
    Schema::new(fields)
}

/// Writes snapshot records to Parquet
pub struct ParquetWriter {
    output_dir: PathBuf,
}

impl ParquetWriter {
    /// Create a new Parquet writer
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> Result<(), DataSourceError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Path of a named file in the output directory
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.parquet"))
    }

    /// Write records to `<output_dir>/<name>.parquet`, returning the path
    pub fn write_snapshots(
        &self,
        name: &str,
        records: &[SnapshotRecord],
    ) -> Result<PathBuf, DataSourceError> {
        self.ensure_dir()?;
        let path = self.file_path(name);

        let feature_names: Vec<String> = records
            .iter()
            .flat_map(|r| r.features.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let schema = Arc::new(snapshot_schema(&feature_names));
        let file = File::create(&path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let timestamps: Vec<i64> = records
            .iter()
            .map(|r| r.timestamp.timestamp_micros())
            .collect();
        let entity_ids: Vec<&str> = records.iter().map(|r| r.entity_id.as_str()).collect();
        let prices: Vec<f64> = records.iter().map(|r| r.price).collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
            Arc::new(StringArray::from(entity_ids)),
            Arc::new(Float64Array::from(prices)),
        ];

        for name in &feature_names {
            let values: Vec<Option<f64>> = records
                .iter()
                .map(|r| r.features.get(name).copied())
                .collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        let batch = RecordBatch::try_new(schema, columns)?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = records.len(), "Wrote snapshots to Parquet");

        Ok(path)
    }
}

/// Reader for snapshot Parquet files
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    /// Create a new reader for a Parquet file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read all snapshot records from the file
    pub fn read_snapshots(&self) -> Result<Vec<SnapshotRecord>, DataSourceError> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut records = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let timestamps = typed_column::<TimestampMicrosecondArray>(&batch, TIMESTAMP_COLUMN)?;
            let entity_ids = typed_column::<StringArray>(&batch, ENTITY_COLUMN)?;
            let prices = typed_column::<Float64Array>(&batch, PRICE_COLUMN)?;

            let schema = batch.schema();
            let mut feature_arrays: Vec<(&str, ArrayRef)> = Vec::new();
            for (idx, field) in schema.fields().iter().enumerate() {
                if matches!(
                    field.name().as_str(),
                    TIMESTAMP_COLUMN | ENTITY_COLUMN | PRICE_COLUMN
                ) {
                    continue;
                }
                let column = feature_column(batch.column(idx), field)?;
                feature_arrays.push((field.name().as_str(), column));
            }
            let feature_columns = feature_arrays
                .iter()
                .map(|(name, col)| {
                    col.as_any()
                        .downcast_ref::<Float64Array>()
                        .map(|col| (*name, col))
                        .ok_or_else(|| DataSourceError::Schema(format!("column {name} is not f64")))
                })
                .collect::<Result<Vec<_>, _>>()?;

            for i in 0..batch.num_rows() {
                if timestamps.is_null(i) || entity_ids.is_null(i) || prices.is_null(i) {
                    continue;
                }
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| DataSourceError::Schema("Invalid timestamp".into()))?;

                let features: BTreeMap<String, f64> = feature_columns
                    .iter()
                    .filter(|(_, col)| !col.is_null(i))
                    .map(|(name, col)| (name.to_string(), col.value(i)))
                    .filter(|(_, v)| v.is_finite())
                    .collect();

                records.push(SnapshotRecord {
                    timestamp,
                    entity_id: entity_ids.value(i).to_string(),
                    price: prices.value(i),
                    features,
                });
            }
        }

        tracing::debug!(path = ?self.path, count = records.len(), "Read snapshots from Parquet");

        Ok(records)
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Feature column as f64; numeric columns are cast, anything else is a schema error
fn feature_column(column: &ArrayRef, field: &Field) -> Result<ArrayRef, DataSourceError> {
    match column.data_type() {
        DataType::Float64 => Ok(Arc::clone(column)),
        dt if dt.is_numeric() => Ok(cast(column, &DataType::Float64)?),
        dt => Err(DataSourceError::Schema(format!(
            "feature column '{}' has non-numeric type {}",
            field.name(),
            dt
        ))),
    }
}

fn typed_column<'a, T: 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a T, DataSourceError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DataSourceError::Schema(format!("Missing column {name}")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DataSourceError::Schema(format!("Invalid {name} column")))
}
