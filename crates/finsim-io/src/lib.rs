#![deny(warnings)]

//! Flat-file export of the yearly dataset (CSV or Parquet) via Arrow.
//!
//! Files carry a `year` Int32 column followed by one Float64 column per
//! series, named by [`Series::column`].

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array};
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use finsim_core::{Dataset, Series, ValidationError};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Name of the key column.
pub const YEAR_COLUMN: &str = "year";

/// Errors raised while writing or reading exports.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A column has the wrong type, nulls, or is missing.
    #[error("column {column}: {reason}")]
    Column { column: String, reason: String },
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
}

fn column_error(column: &str, reason: &str) -> ExportError {
    ExportError::Column {
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

/// Supported flat file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "parquet" | "pq" => Ok(ExportFormat::Parquet),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// `<slug>_financial_data_<start>_<end>.<ext>`
pub fn export_file_name(slug: &str, start: i32, end: i32, format: ExportFormat) -> String {
    format!(
        "{}_financial_data_{}_{}.{}",
        slug,
        start,
        end,
        format.extension()
    )
}

fn schema_for<'a>(series: impl Iterator<Item = &'a Series>) -> SchemaRef {
    let mut fields = vec![Field::new(YEAR_COLUMN, DataType::Int32, false)];
    fields.extend(series.map(|s| Field::new(s.column(), DataType::Float64, false)));
    Arc::new(Schema::new(fields))
}

/// Arrow schema for the columns present in `ds`.
pub fn dataset_schema(ds: &Dataset) -> SchemaRef {
    let present: Vec<Series> = ds.columns().map(|(s, _)| s).collect();
    schema_for(present.iter())
}

/// Convert the dataset into a single record batch.
pub fn to_record_batch(ds: &Dataset) -> Result<RecordBatch, ExportError> {
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(1 + Series::ALL.len());
    arrays.push(Arc::new(Int32Array::from(ds.years().to_vec())));
    for (_, values) in ds.columns() {
        arrays.push(Arc::new(Float64Array::from(values.to_vec())));
    }
    Ok(RecordBatch::try_new(dataset_schema(ds), arrays)?)
}

/// Rebuild a dataset from record batches sharing one schema.
pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Dataset, ExportError> {
    let Some(first) = batches.first() else {
        return Ok(Dataset::default());
    };
    let schema = first.schema();
    let mut years: Vec<i32> = Vec::new();
    let mut columns: BTreeMap<Series, Vec<f64>> = BTreeMap::new();
    for field in schema.fields() {
        if field.name() != YEAR_COLUMN {
            let series: Series = field.name().parse()?;
            if columns.insert(series, Vec::new()).is_some() {
                return Err(ValidationError::DuplicateSeries(series).into());
            }
        }
    }

    for batch in batches {
        let year_col = batch
            .column_by_name(YEAR_COLUMN)
            .ok_or_else(|| column_error(YEAR_COLUMN, "missing"))?;
        let year_arr = year_col
            .as_any()
            .downcast_ref::<Int32Array>()
            .ok_or_else(|| column_error(YEAR_COLUMN, "expected Int32"))?;
        if year_arr.null_count() > 0 {
            return Err(column_error(YEAR_COLUMN, "contains nulls"));
        }
        years.extend(year_arr.values().iter().copied());

        for (series, out) in columns.iter_mut() {
            let name = series.column();
            let arr = batch
                .column_by_name(name)
                .ok_or_else(|| column_error(name, "missing"))?
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| column_error(name, "expected Float64"))?;
            if arr.null_count() > 0 {
                return Err(column_error(name, "contains nulls"));
            }
            out.extend(arr.values().iter().copied());
        }
    }

    let mut ds = Dataset::try_new(years)?;
    for (series, values) in columns {
        ds.insert(series, values)?;
    }
    Ok(ds)
}

/// Write the dataset as CSV with a header row.
pub fn write_csv<P: AsRef<Path>>(path: P, ds: &Dataset) -> Result<(), ExportError> {
    let path = path.as_ref();
    let batch = to_record_batch(ds)?;
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .build(BufWriter::new(file));
    writer.write(&batch)?;
    writer.into_inner().flush()?;
    info!(path = %path.display(), rows = batch.num_rows(), "wrote csv");
    Ok(())
}

/// Build the schema of a CSV export from its header line.
fn schema_from_header(header: &str) -> Result<SchemaRef, ExportError> {
    let mut names = header
        .trim_end_matches(['\r', '\n'])
        .split(',')
        .map(|n| n.trim().trim_matches('"'));
    if names.next() != Some(YEAR_COLUMN) {
        return Err(column_error(YEAR_COLUMN, "must be the first column"));
    }
    let mut seen = BTreeSet::new();
    let mut series = Vec::new();
    for name in names {
        let s: Series = name.parse()?;
        if !seen.insert(s) {
            return Err(ValidationError::DuplicateSeries(s).into());
        }
        series.push(s);
    }
    Ok(schema_for(series.iter()))
}

/// Read a CSV export back. Columns are matched by header name.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Dataset, ExportError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut header = String::new();
    BufReader::new(&file).read_line(&mut header)?;
    let schema = schema_from_header(&header)?;
    file.rewind()?;
    debug!(columns = schema.fields().len(), "csv header parsed");

    let reader = ReaderBuilder::new(schema).with_header(true).build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let ds = from_record_batches(&batches)?;
    info!(path = %path.display(), rows = ds.len(), "read csv");
    Ok(ds)
}

/// Write the dataset as a Snappy-compressed Parquet file.
pub fn write_parquet<P: AsRef<Path>>(path: P, ds: &Dataset) -> Result<(), ExportError> {
    let path = path.as_ref();
    let batch = to_record_batch(ds)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    info!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}

pub fn read_parquet<P: AsRef<Path>>(path: P) -> Result<Dataset, ExportError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let ds = from_record_batches(&batches)?;
    info!(path = %path.display(), rows = ds.len(), "read parquet");
    Ok(ds)
}

/// Write in the given format.
pub fn write<P: AsRef<Path>>(
    path: P,
    ds: &Dataset,
    format: ExportFormat,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_csv(path, ds),
        ExportFormat::Parquet => write_parquet(path, ds),
    }
}

/// Read in the given format.
pub fn read<P: AsRef<Path>>(path: P, format: ExportFormat) -> Result<Dataset, ExportError> {
    match format {
        ExportFormat::Csv => read_csv(path),
        ExportFormat::Parquet => read_parquet(path),
    }
}
