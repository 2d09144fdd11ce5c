// src/table/mod.rs

pub mod csv_io;
pub mod parquet;

use arrow::{
    array::{Array, ArrayRef, Float64Array, Float64Builder, StringArray, StringBuilder, UInt32Array},
    compute::take_record_batch,
    datatypes::{DataType, Field, Float64Type, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
    row::{RowConverter, SortField},
    util::display::array_value_to_string,
};
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("parquet: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),
    #[error("shape: {0}")]
    Shape(String),
}

/// A CSV exactly as it sits on disk: header plus string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> RawTable {
        RawTable {
            headers: self.headers.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

pub fn float_array(values: Vec<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

pub fn string_array<S: AsRef<str>>(values: &[S]) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values.iter().map(|s| s.as_ref())))
}

/// Values of a Float64 column; `None` for any other type.
pub fn as_f64(array: &ArrayRef) -> Option<&[f64]> {
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .map(|a| &a.values()[..])
}

pub fn type_name(array: &ArrayRef) -> &'static str {
    match array.data_type() {
        DataType::Float64 => "numeric",
        DataType::Utf8 => "text",
        _ => "other",
    }
}

/// The cell rendered the way it is written to CSV.
pub fn cell_text(array: &ArrayRef, row: usize) -> String {
    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        format_number(a.value(row))
    } else if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        a.value(row).to_string()
    } else {
        array_value_to_string(array, row).unwrap_or_default()
    }
}

/// Shortest round-trip rendering; `NaN` becomes an empty cell.
pub fn format_number(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

/// Float column rewritten so equal values share one bit pattern: every NaN
/// is one value and `-0.0` is `0.0`. Used only for row keys.
fn canonical(array: &ArrayRef) -> ArrayRef {
    match array.as_any().downcast_ref::<Float64Array>() {
        Some(a) => Arc::new(a.unary::<_, Float64Type>(|v| {
            if v.is_nan() {
                f64::NAN
            } else if v == 0.0 {
                0.0
            } else {
                v
            }
        })),
        None => array.clone(),
    }
}

/// Named, typed columns held in an arrow [`RecordBatch`]: Float64 for
/// numeric data, Utf8 for text.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    batch: RecordBatch,
    headers: Vec<String>,
}

impl Table {
    pub fn new(headers: Vec<String>, columns: Vec<ArrayRef>) -> Result<Self, TableError> {
        if headers.len() != columns.len() {
            return Err(TableError::Shape(format!(
                "{} headers for {} columns",
                headers.len(),
                columns.len()
            )));
        }

        let mut seen = HashSet::new();
        for h in &headers {
            if !seen.insert(h.as_str()) {
                return Err(TableError::Shape(format!("duplicate column `{}`", h)));
            }
        }

        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let fields: Vec<Field> = headers
            .iter()
            .zip(&columns)
            .map(|(name, col)| Field::new(name, col.data_type().clone(), true))
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(n_rows));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;

        Ok(Self { batch, headers })
    }

    /// Type every column of `raw`: Float64 when each non-empty cell parses
    /// as `f64` (empty cells become `NaN`), Utf8 otherwise.
    pub fn from_raw(raw: &RawTable) -> Result<Self, TableError> {
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(raw.headers.len());

        for idx in 0..raw.headers.len() {
            let cells = raw.rows.iter().map(|r| r[idx].trim());
            let all_numeric = cells
                .clone()
                .all(|c| c.is_empty() || c.parse::<f64>().is_ok());
            let any_value = cells.clone().any(|c| !c.is_empty());

            if all_numeric && any_value {
                let mut b = Float64Builder::with_capacity(raw.rows.len());
                for c in cells {
                    b.append_value(c.parse::<f64>().unwrap_or(f64::NAN));
                }
                columns.push(Arc::new(b.finish()));
            } else {
                let mut b = StringBuilder::new();
                for r in &raw.rows {
                    b.append_value(&r[idx]);
                }
                columns.push(Arc::new(b.finish()));
            }
        }

        Self::new(raw.headers.clone(), columns)
    }

    pub fn to_raw(&self) -> RawTable {
        let columns = self.batch.columns();
        let rows = (0..self.n_rows())
            .map(|r| columns.iter().map(|c| cell_text(c, r)).collect())
            .collect();
        RawTable {
            headers: self.headers.clone(),
            rows,
        }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn n_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn n_cols(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &[ArrayRef] {
        self.batch.columns()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.column_index(name).map(|i| self.batch.column(i))
    }

    /// Values of `name` when it is a numeric column.
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        self.column(name).and_then(as_f64)
    }

    /// Copy of the table with `name` replaced by `column`.
    pub fn with_column(&self, name: &str, column: ArrayRef) -> Result<Table, TableError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::Shape(format!("no column `{}`", name)))?;
        if column.len() != self.n_rows() {
            return Err(TableError::Shape(format!(
                "replacement for `{}` has {} rows, expected {}",
                name,
                column.len(),
                self.n_rows()
            )));
        }
        let mut columns = self.batch.columns().to_vec();
        columns[idx] = column;
        Table::new(self.headers.clone(), columns)
    }

    fn project(&self, indices: &[usize]) -> Result<Table, TableError> {
        Ok(Table {
            batch: self.batch.project(indices)?,
            headers: indices.iter().map(|&i| self.headers[i].clone()).collect(),
        })
    }

    /// Copy without the named columns; names that are absent are ignored.
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, TableError> {
        let drop: HashSet<&str> = names.iter().map(|s| s.as_ref()).collect();
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !drop.contains(h.as_str()))
            .map(|(i, _)| i)
            .collect();
        self.project(&keep)
    }

    /// Copy holding exactly the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, TableError> {
        let indices = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column_index(name)
                    .ok_or_else(|| TableError::Shape(format!("no column `{}`", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.project(&indices)
    }

    pub fn take_rows(&self, indices: &[usize]) -> Result<Table, TableError> {
        let indices = UInt32Array::from_iter_values(indices.iter().map(|&i| i as u32));
        Ok(Table {
            batch: take_record_batch(&self.batch, &indices)?,
            headers: self.headers.clone(),
        })
    }

    /// Copy without exact duplicate rows, keeping each first occurrence.
    /// `NaN` equals `NaN` here.
    pub fn dedup_rows(&self) -> Result<Table, TableError> {
        if self.n_cols() == 0 {
            return Ok(self.clone());
        }

        let fields = self
            .columns()
            .iter()
            .map(|c| SortField::new(c.data_type().clone()))
            .collect();
        let converter = RowConverter::new(fields)?;
        let keyed: Vec<ArrayRef> = self.columns().iter().map(canonical).collect();
        let rows = converter.convert_columns(&keyed)?;

        let mut seen = HashSet::with_capacity(rows.num_rows());
        let keep: Vec<usize> = (0..rows.num_rows())
            .filter(|&i| seen.insert(rows.row(i)))
            .collect();
        self.take_rows(&keep)
    }

    /// Conform to the `columns` schema: present columns are copied in that
    /// order, missing ones are filled with `fill`, extra ones are dropped.
    pub fn reindex<S: AsRef<str>>(&self, columns: &[S], fill: f64) -> Result<Table, TableError> {
        let n_rows = self.n_rows();
        let (headers, arrays): (Vec<String>, Vec<ArrayRef>) = columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let col = self
                    .column(name)
                    .cloned()
                    .unwrap_or_else(|| float_array(vec![fill; n_rows]));
                (name.to_string(), col)
            })
            .unzip();

        // keep the row count when no columns survive
        let fields: Vec<Field> = headers
            .iter()
            .zip(&arrays)
            .map(|(name, col)| Field::new(name, col.data_type().clone(), true))
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(n_rows));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Ok(Table { batch, headers })
    }
}
