// src/process/encode.rs

use arrow::array::{Array, ArrayRef, Float64Builder};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, warn};

use crate::table::{as_f64, cell_text, format_number};

/// Code given to a category the encoder never saw while fitting.
pub const UNKNOWN_CODE: f64 = -1.0;

/// Category → consecutive integer code for one column.
///
/// Codes follow the sorted order of the distinct values: text sorts
/// lexicographically, numeric columns sort by value (so a column that is
/// already `0..n` encodes to itself).
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    lookup: BTreeMap<String, usize>,
}

impl LabelEncoder {
    pub fn fit(column: &ArrayRef) -> Self {
        let classes: Vec<String> = match as_f64(column) {
            Some(values) => {
                let mut distinct: Vec<f64> = values.to_vec();
                distinct.sort_by(|a, b| a.total_cmp(b));
                distinct.dedup_by(|a, b| a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()));
                distinct.into_iter().map(format_number).collect()
            }
            None => {
                let mut distinct: Vec<String> =
                    (0..column.len()).map(|row| cell_text(column, row)).collect();
                distinct.sort();
                distinct.dedup();
                distinct
            }
        };

        let lookup = classes
            .into_iter()
            .enumerate()
            .map(|(code, class)| (class, code))
            .collect();
        Self { lookup }
    }

    pub fn code(&self, value: &str) -> Option<usize> {
        self.lookup.get(value).copied()
    }

    /// Encode `column`; values outside the fitted classes become
    /// [`UNKNOWN_CODE`]. Returns the encoded column and how many cells were
    /// unknown.
    pub fn transform(&self, column: &ArrayRef) -> (ArrayRef, usize) {
        let mut unknown = 0;
        let mut codes = Float64Builder::with_capacity(column.len());
        for row in 0..column.len() {
            match self.code(&cell_text(column, row)) {
                Some(code) => codes.append_value(code as f64),
                None => {
                    unknown += 1;
                    codes.append_value(UNKNOWN_CODE);
                }
            }
        }
        (Arc::new(codes.finish()) as ArrayRef, unknown)
    }

    pub fn mapping(&self) -> BTreeMap<String, usize> {
        self.lookup.clone()
    }
}

/// Fitted encoders for every categorical column, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderSet {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderSet {
    pub fn insert(&mut self, column: &str, encoder: LabelEncoder) {
        self.encoders.insert(column.to_string(), encoder);
    }

    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    /// `{column: {category: code}}`, the form persisted to
    /// `label_mappings.json`.
    pub fn mappings(&self) -> BTreeMap<String, BTreeMap<String, usize>> {
        self.encoders
            .iter()
            .map(|(name, enc)| (name.clone(), enc.mapping()))
            .collect()
    }

    pub fn log_mappings(&self) {
        for (name, enc) in &self.encoders {
            info!("{} : {:?}", name, enc.mapping());
        }
    }
}

/// Encode `column` with `encoder`, warning about unseen categories.
pub(crate) fn encode_column(name: &str, encoder: &LabelEncoder, column: &ArrayRef) -> ArrayRef {
    let (encoded, unknown) = encoder.transform(column);
    if unknown > 0 {
        warn!(
            column = name,
            unknown, "categories not seen while fitting were encoded as {}", UNKNOWN_CODE
        );
    }
    encoded
}
