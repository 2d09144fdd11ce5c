// src/process/preprocess.rs

use tracing::{debug, info, warn};

use super::{
    encode::{encode_column, EncoderSet, LabelEncoder},
    skew::{log1p_column, skewness},
};
use crate::{
    config::ProcessingConfig,
    error::{ProcessingError, ProcessingErrorKind},
    table::{float_array, type_name, Table},
};

/// Output of [`preprocess`]: the cleaned table plus the encoders that
/// produced its categorical codes.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub table: Table,
    pub encoders: EncoderSet,
    /// Numerical columns that were log-transformed.
    pub log_transformed: Vec<String>,
}

/// Drop identifier columns, remove duplicate rows, label-encode the
/// categorical columns and log-transform skewed numerical columns.
///
/// With `fitted = None` each categorical column gets an encoder fitted on
/// this table. With `Some(set)` the encoders in `set` are reused, and only
/// columns it does not cover are fitted locally.
pub fn preprocess(
    table: &Table,
    config: &ProcessingConfig,
    fitted: Option<&EncoderSet>,
) -> Result<Preprocessed, ProcessingError> {
    // 1) identifiers out, duplicates out
    let mut out = table
        .drop_columns(&config.drop_columns)
        .and_then(|t| t.dedup_rows())
        .map_err(|e| {
            ProcessingError::new(
                ProcessingErrorKind::PreprocessingFailure,
                "dropping identifier columns and duplicate rows",
            )
            .with_source(e)
        })?;
    debug!(
        before = table.n_rows(),
        after = out.n_rows(),
        "dropped identifier columns and duplicate rows"
    );

    // 2) label encoding
    info!("applying label encoding");
    let mut used = EncoderSet::default();
    for name in &config.categorical_columns {
        let Some(column) = out.column(name) else {
            continue;
        };

        let encoder = match fitted.and_then(|set| set.get(name)) {
            Some(enc) => enc.clone(),
            None => {
                if fitted.is_some() {
                    warn!(column = %name, "no fitted encoder for column, fitting on this table");
                }
                LabelEncoder::fit(column)
            }
        };

        let encoded = encode_column(name, &encoder, column);
        out = out.with_column(name, encoded).map_err(|e| {
            ProcessingError::new(
                ProcessingErrorKind::PreprocessingFailure,
                format!("encoding column `{}`", name),
            )
            .with_source(e)
        })?;
        used.insert(name, encoder);
    }
    used.log_mappings();

    // 3) skewness
    info!("handling skewness");
    let mut log_transformed = Vec::new();
    for name in &config.numerical_columns {
        let values = match (out.numeric(name), out.column(name)) {
            (Some(v), _) => v,
            (None, Some(other)) => {
                return Err(ProcessingError::new(
                    ProcessingErrorKind::PreprocessingFailure,
                    format!(
                        "numerical column `{}` holds {} values",
                        name,
                        type_name(other)
                    ),
                ))
            }
            (None, None) => {
                return Err(ProcessingError::new(
                    ProcessingErrorKind::PreprocessingFailure,
                    format!("numerical column `{}` is missing", name),
                ))
            }
        };

        let skew = skewness(values);
        debug!(column = %name, skew, "skewness");
        if skew > config.skewness_threshold {
            let transformed = float_array(log1p_column(values));
            out = out.with_column(name, transformed).map_err(|e| {
                ProcessingError::new(
                    ProcessingErrorKind::PreprocessingFailure,
                    format!("log-transforming `{}`", name),
                )
                .with_source(e)
            })?;
            log_transformed.push(name.clone());
        }
    }
    if !log_transformed.is_empty() {
        info!(columns = ?log_transformed, "applied log1p to skewed columns");
    }

    Ok(Preprocessed {
        table: out,
        encoders: used,
        log_transformed,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        config::{EncoderFit, ForestConfig, SmoteConfig},
        process::encode::UNKNOWN_CODE,
        table::string_array,
    };

    pub(crate) fn processing_config() -> ProcessingConfig {
        ProcessingConfig {
            categorical_columns: vec!["room_type".into(), "booking_status".into()],
            numerical_columns: vec!["lead_time".into(), "price".into()],
            skewness_threshold: 0.5,
            no_of_features: 2,
            label_column: "booking_status".into(),
            drop_columns: vec!["Unnamed: 0".into(), "Booking_ID".into()],
            encoder_fit: EncoderFit::default(),
            smote: SmoteConfig::default(),
            forest: ForestConfig::default(),
            write_parquet: false,
        }
    }

    fn sample() -> Table {
        // lead_time: long right tail, skew ~3; price: symmetric-ish, skew ~0.2
        let lead_time = vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 60.0];
        let price = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 20.0];
        let ids: Vec<String> = (0..10).map(|i| format!("INN{:05}", i)).collect();
        let status: Vec<&str> = (0..10)
            .map(|i| if i < 7 { "Not_Canceled" } else { "Canceled" })
            .collect();
        Table::new(
            vec![
                "Booking_ID".into(),
                "room_type".into(),
                "lead_time".into(),
                "price".into(),
                "booking_status".into(),
            ],
            vec![
                string_array(&ids),
                string_array(&["B", "A", "C", "A", "B", "A", "C", "A", "B", "A"]),
                float_array(lead_time),
                float_array(price),
                string_array(&status),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_drops_ids_encodes_and_corrects_skew() {
        let cfg = processing_config();
        let input = sample();
        assert!(skewness(input.numeric("lead_time").unwrap()) > 2.5);
        let price_skew = skewness(input.numeric("price").unwrap());
        assert!(price_skew > 0.0 && price_skew < 0.5, "{}", price_skew);

        let out = preprocess(&input, &cfg, None).unwrap();

        assert!(!out.table.contains("Booking_ID"));
        assert_eq!(
            out.table.numeric("room_type"),
            Some(&[1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 2.0, 0.0, 1.0, 0.0][..])
        );
        assert_eq!(out.log_transformed, vec!["lead_time".to_string()]);

        let lead = out.table.numeric("lead_time").unwrap();
        assert!((lead[9] - 61.0f64.ln()).abs() < 1e-12);
        assert_eq!(out.table.numeric("price"), input.numeric("price"));

        // the input is never modified
        assert!(input.contains("Booking_ID"));
    }

    #[test]
    fn test_removes_duplicates_after_dropping_ids() {
        let cfg = processing_config();
        let t = Table::new(
            vec!["Booking_ID".into(), "lead_time".into(), "price".into()],
            vec![
                string_array(&["a", "b", "c", "d"]),
                float_array(vec![1.0, 1.0, 2.0, 3.0]),
                float_array(vec![5.0, 5.0, 6.0, 7.0]),
            ],
        )
        .unwrap();

        let out = preprocess(&t, &cfg, None).unwrap();
        assert_eq!(out.table.n_rows(), 3);
    }

    #[test]
    fn test_fixed_point_on_clean_table() {
        let cfg = processing_config();
        let clean = Table::new(
            vec!["room_type".into(), "lead_time".into(), "price".into()],
            vec![
                float_array(vec![0.0, 1.0, 2.0, 1.0]),
                float_array(vec![1.0, 2.0, 3.0, 4.0]),
                float_array(vec![4.0, 3.0, 2.0, 1.0]),
            ],
        )
        .unwrap();
        let out = preprocess(&clean, &cfg, None).unwrap();
        assert_eq!(out.table, clean);
        assert!(out.log_transformed.is_empty());
    }

    #[test]
    fn test_reuses_fitted_encoders() {
        let cfg = processing_config();
        let train = preprocess(&sample(), &cfg, None).unwrap();

        let test = Table::new(
            vec!["room_type".into(), "lead_time".into(), "price".into()],
            vec![
                string_array(&["C", "D", "C"]),
                float_array(vec![1.0, 2.0, 3.0]),
                float_array(vec![1.0, 2.0, 3.0]),
            ],
        )
        .unwrap();

        let shared = preprocess(&test, &cfg, Some(&train.encoders)).unwrap();
        assert_eq!(
            shared.table.numeric("room_type"),
            Some(&[2.0, UNKNOWN_CODE, 2.0][..])
        );

        // refitting per table assigns codes from this table's own domain
        let refit = preprocess(&test, &cfg, None).unwrap();
        assert_eq!(refit.table.numeric("room_type"), Some(&[0.0, 1.0, 0.0][..]));
    }

    #[test]
    fn test_missing_or_text_numerical_column_fails() {
        let cfg = processing_config();
        let t = Table::new(vec!["lead_time".into()], vec![float_array(vec![1.0])]).unwrap();
        let err = preprocess(&t, &cfg, None).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::PreprocessingFailure);

        let t = Table::new(
            vec!["lead_time".into(), "price".into()],
            vec![float_array(vec![1.0]), string_array(&["x"])],
        )
        .unwrap();
        let err = preprocess(&t, &cfg, None).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::PreprocessingFailure);
    }
}
