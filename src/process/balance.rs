// src/process/balance.rs

use arrow::{
    array::{Array, ArrayRef, UInt32Array},
    compute::take,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::{
    config::SmoteConfig,
    error::{ProcessingError, ProcessingErrorKind},
    table::{as_f64, cell_text, float_array, Table},
};

/// Feature matrix and label column of a table, split apart for model code.
#[derive(Debug, Clone)]
pub struct Design {
    pub feature_names: Vec<String>,
    /// Row-major feature values.
    pub rows: Vec<Vec<f64>>,
    pub label_name: String,
    pub label: ArrayRef,
}

impl Design {
    /// Split `table` into numeric features and the `label` column. Every
    /// non-label column must be numeric and free of `NaN`.
    pub fn from_table(
        table: &Table,
        label: &str,
        kind: ProcessingErrorKind,
    ) -> Result<Self, ProcessingError> {
        let label_col = table.column(label).ok_or_else(|| {
            ProcessingError::new(kind, format!("label column `{}` not found", label))
        })?;

        let mut feature_names = Vec::new();
        let mut feature_cols: Vec<&[f64]> = Vec::new();
        for (name, col) in table.headers().iter().zip(table.columns()) {
            if name == label {
                continue;
            }
            let values = as_f64(col).ok_or_else(|| {
                ProcessingError::new(kind, format!("feature column `{}` is not numeric", name))
            })?;
            if values.iter().any(|v| v.is_nan()) {
                return Err(ProcessingError::new(
                    kind,
                    format!("feature column `{}` contains missing values", name),
                ));
            }
            feature_names.push(name.clone());
            feature_cols.push(values);
        }

        let rows = (0..table.n_rows())
            .map(|r| feature_cols.iter().map(|c| c[r]).collect())
            .collect();

        Ok(Self {
            feature_names,
            rows,
            label_name: label.to_string(),
            label: label_col.clone(),
        })
    }

    /// Row indices per class, classes in order of first appearance.
    pub fn class_indices(&self) -> Vec<(String, Vec<usize>)> {
        let mut order: Vec<(String, Vec<usize>)> = Vec::new();
        let mut slot: HashMap<String, usize> = HashMap::new();
        for row in 0..self.label.len() {
            let key = cell_text(&self.label, row);
            let idx = *slot.entry(key.clone()).or_insert_with(|| {
                order.push((key, Vec::new()));
                order.len() - 1
            });
            order[idx].1.push(row);
        }
        order
    }
}

/// Oversample every minority class with SMOTE until all classes match the
/// majority count. Original rows come first, synthetic rows after; the
/// label column is moved to the end.
pub fn balance(table: &Table, label: &str, config: &SmoteConfig) -> Result<Table, ProcessingError> {
    const KIND: ProcessingErrorKind = ProcessingErrorKind::BalancingFailure;

    let design = Design::from_table(table, label, KIND)?;
    let classes = design.class_indices();
    if classes.len() < 2 {
        return Err(ProcessingError::new(
            KIND,
            format!(
                "label column `{}` has {} class(es), need at least 2",
                label,
                classes.len()
            ),
        ));
    }

    let target = classes.iter().map(|(_, idx)| idx.len()).max().unwrap_or(0);
    let mut rng = ChaCha8Rng::seed_from_u64(config.random_state);

    let mut rows = design.rows.clone();
    let mut label_source: Vec<usize> = (0..design.label.len()).collect();

    for (class, members) in &classes {
        let needed = target - members.len();
        if needed == 0 {
            continue;
        }
        if members.len() < 2 {
            return Err(ProcessingError::new(
                KIND,
                format!(
                    "class `{}` has {} sample(s); SMOTE needs at least 2",
                    class,
                    members.len()
                ),
            ));
        }

        let k = config.k_neighbors.min(members.len() - 1);
        let mut neighbours: Vec<Option<Vec<usize>>> = vec![None; members.len()];

        for _ in 0..needed {
            let base = rng.gen_range(0..members.len());
            let nn = neighbours[base]
                .get_or_insert_with(|| nearest_neighbours(&design.rows, members, base, k));
            let pick = nn[rng.gen_range(0..nn.len())];
            let gap: f64 = rng.gen();

            let x = &design.rows[members[base]];
            let y = &design.rows[members[pick]];
            rows.push(x.iter().zip(y).map(|(a, b)| a + gap * (b - a)).collect());
            label_source.push(members[base]);
        }

        debug!(class = %class, original = members.len(), synthesized = needed, k, "oversampled class");
    }

    let mut headers = design.feature_names.clone();
    let mut columns: Vec<ArrayRef> = (0..headers.len())
        .map(|j| float_array(rows.iter().map(|r| r[j]).collect()))
        .collect();
    headers.push(design.label_name.clone());
    let label_source = UInt32Array::from_iter_values(label_source.into_iter().map(|i| i as u32));
    let label_column = take(&design.label, &label_source, None).map_err(|e| {
        ProcessingError::new(KIND, "gathering labels for synthetic rows").with_source(e)
    })?;
    columns.push(label_column);

    let balanced = Table::new(headers, columns).map_err(|e| {
        ProcessingError::new(KIND, "assembling balanced table").with_source(e)
    })?;

    info!(
        before = table.n_rows(),
        after = balanced.n_rows(),
        per_class = target,
        "data balanced successfully"
    );
    Ok(balanced)
}

/// Positions (within `members`) of the `k` rows closest to `members[base]`
/// by Euclidean distance, excluding itself. Ties go to the lower position.
fn nearest_neighbours(rows: &[Vec<f64>], members: &[usize], base: usize, k: usize) -> Vec<usize> {
    let x = &rows[members[base]];
    let mut dists: Vec<(f64, usize)> = members
        .iter()
        .enumerate()
        .filter(|&(pos, _)| pos != base)
        .map(|(pos, &row)| {
            let d: f64 = x.iter().zip(&rows[row]).map(|(a, b)| (a - b).powi(2)).sum();
            (d, pos)
        })
        .collect();
    dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    dists.into_iter().take(k).map(|(_, pos)| pos).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::string_array;

    fn imbalanced(n_major: usize, n_minor: usize) -> Table {
        let n = n_major + n_minor;
        let lead: Vec<f64> = (0..n).map(|i| (i % 50) as f64).collect();
        let price: Vec<f64> = (0..n).map(|i| 50.0 + (i % 17) as f64 * 3.0).collect();
        let status: Vec<f64> = (0..n).map(|i| if i < n_major { 0.0 } else { 1.0 }).collect();
        Table::new(
            vec!["booking_status".into(), "lead_time".into(), "price".into()],
            vec![float_array(status), float_array(lead), float_array(price)],
        )
        .unwrap()
    }

    fn counts(t: &Table, label: &str) -> HashMap<String, usize> {
        let col = t.column(label).unwrap();
        let mut m = HashMap::new();
        for r in 0..col.len() {
            *m.entry(cell_text(col, r)).or_insert(0) += 1;
        }
        m
    }

    #[test]
    fn test_900_100_becomes_900_900() {
        let t = imbalanced(900, 100);
        let out = balance(&t, "booking_status", &SmoteConfig::default()).unwrap();

        let c = counts(&out, "booking_status");
        assert_eq!(c["0"], 900);
        assert_eq!(c["1"], 900);
        assert_eq!(out.n_rows(), 1800);
        // label moved last, features keep their order
        assert_eq!(out.headers(), &["lead_time", "price", "booking_status"]);
    }

    #[test]
    fn test_synthetic_rows_lie_within_minority_bounds() {
        let t = imbalanced(60, 10);
        let out = balance(&t, "booking_status", &SmoteConfig::default()).unwrap();

        // the minority rows are i = 60..70
        let lead = out.numeric("lead_time").unwrap();
        let price = out.numeric("price").unwrap();
        let minority_lead: Vec<f64> = (60..70).map(|i| (i % 50) as f64).collect();
        let minority_price: Vec<f64> = (60..70).map(|i| 50.0 + (i % 17) as f64 * 3.0).collect();
        let (lo_l, hi_l) = bounds(&minority_lead);
        let (lo_p, hi_p) = bounds(&minority_price);

        for r in 70..out.n_rows() {
            assert!(lead[r] >= lo_l && lead[r] <= hi_l);
            assert!(price[r] >= lo_p && price[r] <= hi_p);
        }
        // original rows untouched and first
        assert_eq!(&lead[..70], t.numeric("lead_time").unwrap());
    }

    fn bounds(v: &[f64]) -> (f64, f64) {
        (
            v.iter().cloned().fold(f64::INFINITY, f64::min),
            v.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        )
    }

    #[test]
    fn test_seeded_output_is_deterministic() {
        let t = imbalanced(40, 8);
        let a = balance(&t, "booking_status", &SmoteConfig::default()).unwrap();
        let b = balance(&t, "booking_status", &SmoteConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_text_labels_are_preserved() {
        let t = Table::new(
            vec!["x".into(), "status".into()],
            vec![
                float_array(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
                string_array(&["yes", "yes", "yes", "yes", "no", "no"]),
            ],
        )
        .unwrap();
        let out = balance(&t, "status", &SmoteConfig::default()).unwrap();
        let c = counts(&out, "status");
        assert_eq!((c["yes"], c["no"]), (4, 4));
    }

    #[test]
    fn test_failures() {
        let cfg = SmoteConfig::default();
        let t = imbalanced(10, 0);
        let err = balance(&t, "booking_status", &cfg).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::BalancingFailure);

        let err = balance(&imbalanced(10, 5), "missing", &cfg).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::BalancingFailure);

        let err = balance(&imbalanced(10, 1), "booking_status", &cfg).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::BalancingFailure);

        let text_feature = Table::new(
            vec!["x".into(), "y".into()],
            vec![string_array(&["a", "b"]), float_array(vec![0.0, 1.0])],
        )
        .unwrap();
        let err = balance(&text_feature, "y", &cfg).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::BalancingFailure);
    }
}
