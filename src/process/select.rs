// src/process/select.rs

use tracing::{debug, info};

use super::{balance::Design, forest::RandomForest};
use crate::{
    config::ForestConfig,
    error::{ProcessingError, ProcessingErrorKind},
    table::Table,
};

/// Features ranked by forest importance, most important first.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRanking {
    pub ranked: Vec<(String, f64)>,
}

impl FeatureRanking {
    pub fn top(&self, k: usize) -> Vec<String> {
        self.ranked.iter().take(k).map(|(name, _)| name.clone()).collect()
    }
}

/// Fit a random forest on every non-label column of `table` and rank the
/// features by mean decrease in impurity. Equal importances keep table
/// order.
pub fn rank_features(
    table: &Table,
    label: &str,
    config: &ForestConfig,
) -> Result<FeatureRanking, ProcessingError> {
    let design = Design::from_table(table, label, ProcessingErrorKind::FeatureSelectionFailure)?;

    let classes = design.class_indices();
    let mut labels = vec![0usize; design.rows.len()];
    for (class_id, (_, members)) in classes.iter().enumerate() {
        for &row in members {
            labels[row] = class_id;
        }
    }

    let mut forest = RandomForest::new(config.clone());
    forest.fit(&design.rows, &labels, classes.len());
    debug!(
        trees = forest.n_trees(),
        features = design.feature_names.len(),
        classes = classes.len(),
        "random forest fitted"
    );

    let mut ranked: Vec<(String, f64)> = design
        .feature_names
        .into_iter()
        .zip(forest.feature_importances().iter().copied())
        .collect();
    // sort_by is stable, so ties stay in table order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(FeatureRanking { ranked })
}

/// Keep the `k` most important features plus the label column (last).
pub fn select_features(
    table: &Table,
    label: &str,
    k: usize,
    config: &ForestConfig,
) -> Result<(Table, Vec<String>), ProcessingError> {
    const KIND: ProcessingErrorKind = ProcessingErrorKind::FeatureSelectionFailure;

    let n_features = table.n_cols().saturating_sub(usize::from(table.contains(label)));
    if k == 0 || k > n_features {
        return Err(ProcessingError::new(
            KIND,
            format!("cannot select {} of {} feature(s)", k, n_features),
        ));
    }

    let ranking = rank_features(table, label, config)?;
    for (name, importance) in &ranking.ranked {
        debug!(feature = %name, importance, "feature importance");
    }

    let selected = ranking.top(k);
    info!(features = ?selected, "top features selected");

    let mut keep = selected.clone();
    keep.push(label.to_string());
    let out = table
        .select(&keep)
        .map_err(|e| ProcessingError::new(KIND, "selecting feature columns").with_source(e))?;

    Ok((out, selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{float_array, string_array};

    fn forest() -> ForestConfig {
        ForestConfig {
            n_estimators: 20,
            ..ForestConfig::default()
        }
    }

    /// `lead_time` fully determines the label, the rest is noise.
    fn table() -> Table {
        let n = 400;
        let lead: Vec<f64> = (0..n).map(|i| (i % 200) as f64).collect();
        let label: Vec<f64> = lead.iter().map(|&v| if v >= 100.0 { 1.0 } else { 0.0 }).collect();
        let noise_a: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64).collect();
        let noise_b: Vec<f64> = (0..n).map(|i| ((i * 53) % 7) as f64).collect();
        let noise_c: Vec<f64> = (0..n).map(|i| ((i * 13) % 5) as f64).collect();
        Table::new(
            vec![
                "no_of_adults".into(),
                "lead_time".into(),
                "arrival_month".into(),
                "booking_status".into(),
                "no_of_weekend_nights".into(),
            ],
            vec![
                float_array(noise_a),
                float_array(lead),
                float_array(noise_b),
                float_array(label),
                float_array(noise_c),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_keeps_top_k_plus_label() {
        let (out, selected) = select_features(&table(), "booking_status", 2, &forest()).unwrap();

        assert_eq!(out.n_cols(), 3);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0], "lead_time");
        assert_eq!(out.headers().last().map(String::as_str), Some("booking_status"));
        assert_eq!(out.n_rows(), 400);
    }

    #[test]
    fn test_ranking_sums_to_one_and_is_deterministic() {
        let a = rank_features(&table(), "booking_status", &forest()).unwrap();
        let b = rank_features(&table(), "booking_status", &forest()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ranked.len(), 4);
        let total: f64 = a.ranked.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(a.ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_k_equal_to_feature_count_keeps_all() {
        let (out, selected) = select_features(&table(), "booking_status", 4, &forest()).unwrap();
        assert_eq!(out.n_cols(), 5);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn test_failures() {
        let err = select_features(&table(), "booking_status", 5, &forest()).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::FeatureSelectionFailure);

        let err = select_features(&table(), "missing", 2, &forest()).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::FeatureSelectionFailure);

        let text = Table::new(
            vec!["x".into(), "booking_status".into()],
            vec![string_array(&["a", "b"]), float_array(vec![0.0, 1.0])],
        )
        .unwrap();
        let err = select_features(&text, "booking_status", 1, &forest()).unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::FeatureSelectionFailure);
    }
}
