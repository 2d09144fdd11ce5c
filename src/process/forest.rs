// src/process/forest.rs
//! Random forest classifier, used for its impurity-based feature importances.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::ForestConfig;

/// A single CART tree grown on Gini impurity. Only the impurity decrease
/// each feature earned while growing is kept.
#[derive(Debug, Clone)]
pub struct ClassificationTree {
    /// Total weighted impurity decrease per feature (unnormalised).
    importances: Vec<f64>,
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity_decrease: f64,
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// `max(1, floor(sqrt(n_features)))`, the usual classification default.
fn max_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt().floor() as usize).max(1)
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    /// Grow the subtree over `indices`, crediting each split's impurity
    /// decrease to its feature. Leaves are not stored.
    fn build(&mut self, indices: &mut [usize], depth: usize, rng: &mut ChaCha8Rng) {
        let counts = self.class_counts(indices);
        let n = indices.len();
        let impurity = gini(&counts, n);

        let depth_reached = self.max_depth.map_or(false, |d| depth >= d);
        if depth_reached || n < self.min_samples_split || impurity <= 0.0 {
            return;
        }

        let Some(split) = self.find_best_split(indices, &counts, impurity, rng) else {
            return;
        };

        self.importances[split.feature] += split.impurity_decrease;

        // partition in place: left side holds values <= threshold
        let mut mid = 0;
        for i in 0..n {
            if self.rows[indices[i]][split.feature] <= split.threshold {
                indices.swap(i, mid);
                mid += 1;
            }
        }

        let (left, right) = indices.split_at_mut(mid);
        self.build(left, depth + 1, rng);
        self.build(right, depth + 1, rng);
    }

    /// Scan `max_features` randomly chosen features; for each, sort the
    /// samples by value and sweep every boundary between distinct values.
    fn find_best_split(
        &self,
        indices: &[usize],
        counts: &[usize],
        impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n_features = self.rows.first().map(Vec::len).unwrap_or(0);
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);
        features.truncate(self.max_features);

        let n = indices.len();
        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n);

        for &feature in &features {
            sorted.clear();
            sorted.extend(indices.iter().map(|&i| (self.rows[i][feature], self.labels[i])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();

            for pos in 0..n - 1 {
                let (value, class) = sorted[pos];
                left[class] += 1;
                right[class] -= 1;

                let next = sorted[pos + 1].0;
                if next <= value {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                let decrease = n as f64 * impurity
                    - n_left as f64 * gini(&left, n_left)
                    - n_right as f64 * gini(&right, n_right);

                let better = best
                    .as_ref()
                    .map_or(true, |b| decrease > b.impurity_decrease);
                if decrease > 1e-12 && better {
                    best = Some(BestSplit {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        impurity_decrease: decrease,
                    });
                }
            }
        }

        best
    }
}

impl ClassificationTree {
    fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        config: &ForestConfig,
        max_features: usize,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = rows.len();
        let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        let mut builder = TreeBuilder {
            rows,
            labels,
            n_classes,
            max_features,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            importances: vec![0.0; n_features],
        };
        builder.build(&mut sample, 0, &mut rng);

        Self {
            importances: builder.importances,
        }
    }
}

/// Bagged ensemble of [`ClassificationTree`]s. Each tree sees a bootstrap
/// sample and considers `max(1, floor(sqrt(n_features)))` features per split.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<ClassificationTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    /// Fit on row-major `rows` with class ids `labels` in `0..n_classes`.
    /// Tree `i` is seeded with `random_state + i`, so the fit is the same
    /// however rayon schedules the trees.
    pub fn fit(&mut self, rows: &[Vec<f64>], labels: &[usize], n_classes: usize) {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || n_features == 0 {
            self.trees.clear();
            self.feature_importances = vec![0.0; n_features];
            return;
        }

        let max_features = max_features(n_features);
        let config = &self.config;
        self.trees = (0..config.n_estimators)
            .into_par_iter()
            .map(|i| {
                ClassificationTree::fit(
                    rows,
                    labels,
                    n_classes,
                    config,
                    max_features,
                    config.random_state.wrapping_add(i as u64),
                )
            })
            .collect();

        // average of per-tree normalised importances, renormalised
        let mut total = vec![0.0; n_features];
        for tree in &self.trees {
            let sum: f64 = tree.importances.iter().sum();
            if sum > 0.0 {
                for (t, imp) in total.iter_mut().zip(&tree.importances) {
                    *t += imp / sum;
                }
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for t in &mut total {
                *t /= sum;
            }
        }
        self.feature_importances = total;
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
