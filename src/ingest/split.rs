// src/ingest/split.rs

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::table::RawTable;

/// Row counts for a split of `n` rows: the test side gets
/// `ceil((1 - train_ratio) * n)` rows, the train side the rest.
pub fn split_sizes(n: usize, train_ratio: f64) -> (usize, usize) {
    let n_test = (((1.0 - train_ratio) * n as f64).ceil() as usize).min(n);
    (n - n_test, n_test)
}

/// Seeded uniform random partition into (train, test). A permutation of the
/// row indices is drawn; its head becomes the test set and the remainder
/// the training set, each keeping permutation order.
pub fn train_test_split(raw: &RawTable, train_ratio: f64, seed: u64) -> (RawTable, RawTable) {
    let n = raw.len();
    let (n_train, n_test) = split_sizes(n, train_ratio);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.shuffle(&mut rng);

    let (test_idx, train_idx) = permutation.split_at(n_test);
    debug!(n, n_train, n_test, "split sizes");

    (raw.take_rows(train_idx), raw.take_rows(test_idx))
}
