//! Train/test splitting

use crate::error::{CreditError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Split configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows reserved for the test partition
    pub test_size: f64,
    /// Preserve class proportions in both partitions
    pub stratify: bool,
    pub random_state: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.3,
            stratify: true,
            random_state: None,
        }
    }
}

impl SplitConfig {
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }
}

/// The four partitions plus the source row of every partition row
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    /// Shape summary in the `X_train.shape = (r, c), ...` form
    pub fn shape_summary(&self) -> String {
        format!(
            "X_train.shape = ({}, {}), y_train.shape = ({},), X_test.shape = ({}, {}), y_test.shape = ({},)",
            self.x_train.nrows(),
            self.x_train.ncols(),
            self.y_train.len(),
            self.x_test.nrows(),
            self.x_test.ncols(),
            self.y_test.len(),
        )
    }

    /// Replace the feature partitions, keeping labels and indices
    pub fn with_features(self, x_train: Array2<f64>, x_test: Array2<f64>) -> Self {
        Self { x_train, x_test, ..self }
    }
}

/// Split rows into train and test partitions.
///
/// The test partition gets `ceil(test_size * n)` rows. With stratification
/// each class contributes test rows in proportion to its size.
pub fn train_test_split(x: &Array2<f64>, y: &Array1<i64>, config: &SplitConfig) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(CreditError::ShapeError {
            expected: format!("{} labels", n),
            actual: y.len().to_string(),
        });
    }
    if !(config.test_size > 0.0 && config.test_size < 1.0) {
        return Err(CreditError::InvalidParameter {
            name: "test_size".to_string(),
            value: config.test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n_test = (config.test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(CreditError::ValidationError(format!(
            "with n_samples={} and test_size={}, one partition would be empty",
            n, config.test_size
        )));
    }

    let mut rng = match config.random_state {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let (mut train_indices, mut test_indices) = if config.stratify {
        stratified_indices(y, n_test, &mut rng)?
    } else {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let train = indices.split_off(n_test);
        (train, indices)
    };

    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &train_indices),
        x_test: x.select(Axis(0), &test_indices),
        y_train: y.select(Axis(0), &train_indices),
        y_test: y.select(Axis(0), &test_indices),
        train_indices,
        test_indices,
    })
}

fn stratified_indices(
    y: &Array1<i64>,
    n_test: usize,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = y.len();

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    if let Some((class, idx)) = by_class.iter().find(|(_, idx)| idx.len() < 2) {
        return Err(CreditError::ValidationError(format!(
            "class {} has {} member(s); stratification needs at least 2",
            class,
            idx.len()
        )));
    }
    let n_classes = by_class.len();
    if n_test < n_classes || n - n_test < n_classes {
        return Err(CreditError::ValidationError(format!(
            "both partitions need at least {} rows (one per class)",
            n_classes
        )));
    }

    let allocation = allocate_test_rows(&by_class, n_test, n);

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (class, indices) in by_class.iter_mut() {
        indices.shuffle(rng);
        let take = allocation[class];
        test.extend_from_slice(&indices[..take]);
        train.extend_from_slice(&indices[take..]);
    }

    Ok((train, test))
}

/// Proportional allocation: floor first, remainder by largest fractional part
fn allocate_test_rows(by_class: &BTreeMap<i64, Vec<usize>>, n_test: usize, n: usize) -> BTreeMap<i64, usize> {
    let mut allocation: BTreeMap<i64, usize> = BTreeMap::new();
    let mut fractions: Vec<(f64, i64)> = Vec::with_capacity(by_class.len());

    for (&class, indices) in by_class {
        let exact = indices.len() as f64 * n_test as f64 / n as f64;
        let floor = exact.floor() as usize;
        allocation.insert(class, floor);
        fractions.push((exact - floor as f64, class));
    }

    let assigned: usize = allocation.values().sum();
    fractions.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));

    for &(_, class) in fractions.iter().take(n_test.saturating_sub(assigned)) {
        if let Some(count) = allocation.get_mut(&class) {
            *count += 1;
        }
    }

    allocation
}
