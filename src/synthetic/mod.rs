//! Synthetic minority oversampling
//!
//! Provides the cluster-based SMOTE variant used to rebalance the binary
//! default target, plus the class-count helpers shared by samplers.

mod kmeans_smote;

pub use kmeans_smote::{neighbors_for, KMeansSMOTE, KMeansSmoteConfig, SamplingStrategy};

use crate::error::Result;
use ndarray::{Array1, Array2};
use std::collections::{BTreeMap, HashMap};

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Original rows followed by synthetic rows
    pub x: Array2<f64>,
    /// Labels aligned with `x`
    pub y: Array1<i64>,
    /// Number of synthetic samples generated per class
    pub n_synthetic: BTreeMap<i64, usize>,
}

impl ResampleResult {
    /// Class counts after resampling, ascending by class
    pub fn histogram(&self) -> Vec<(i64, usize)> {
        sorted_class_histogram(&self.y)
    }
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Get class distribution
pub fn class_counts(y: &Array1<i64>) -> HashMap<i64, usize> {
    let mut counts = HashMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class
pub fn class_indices(y: &Array1<i64>) -> HashMap<i64, Vec<usize>> {
    let mut indices = HashMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

/// `(class, count)` pairs sorted by class, e.g. `[(0, 800), (1, 801)]`
pub fn sorted_class_histogram(y: &Array1<i64>) -> Vec<(i64, usize)> {
    let counts: BTreeMap<i64, usize> = class_counts(y).into_iter().collect();
    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_histogram() {
        let y = Array1::from_vec(vec![1i64, 0, 0, 2, 0, 1]);
        let hist = sorted_class_histogram(&y);
        assert_eq!(hist, vec![(0, 3), (1, 2), (2, 1)]);
        assert_eq!(format!("{:?}", hist), "[(0, 3), (1, 2), (2, 1)]");
    }

    #[test]
    fn test_class_indices() {
        let y = Array1::from_vec(vec![1i64, 0, 1]);
        let idx = class_indices(&y);
        assert_eq!(idx[&1], vec![0, 2]);
        assert_eq!(idx[&0], vec![1]);
    }
}
