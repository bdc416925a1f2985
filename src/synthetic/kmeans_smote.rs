//! K-means SMOTE
//!
//! Clusters the whole input with k-means, keeps the clusters where the
//! minority class is dense enough, and spreads the synthetic samples over
//! those clusters in proportion to how sparse their minority rows are.
//! Inside a cluster, samples are generated by regular SMOTE interpolation
//! between a minority row and one of its nearest minority neighbours.

use crate::error::{CreditError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use crate::training::KMeans;
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::debug;

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Which classes get oversampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingStrategy {
    /// Oversample only the smallest class up to the size of the largest
    Minority,
}

/// Neighbour count derived from the dataset size: `floor(sqrt(n / 2))`,
/// clamped to at least 1 so tiny inputs (n < 2) still get one neighbour
pub fn neighbors_for(n_samples: usize) -> usize {
    ((n_samples as f64 / 2.0).sqrt() as usize).max(1)
}

/// K-means SMOTE configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansSmoteConfig {
    /// Nearest neighbours used for interpolation (None = derived from n_samples)
    pub k_neighbors: Option<usize>,
    /// Minimum minority fraction for a cluster to receive samples
    pub cluster_balance_threshold: f64,
    pub sampling_strategy: SamplingStrategy,
    /// Worker threads (None = all available)
    pub n_jobs: Option<usize>,
    /// Number of k-means clusters
    pub n_clusters: usize,
    /// Exponent applied to the mean minority distance (None = from n_features)
    pub density_exponent: Option<f64>,
    pub random_state: Option<u64>,
}

impl Default for KMeansSmoteConfig {
    fn default() -> Self {
        Self {
            k_neighbors: None,
            cluster_balance_threshold: 0.24,
            sampling_strategy: SamplingStrategy::Minority,
            n_jobs: None,
            n_clusters: 2,
            density_exponent: None,
            random_state: None,
        }
    }
}

impl KMeansSmoteConfig {
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = Some(k.max(1));
        self
    }

    pub fn with_cluster_balance_threshold(mut self, threshold: f64) -> Self {
        self.cluster_balance_threshold = threshold;
        self
    }

    pub fn with_n_clusters(mut self, n: usize) -> Self {
        self.n_clusters = n;
        self
    }

    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = Some(n);
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cluster_balance_threshold) {
            return Err(CreditError::InvalidParameter {
                name: "cluster_balance_threshold".to_string(),
                value: self.cluster_balance_threshold.to_string(),
                reason: "must be in [0, 1]".to_string(),
            });
        }
        if self.n_clusters == 0 {
            return Err(CreditError::InvalidParameter {
                name: "n_clusters".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.k_neighbors == Some(0) {
            return Err(CreditError::InvalidParameter {
                name: "k_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.n_jobs == Some(0) {
            return Err(CreditError::InvalidParameter {
                name: "n_jobs".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// State computed by `fit`
#[derive(Debug, Clone, Copy)]
struct SamplingTarget {
    minority: i64,
    n_to_generate: usize,
    k_neighbors: usize,
}

/// K-means SMOTE sampler for binary targets
#[derive(Debug, Clone)]
pub struct KMeansSMOTE {
    config: KMeansSmoteConfig,
    target: Option<SamplingTarget>,
}

impl KMeansSMOTE {
    pub fn new(config: KMeansSmoteConfig) -> Self {
        Self { config, target: None }
    }

    pub fn config(&self) -> &KMeansSmoteConfig {
        &self.config
    }

    /// Neighbour count chosen during fit
    pub fn k_neighbors(&self) -> Option<usize> {
        self.target.map(|t| t.k_neighbors)
    }

    fn density_exponent(&self, n_features: usize) -> f64 {
        self.config.density_exponent.unwrap_or_else(|| {
            (n_features.max(1) as f64).log(1.6).powf(1.8) * 0.16
        })
    }

    fn distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Mean distance between distinct minority rows, scaled by the density exponent
    fn cluster_sparsity(&self, x: &Array2<f64>, rows: &[usize]) -> f64 {
        let m = rows.len();
        if m < 2 {
            return 0.0;
        }

        let total: f64 = rows
            .par_iter()
            .enumerate()
            .map(|(a, &i)| {
                rows[a + 1..]
                    .iter()
                    .map(|&j| Self::distance(&x.row(i), &x.row(j)))
                    .sum::<f64>()
            })
            .sum();

        // Each unordered pair counted once, so halve the off-diagonal count
        let mean_distance = total / ((m * m - m) as f64 / 2.0);
        mean_distance.powf(self.density_exponent(x.ncols())) / m as f64
    }

    /// k nearest rows (within `rows`) for every row in `rows`, as positions into `rows`
    fn nearest_neighbors(x: &Array2<f64>, rows: &[usize], k: usize) -> Vec<Vec<usize>> {
        rows.par_iter()
            .enumerate()
            .map(|(a, &i)| {
                let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
                for (b, &j) in rows.iter().enumerate() {
                    if a == b {
                        continue;
                    }
                    let dist = Self::distance(&x.row(i), &x.row(j));
                    if heap.len() < k {
                        heap.push(DistIdx(dist, b));
                    } else if let Some(&DistIdx(max_dist, _)) = heap.peek() {
                        if dist < max_dist {
                            heap.pop();
                            heap.push(DistIdx(dist, b));
                        }
                    }
                }
                heap.into_iter().map(|DistIdx(_, b)| b).collect()
            })
            .collect()
    }

    fn generate_cluster_samples(
        x: &Array2<f64>,
        rows: &[usize],
        neighbors: &[Vec<usize>],
        n_samples: usize,
        rng: &mut StdRng,
    ) -> Vec<Vec<f64>> {
        let mut out = Vec::with_capacity(n_samples);
        while out.len() < n_samples {
            let a = rng.gen_range(0..rows.len());
            let nns = &neighbors[a];
            if nns.is_empty() {
                continue;
            }
            let b = nns[rng.gen_range(0..nns.len())];
            let gap: f64 = rng.gen();

            let point = x.row(rows[a]);
            let neighbor = x.row(rows[b]);
            out.push(
                point
                    .iter()
                    .zip(neighbor.iter())
                    .map(|(&p, &n)| p + gap * (n - p))
                    .collect(),
            );
        }
        out
    }

    fn resample_inner(
        &self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        target: SamplingTarget,
    ) -> Result<ResampleResult> {
        let mut rng = match self.config.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut kmeans = KMeans::new(self.config.n_clusters).with_random_state(self.config.random_state);
        let cluster_labels = kmeans.fit_predict(x)?;

        let k = target.k_neighbors;
        let mut valid_clusters: Vec<Vec<usize>> = Vec::new();
        let mut sparsities: Vec<f64> = Vec::new();

        for cluster in 0..self.config.n_clusters {
            let members: Vec<usize> = cluster_labels
                .iter()
                .enumerate()
                .filter(|(_, &c)| c == cluster)
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                continue;
            }

            let minority_rows: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&i| y[i] == target.minority)
                .collect();
            let minority_fraction = minority_rows.len() as f64 / members.len() as f64;

            if minority_fraction < self.config.cluster_balance_threshold {
                continue;
            }
            // SMOTE needs k neighbours besides the row itself
            if minority_rows.len() < k + 1 {
                continue;
            }

            debug!(
                cluster,
                size = members.len(),
                minority = minority_rows.len(),
                minority_fraction,
                "Cluster accepted for oversampling"
            );
            sparsities.push(self.cluster_sparsity(x, &minority_rows));
            valid_clusters.push(minority_rows);
        }

        if valid_clusters.is_empty() {
            return Err(CreditError::ResamplingError(format!(
                "No clusters found with sufficient samples of class {}. \
                 Try lowering the cluster_balance_threshold or increasing the number of clusters.",
                target.minority
            )));
        }

        let total_sparsity: f64 = sparsities.iter().sum();
        let weights: Vec<f64> = if total_sparsity > 0.0 && total_sparsity.is_finite() {
            sparsities.iter().map(|s| s / total_sparsity).collect()
        } else {
            vec![1.0 / valid_clusters.len() as f64; valid_clusters.len()]
        };

        let mut synthetic_x: Vec<Vec<f64>> = Vec::new();
        for (rows, weight) in valid_clusters.iter().zip(weights.iter()) {
            let cluster_n = (target.n_to_generate as f64 * weight).ceil() as usize;
            if cluster_n == 0 {
                continue;
            }
            let neighbors = Self::nearest_neighbors(x, rows, k.min(rows.len() - 1));
            synthetic_x.extend(Self::generate_cluster_samples(x, rows, &neighbors, cluster_n, &mut rng));
        }

        let n_original = x.nrows();
        let n_features = x.ncols();
        let n_generated = synthetic_x.len();
        let result_x = Array2::from_shape_fn((n_original + n_generated, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[i - n_original][j]
            }
        });

        let mut all_y: Vec<i64> = y.to_vec();
        all_y.extend(std::iter::repeat(target.minority).take(n_generated));

        let mut n_synthetic = BTreeMap::new();
        n_synthetic.insert(target.minority, n_generated);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}

impl Default for KMeansSMOTE {
    fn default() -> Self {
        Self::new(KMeansSmoteConfig::default())
    }
}

impl Sampler for KMeansSMOTE {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        self.config.validate()?;
        if x.nrows() != y.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: y.len().to_string(),
            });
        }

        let counts = class_counts(y);
        if counts.len() != 2 {
            return Err(CreditError::ValidationError(format!(
                "k-means SMOTE expects exactly 2 classes, found {}",
                counts.len()
            )));
        }

        let mut by_count: Vec<(i64, usize)> = counts.into_iter().collect();
        by_count.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        let (minority, minority_count) = by_count[0];
        let (_, majority_count) = by_count[1];

        let k_neighbors = self.config.k_neighbors.unwrap_or_else(|| neighbors_for(x.nrows()));

        self.target = Some(SamplingTarget {
            minority,
            n_to_generate: majority_count - minority_count,
            k_neighbors,
        });
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let target = self.target.ok_or_else(|| {
            CreditError::ValidationError("k-means SMOTE not fitted".to_string())
        })?;

        if target.n_to_generate == 0 {
            let mut n_synthetic = BTreeMap::new();
            for class in class_indices(y).into_keys() {
                n_synthetic.insert(class, 0);
            }
            return Ok(ResampleResult { x: x.clone(), y: y.clone(), n_synthetic });
        }

        match self.config.n_jobs {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| CreditError::ResamplingError(e.to_string()))?;
                pool.install(|| self.resample_inner(x, y, target))
            }
            None => self.resample_inner(x, y, target),
        }
    }
}
