//! K-Means clustering with k-means++ seeding
//!
//! Used by the k-means SMOTE balancer to locate regions where synthetic
//! minority samples are generated. Several seedings are run and the one with
//! the lowest inertia is kept.

use crate::error::{CreditError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outcome of one Lloyd run
struct Run {
    centroids: Array2<f64>,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
}

/// K-Means clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    /// Stop when total centroid movement falls below this
    pub tol: f64,
    /// Independent seedings; the lowest-inertia run wins
    pub n_init: usize,
    pub random_state: Option<u64>,
    centroids: Option<Array2<f64>>,
    labels: Option<Array1<usize>>,
    inertia: Option<f64>,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(8)
    }
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 3,
            random_state: None,
            centroids: None,
            labels: None,
            inertia: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the model (unsupervised)
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if self.n_clusters == 0 || self.n_init == 0 {
            return Err(CreditError::InvalidParameter {
                name: if self.n_clusters == 0 { "n_clusters" } else { "n_init" }.to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if x.nrows() < self.n_clusters {
            return Err(CreditError::TrainingError(format!(
                "n_samples ({}) < n_clusters ({})",
                x.nrows(),
                self.n_clusters
            )));
        }

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut best: Option<Run> = None;
        for _ in 0..self.n_init {
            let run = self.lloyd(x, &mut rng);
            trace!(inertia = run.inertia, n_iter = run.n_iter, "k-means run");
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let best = best.ok_or(CreditError::ModelNotFitted)?;
        self.centroids = Some(best.centroids);
        self.labels = Some(Array1::from_vec(best.labels));
        self.inertia = Some(best.inertia);
        Ok(self)
    }

    fn lloyd(&self, x: &Array2<f64>, rng: &mut ChaCha8Rng) -> Run {
        let mut centroids = seed_centroids(x, self.n_clusters, rng);
        let mut assignment = nearest_centroids(x, &centroids);
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            n_iter += 1;
            let updated = mean_centroids(x, &assignment, &centroids, rng);
            let shift: f64 = (&updated - &centroids).mapv(|d| d * d).sum().sqrt();
            centroids = updated;

            let next = nearest_centroids(x, &centroids);
            let stable = next.iter().zip(assignment.iter()).all(|(a, b)| a.0 == b.0);
            assignment = next;
            if stable || shift < self.tol {
                break;
            }
        }

        let inertia = assignment.iter().map(|&(_, d)| d).sum();
        Run {
            centroids,
            labels: assignment.into_iter().map(|(c, _)| c).collect(),
            inertia,
            n_iter,
        }
    }

    /// Fit and return the cluster label of each sample
    pub fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<usize>> {
        self.fit(x)?;
        self.labels.clone().ok_or(CreditError::ModelNotFitted)
    }

    /// Predict cluster labels for new data
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let centroids = self.centroids.as_ref().ok_or(CreditError::ModelNotFitted)?;
        if x.ncols() != centroids.ncols() {
            return Err(CreditError::ShapeError {
                expected: format!("{} columns", centroids.ncols()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(nearest_centroids(x, centroids).into_iter().map(|(c, _)| c).collect())
    }

    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }

    pub fn labels(&self) -> Option<&Array1<usize>> {
        self.labels.as_ref()
    }

    pub fn inertia(&self) -> Option<f64> {
        self.inertia
    }
}

fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// k-means++: each new centroid is drawn with probability proportional to
/// its squared distance from the closest centroid chosen so far
fn seed_centroids(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n = x.nrows();
    let mut chosen = vec![rng.gen_range(0..n)];
    let mut closest: Vec<f64> = x
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| squared_distance(&row, &x.row(chosen[0])))
        .collect();

    while chosen.len() < k {
        let next = match WeightedIndex::new(&closest) {
            Ok(dist) => dist.sample(rng),
            // All remaining mass is zero: duplicates only
            Err(_) => rng.gen_range(0..n),
        };
        chosen.push(next);

        let centre = x.row(next);
        closest
            .par_iter_mut()
            .zip(x.axis_iter(Axis(0)).into_par_iter())
            .for_each(|(d, row)| *d = d.min(squared_distance(&row, &centre)));
    }

    x.select(Axis(0), &chosen)
}

/// `(cluster, squared distance)` of the closest centroid for every row
fn nearest_centroids(x: &Array2<f64>, centroids: &Array2<f64>) -> Vec<(usize, f64)> {
    x.axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| {
            centroids
                .axis_iter(Axis(0))
                .enumerate()
                .map(|(c, centre)| (c, squared_distance(&row, &centre)))
                .fold((0, f64::INFINITY), |best, cand| if cand.1 < best.1 { cand } else { best })
        })
        .collect()
}

/// Mean of each cluster's rows. An empty cluster is re-seeded at a random row.
fn mean_centroids(
    x: &Array2<f64>,
    assignment: &[(usize, f64)],
    previous: &Array2<f64>,
    rng: &mut ChaCha8Rng,
) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(previous.dim());
    let mut counts = vec![0usize; previous.nrows()];
    for (row, &(c, _)) in x.axis_iter(Axis(0)).zip(assignment) {
        sums.row_mut(c).scaled_add(1.0, &row);
        counts[c] += 1;
    }

    for (c, mut centre) in sums.axis_iter_mut(Axis(0)).enumerate() {
        match counts[c] {
            0 => centre.assign(&x.row(rng.gen_range(0..x.nrows()))),
            n => centre /= n as f64,
        }
    }
    sums
}
