//! Boosted trees for binary default prediction
//!
//! Each round fits a regression tree to the first and second derivatives of
//! the logistic loss. Leaves take the weight `-G / (H + λ)` and a split is
//! kept only while `½·[S(L) + S(R) - S(L∪R)]` exceeds `γ`, where
//! `S = G² / (H + λ)`. An optional evaluation set is scored after every round.

use crate::error::{CreditError, Result};
use crate::training::metrics::{accuracy_score, log_loss, roc_auc_score};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Learning objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Logistic loss on {0, 1} labels, outputs probabilities
    BinaryLogistic,
}

/// Metric computed on the evaluation set after each round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalMetric {
    LogLoss,
    /// Misclassification rate at threshold 0.5
    Error,
    Auc,
}

impl EvalMetric {
    pub fn name(&self) -> &'static str {
        match self {
            EvalMetric::LogLoss => "logloss",
            EvalMetric::Error => "error",
            EvalMetric::Auc => "auc",
        }
    }

    fn evaluate(&self, y: &Array1<i64>, probs: &Array1<f64>) -> Result<f64> {
        match self {
            EvalMetric::LogLoss => log_loss(y, probs),
            EvalMetric::Error => {
                let preds = probs.mapv(|p| if p >= 0.5 { 1 } else { 0 });
                Ok(1.0 - accuracy_score(y, &preds)?)
            }
            EvalMetric::Auc => roc_auc_score(y, probs),
        }
    }
}

/// XGBoost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub objective: Objective,
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub eval_metric: EvalMetric,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            objective: Objective::BinaryLogistic,
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            eval_metric: EvalMetric::LogLoss,
            random_state: None,
        }
    }
}

impl XGBoostConfig {
    /// 10 rounds, learning rate 0.2, depth 200, logistic objective, log-loss monitoring
    pub fn credit_default() -> Self {
        Self {
            objective: Objective::BinaryLogistic,
            n_estimators: 10,
            learning_rate: 0.2,
            max_depth: 200,
            eval_metric: EvalMetric::LogLoss,
            ..Default::default()
        }
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: f64, reason: &str| CreditError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        if !(self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", self.learning_rate, "must be positive"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", self.subsample, "must be in (0, 1]"));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(invalid("colsample_bytree", self.colsample_bytree, "must be in (0, 1]"));
        }
        if self.reg_lambda < 0.0 {
            return Err(invalid("reg_lambda", self.reg_lambda, "must be non-negative"));
        }
        Ok(())
    }
}

/// How split usage is turned into a feature importance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportanceType {
    /// Number of splits on the feature
    Weight,
    /// Summed loss reduction of splits on the feature
    TotalGain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        gain: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn leaf_value(&self, sample: &ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(w) => return *w,
                Node::Split { feature, threshold, left, right, .. } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Visit `(feature, gain)` of every split
    fn for_each_split(&self, f: &mut impl FnMut(usize, f64)) {
        if let Node::Split { feature, gain, left, right, .. } = self {
            f(*feature, *gain);
            left.for_each_split(f);
            right.for_each_split(f);
        }
    }
}

/// Gradient and hessian sums over a set of rows
#[derive(Debug, Clone, Copy, Default)]
struct GradStats {
    g: f64,
    h: f64,
}

impl GradStats {
    fn add(&mut self, g: f64, h: f64) {
        self.g += g;
        self.h += h;
    }

    fn minus(self, other: GradStats) -> GradStats {
        GradStats { g: self.g - other.g, h: self.h - other.h }
    }

    /// Structure score G² / (H + λ), with G soft-thresholded by α
    fn score(&self, lambda: f64, alpha: f64) -> f64 {
        let g = soft_threshold(self.g, alpha);
        g * g / (self.h + lambda)
    }

    /// Optimal leaf weight -G / (H + λ), with G soft-thresholded by α
    fn weight(&self, lambda: f64, alpha: f64) -> f64 {
        -soft_threshold(self.g, alpha) / (self.h + lambda)
    }
}

fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows one tree on fixed gradients by exact greedy search
struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a Array1<f64>,
    hess: &'a Array1<f64>,
    features: &'a [usize],
    config: &'a XGBoostConfig,
}

impl<'a> TreeBuilder<'a> {
    fn stats(&self, rows: &[usize]) -> GradStats {
        let mut s = GradStats::default();
        for &i in rows {
            s.add(self.grad[i], self.hess[i]);
        }
        s
    }

    fn grow(&self, rows: &[usize], depth: usize) -> Node {
        let cfg = self.config;
        let total = self.stats(rows);
        let leaf = Node::Leaf(total.weight(cfg.reg_lambda, cfg.reg_alpha));

        if depth >= cfg.max_depth || rows.len() < 2 || total.h < cfg.min_child_weight {
            return leaf;
        }

        let best = self
            .features
            .par_iter()
            .filter_map(|&f| self.best_split_on(rows, f, total))
            .reduce_with(|a, b| if b.gain > a.gain { b } else { a });

        let split = match best {
            Some(s) if s.gain > cfg.gamma => s,
            _ => return leaf,
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return leaf;
        }

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            gain: split.gain,
            left: Box::new(self.grow(&left_rows, depth + 1)),
            right: Box::new(self.grow(&right_rows, depth + 1)),
        }
    }

    /// Scan the sorted values of one feature, scoring every boundary between
    /// distinct values
    fn best_split_on(&self, rows: &[usize], feature: usize, total: GradStats) -> Option<SplitCandidate> {
        let cfg = self.config;
        let value = |i: usize| self.x[[i, feature]];

        let mut order = rows.to_vec();
        order.sort_unstable_by(|&a, &b| value(a).total_cmp(&value(b)));

        let parent_score = total.score(cfg.reg_lambda, cfg.reg_alpha);
        let mut left = GradStats::default();
        let mut best: Option<SplitCandidate> = None;

        for pair in order.windows(2) {
            let (cur, next) = (pair[0], pair[1]);
            left.add(self.grad[cur], self.hess[cur]);

            if value(next) - value(cur) < 1e-12 {
                continue;
            }
            let right = total.minus(left);
            if left.h < cfg.min_child_weight || right.h < cfg.min_child_weight {
                continue;
            }

            let gain = 0.5
                * (left.score(cfg.reg_lambda, cfg.reg_alpha) + right.score(cfg.reg_lambda, cfg.reg_alpha)
                    - parent_score);
            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: 0.5 * (value(cur) + value(next)),
                    gain,
                });
            }
        }
        best
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary XGBoost classifier.
///
/// Labels must already be encoded as 0/1; no label encoding happens here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    trees: Vec<Node>,
    base_score: f64,
    n_features: usize,
    evals_result: Vec<f64>,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
            evals_result: Vec::new(),
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    fn labels_as_f64(y: &Array1<i64>) -> Result<Array1<f64>> {
        y.iter()
            .map(|&v| match v {
                0 => Ok(0.0),
                1 => Ok(1.0),
                other => Err(CreditError::InvalidInput(format!(
                    "binary:logistic expects labels in {{0, 1}}, found {}",
                    other
                ))),
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    /// Fit on `(x, y)`. When `eval_set` is given, the configured metric is
    /// computed on it after every round and stored in [`Self::evals_result`].
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        eval_set: Option<(&Array2<f64>, &Array1<i64>)>,
    ) -> Result<&mut Self> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 {
            return Err(CreditError::TrainingError("cannot fit on an empty matrix".to_string()));
        }
        if n_samples != y.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: y.len().to_string(),
            });
        }
        if let Some((x_eval, y_eval)) = eval_set {
            if x_eval.ncols() != n_features || x_eval.nrows() != y_eval.len() {
                return Err(CreditError::ShapeError {
                    expected: format!("eval set with {} columns and matching labels", n_features),
                    actual: format!("({}, {}) with {} labels", x_eval.nrows(), x_eval.ncols(), y_eval.len()),
                });
            }
        }

        let y_f = Self::labels_as_f64(y)?;
        self.n_features = n_features;

        // Base score in log-odds space
        let p = y_f.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);
        let mut eval_raw = eval_set.map(|(x_eval, _)| Array1::from_elem(x_eval.nrows(), self.base_score));

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();
        self.evals_result.clear();

        let lr = self.config.learning_rate;
        for round in 0..self.config.n_estimators {
            // Logistic loss: grad = p - y, hess = p * (1 - p)
            let probs = raw_preds.mapv(sigmoid);
            let grad = &probs - &y_f;
            let hess = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let rows = subsample(&mut rng, n_samples, self.config.subsample);
            let features = subsample(&mut rng, n_features, self.config.colsample_bytree);
            let tree = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                features: &features,
                config: &self.config,
            }
            .grow(&rows, 0);

            raw_preds.zip_mut_with(&margins(&tree, x, lr), |raw, step| *raw += step);

            if let (Some((x_eval, y_eval)), Some(eval_raw)) = (eval_set, eval_raw.as_mut()) {
                eval_raw.zip_mut_with(&margins(&tree, x_eval, lr), |raw, step| *raw += step);
                let value = self.config.eval_metric.evaluate(y_eval, &eval_raw.mapv(sigmoid))?;
                debug!(round, metric = self.config.eval_metric.name(), value, depth = tree.depth(), "Boosting round");
                self.evals_result.push(value);
            }

            self.trees.push(tree);
        }

        Ok(self)
    }

    fn check_fitted(&self, x: &Array2<f64>) -> Result<()> {
        if self.n_features == 0 {
            return Err(CreditError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(CreditError::ShapeError {
                expected: format!("{} columns", self.n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }

    /// Raw margins (log-odds)
    pub fn predict_raw(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_fitted(x)?;
        let lr = self.config.learning_rate;
        Ok(self
            .trees
            .iter()
            .fold(Array1::from_elem(x.nrows(), self.base_score), |acc, tree| acc + margins(tree, x, lr)))
    }

    /// Positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_raw(x)?.mapv(sigmoid))
    }

    /// Hard 0/1 labels at threshold 0.5
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1 } else { 0 }))
    }

    /// Mean accuracy
    pub fn score(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<f64> {
        accuracy_score(y, &self.predict(x)?)
    }

    /// Per-round eval metric values, empty when fit without an eval set
    pub fn evals_result(&self) -> &[f64] {
        &self.evals_result
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Split-count importances, normalised to sum to 1
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances_by(ImportanceType::Weight)
    }

    /// Importances of the requested kind, normalised to sum to 1.
    /// `None` before fit. All zeros when no tree ever split.
    pub fn feature_importances_by(&self, kind: ImportanceType) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut totals = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            tree.for_each_split(&mut |feature, gain| {
                totals[feature] += match kind {
                    ImportanceType::Weight => 1.0,
                    ImportanceType::TotalGain => gain,
                };
            });
        }
        let sum = totals.sum();
        if sum > 0.0 {
            totals /= sum;
        }
        Some(totals)
    }
}

/// Learning-rate scaled leaf values of one tree for every row of `x`
fn margins(tree: &Node, x: &Array2<f64>, lr: f64) -> Array1<f64> {
    let values: Vec<f64> = x
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| lr * tree.leaf_value(&row))
        .collect();
    Array1::from_vec(values)
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k.max(1));
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<i64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<i64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 5.0 { 1 } else { 0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_xgboost_classifier() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig {
            n_estimators: 50,
            max_depth: 4,
            ..Default::default()
        });
        model.fit(&x, &y, None).unwrap();
        let acc = model.score(&x, &y).unwrap();
        assert!(acc >= 0.8, "XGBoost classifier accuracy = {}", acc);
        assert_eq!(model.n_trees(), 50);
        assert!(model.evals_result().is_empty());
    }

    #[test]
    fn test_credit_default_config() {
        let config = XGBoostConfig::credit_default();
        assert_eq!(config.objective, Objective::BinaryLogistic);
        assert_eq!(config.n_estimators, 10);
        assert!((config.learning_rate - 0.2).abs() < 1e-12);
        assert_eq!(config.max_depth, 200);
        assert_eq!(config.eval_metric, EvalMetric::LogLoss);
    }

    #[test]
    fn test_eval_set_logloss_recorded_each_round() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::credit_default().with_random_state(Some(1)));
        model.fit(&x, &y, Some((&x, &y))).unwrap();

        let history = model.evals_result();
        assert_eq!(history.len(), 10);
        assert!(history.iter().all(|v| v.is_finite() && *v >= 0.0));
        // Training data as eval set: loss must go down
        assert!(history[9] < history[0]);
    }

    #[test]
    fn test_xgboost_predict_proba() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default());
        model.fit(&x, &y, None).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), x.nrows());
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(model.predict(&x).unwrap().iter().all(|&l| l == 0 || l == 1));
    }

    #[test]
    fn test_rejects_unencoded_labels() {
        let (x, _) = classification_data();
        let y = Array1::from_elem(50, 2i64);
        let mut model = XGBoostClassifier::new(XGBoostConfig::default());
        assert!(matches!(model.fit(&x, &y, None), Err(CreditError::InvalidInput(_))));
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = classification_data();
        let model = XGBoostClassifier::new(XGBoostConfig::default());
        assert!(matches!(model.predict(&x), Err(CreditError::ModelNotFitted)));
    }

    #[test]
    fn test_subsampling_and_importances() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig {
            n_estimators: 20,
            subsample: 0.8,
            colsample_bytree: 0.5,
            reg_alpha: 0.5,
            random_state: Some(42),
            ..Default::default()
        });
        model.fit(&x, &y, None).unwrap();
        let importances = model.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        let total: f64 = importances.sum();
        assert!(total == 0.0 || (total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gain_importance_favours_informative_feature() {
        // Column 0 decides the label, column 1 is constant
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y: Array1<i64> = (0..40).map(|i| if i >= 20 { 1 } else { 0 }).collect();
        let mut model = XGBoostClassifier::new(XGBoostConfig::credit_default());
        model.fit(&x, &y, None).unwrap();

        let gain = model.feature_importances_by(ImportanceType::TotalGain).unwrap();
        assert!((gain[0] - 1.0).abs() < 1e-9);
        assert_eq!(gain[1], 0.0);
    }
}
