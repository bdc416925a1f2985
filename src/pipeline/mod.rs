//! Credit-default experiment pipeline
//!
//! One linear run: load, type, encode, rebalance, split, scale, train, report.
//! Each stage takes the previous stage's value and returns a new one.

mod config;

pub use config::{ExperimentConfig, DEFAULT_DATA_PATH};

use crate::data::{DataLoader, Dataset, FeatureMatrix};
use crate::error::Result;
use crate::preprocessing::{CategoricalEncoder, EncodedDataset, MinMaxScaler};
use crate::report::{show_result, ResultReport};
use crate::synthetic::{neighbors_for, sorted_class_histogram, KMeansSMOTE, ResampleResult, Sampler};
use crate::training::{accuracy_score, roc_auc_score, train_test_split, TrainTestSplit, XGBoostClassifier};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Load the CSV and drop the configured columns
pub fn load(config: &ExperimentConfig) -> Result<Dataset> {
    let dataset = DataLoader::new().load_dataset(&config.data_path, &config.dropped_columns)?;
    info!(
        path = %config.data_path.display(),
        rows = dataset.height(),
        cols = dataset.width(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Cast declared columns, then label encode the categorical and target columns
pub fn encode(dataset: Dataset, config: &ExperimentConfig) -> Result<EncodedDataset> {
    let typed = config.schema.apply(dataset)?;
    let categorical = config.schema.categorical_columns();
    let encoded = CategoricalEncoder::new(&categorical[..], config.target_column.as_str()).encode(typed)?;
    info!(
        columns = ?categorical,
        target_classes = ?encoded.target_encoder().classes(),
        "Encoded categorical columns"
    );
    Ok(encoded)
}

/// Oversample the minority class with k-means SMOTE
pub fn balance(features: &FeatureMatrix, config: &ExperimentConfig) -> Result<ResampleResult> {
    let mut smote_config = config.smote_config();
    if smote_config.k_neighbors.is_none() {
        smote_config = smote_config.with_k_neighbors(neighbors_for(features.n_samples()));
    }
    debug!(k_neighbors = ?smote_config.k_neighbors, threshold = smote_config.cluster_balance_threshold, "Resampling");

    let start = Instant::now();
    let resampled = KMeansSMOTE::new(smote_config).fit_resample(&features.x, &features.y)?;
    info!(
        before = ?sorted_class_histogram(&features.y),
        after = ?resampled.histogram(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Resampled minority class"
    );
    Ok(resampled)
}

/// Stratified train/test split of the given rows
pub fn split(features: &FeatureMatrix, config: &ExperimentConfig) -> Result<TrainTestSplit> {
    let split = train_test_split(&features.x, &features.y, &config.split_config())?;
    info!(train = split.x_train.nrows(), test = split.x_test.nrows(), "Split dataset");
    Ok(split)
}

/// Min-max scale both partitions with bounds fit on the training rows
pub fn scale(split: TrainTestSplit) -> Result<(TrainTestSplit, MinMaxScaler)> {
    let mut scaler = MinMaxScaler::new();
    let x_train = scaler.fit_transform(&split.x_train)?;
    let x_test = scaler.transform(&split.x_test)?;
    Ok((split.with_features(x_train, x_test), scaler))
}

/// Fit the boosted classifier, monitoring the test partition each round
pub fn train(split: &TrainTestSplit, config: &ExperimentConfig) -> Result<XGBoostClassifier> {
    let start = Instant::now();
    let mut model = XGBoostClassifier::new(config.xgboost_config());
    model.fit(&split.x_train, &split.y_train, Some((&split.x_test, &split.y_test)))?;
    info!(
        n_trees = model.n_trees(),
        final_eval = ?model.evals_result().last(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Trained classifier"
    );
    Ok(model)
}

/// Everything a run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    /// Class counts of the encoded target
    pub class_histogram: Vec<(i64, usize)>,
    /// Class counts after oversampling
    pub resample_histogram: Vec<(i64, usize)>,
    /// `(rows, cols)` of X_train
    pub train_shape: (usize, usize),
    /// `(rows, cols)` of X_test
    pub test_shape: (usize, usize),
    pub shape_summary: String,
    pub train_score: f64,
    pub test_score: f64,
    /// ROC-AUC of the hard test predictions
    pub roc_auc: f64,
    pub feature_names: Vec<String>,
    pub model: XGBoostClassifier,
    pub report: ResultReport,
}

impl ExperimentOutcome {
    /// Score lines in the `Training Score: 0.81` form
    pub fn score_lines(&self) -> [String; 3] {
        [
            format!("Training Score: {:.2}", self.train_score),
            format!("Testing Score: {:.2}", self.test_score),
            format!("ROC AUC: {:.2}", self.roc_auc),
        ]
    }
}

/// Intermediate results reported while [`run_experiment_with`] is running
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageEvent<'a> {
    /// Class counts after oversampling, ascending by class
    Resampled(&'a [(i64, usize)]),
    /// Partition shapes in the `X_train.shape = ...` form
    Split(&'a str),
}

/// Run the whole experiment
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentOutcome> {
    run_experiment_with(config, |_| {})
}

/// Run the whole experiment, handing each [`StageEvent`] to `observe` as soon
/// as its stage finishes. Events already emitted stay emitted if a later
/// stage fails.
pub fn run_experiment_with<F>(config: &ExperimentConfig, mut observe: F) -> Result<ExperimentOutcome>
where
    F: FnMut(StageEvent<'_>),
{
    config.validate()?;
    let dataset = load(config)?;
    let encoded = encode(dataset, config)?;
    let features = encoded.to_feature_matrix()?;

    let resampled = balance(&features, config)?;
    let resample_histogram = resampled.histogram();
    observe(StageEvent::Resampled(&resample_histogram));
    // The split runs on the original rows; the oversampled set only feeds the histogram
    warn!(
        original_rows = features.n_samples(),
        resampled_rows = resampled.x.nrows(),
        "Resampled data is not used for training; splitting the original rows"
    );

    let split = split(&features, config)?;
    let shape_summary = split.shape_summary();
    observe(StageEvent::Split(&shape_summary));
    let (split, _scaler) = scale(split)?;
    let model = train(&split, config)?;

    let train_score = model.score(&split.x_train, &split.y_train)?;
    let y_pred = model.predict(&split.x_test)?;
    let test_score = accuracy_score(&split.y_test, &y_pred)?;
    let roc_auc = roc_auc_score(&split.y_test, &y_pred.mapv(|v| v as f64))?;
    info!(train_score, test_score, roc_auc, "Scored classifier");

    let report = show_result(&model, &split.y_test, &y_pred, encoded.target_encoder())?
        .with_feature_names(&features.feature_names)
        .truncate_features(config.top_features);

    Ok(ExperimentOutcome {
        class_histogram: sorted_class_histogram(&features.y),
        resample_histogram,
        train_shape: split.x_train.dim(),
        test_shape: split.x_test.dim(),
        shape_summary,
        train_score,
        test_score,
        roc_auc,
        feature_names: features.feature_names,
        model,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn encoded_frame() -> EncodedDataset {
        let n = 60;
        let df = df!(
            "AGE" => (0..n).map(|i| 20 + i as i64).collect::<Vec<_>>(),
            "STA_1" => (0..n).map(|i| (i % 3) as i64).collect::<Vec<_>>(),
            "STA_2" => (0..n).map(|i| (i % 2) as i64).collect::<Vec<_>>(),
            "STA_3" => (0..n).map(|i| (i % 4) as i64).collect::<Vec<_>>(),
            "BILL" => (0..n).map(|i| i as f64 * 10.0).collect::<Vec<_>>(),
            "PAY" => (0..n).map(|i| if i >= 45 { 1i64 } else { 0 }).collect::<Vec<_>>()
        )
        .unwrap();
        encode(Dataset::new(df), &ExperimentConfig::default()).unwrap()
    }

    #[test]
    fn test_encode_stage() {
        let encoded = encoded_frame();
        assert_eq!(encoded.target_encoder().classes(), &["0", "1"]);
        let fm = encoded.to_feature_matrix().unwrap();
        assert_eq!(fm.n_features(), 5);
        assert_eq!(sorted_class_histogram(&fm.y), vec![(0, 45), (1, 15)]);
    }

    #[test]
    fn test_split_scale_train_stages() {
        let fm = encoded_frame().to_feature_matrix().unwrap();
        let config = ExperimentConfig::default().with_random_state(Some(5));

        let split = split(&fm, &config).unwrap();
        assert_eq!(split.x_test.nrows(), 18);

        let (scaled, scaler) = scale(split).unwrap();
        assert_eq!(scaler.n_features(), 5);
        assert!(scaled.x_train.iter().all(|&v| (0.0..=1.0).contains(&v)));

        let model = train(&scaled, &config).unwrap();
        assert_eq!(model.n_trees(), 10);
        assert_eq!(model.evals_result().len(), 10);
    }
}
