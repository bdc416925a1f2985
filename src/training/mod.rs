//! Model training module
//!
//! Provides the training side of the experiment:
//! - Clustering (KMeans), used by the cluster-based oversampler
//! - Stratified train/test splitting
//! - XGBoost-style gradient boosting classifier
//! - Classification metrics

pub mod clustering;
pub mod metrics;
pub mod split;
pub mod xgboost;

pub use clustering::KMeans;
pub use metrics::{
    accuracy_score, classification_report, confusion_matrix, log_loss, roc_auc_score,
    AveragedMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix,
};
pub use split::{train_test_split, SplitConfig, TrainTestSplit};
pub use xgboost::{EvalMetric, ImportanceType, Objective, XGBoostClassifier, XGBoostConfig};
