//! Credit-default classification experiment
//!
//! Loads a tabular credit-default dataset, label encodes its categorical and
//! target columns, oversamples the minority class with k-means SMOTE, splits
//! and min-max scales the rows, fits a second-order gradient boosted tree
//! classifier, and reports the results.
//!
//! # Modules
//!
//! - [`data`] - CSV loading and column typing
//! - [`preprocessing`] - Label encoding and min-max scaling
//! - [`synthetic`] - K-means SMOTE oversampling
//! - [`training`] - K-means, stratified split, boosted trees, metrics
//! - [`report`] - Result summary rendering and JSON export
//! - [`pipeline`] - The end-to-end experiment
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data and preprocessing
pub mod data;
pub mod preprocessing;
pub mod synthetic;

// Models
pub mod training;

// Experiment
pub mod report;
pub mod pipeline;
pub mod cli;

pub use error::{CreditError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{CreditError, Result};

    // Data
    pub use crate::data::{ColumnSchema, DataLoader, Dataset, FeatureMatrix};

    // Preprocessing
    pub use crate::preprocessing::{CategoricalEncoder, EncodedDataset, LabelEncoder, MinMaxScaler};

    // Resampling
    pub use crate::synthetic::{KMeansSMOTE, KMeansSmoteConfig, ResampleResult, Sampler};

    // Training
    pub use crate::training::{train_test_split, SplitConfig, TrainTestSplit, XGBoostClassifier, XGBoostConfig};

    // Experiment
    pub use crate::pipeline::{run_experiment, run_experiment_with, ExperimentConfig, ExperimentOutcome, StageEvent};
    pub use crate::report::{show_result, ResultReport};
}
