//! Experiment configuration

use crate::data::{ColumnSchema, DROPPED_COLUMNS, TARGET_COLUMN};
use crate::error::{CreditError, Result};
use crate::report::DEFAULT_TOP_FEATURES;
use crate::synthetic::KMeansSmoteConfig;
use crate::training::{SplitConfig, XGBoostConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input file read when no path is given
pub const DEFAULT_DATA_PATH: &str = "./uci_credit_card_default.csv";

/// Configuration for one run of the credit-default experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// CSV file to load
    pub data_path: PathBuf,

    /// Columns removed right after loading
    pub dropped_columns: Vec<String>,

    /// Binary target column
    pub target_column: String,

    /// Declared column types
    pub schema: ColumnSchema,

    /// Cluster-based oversampler settings
    pub smote: KMeansSmoteConfig,

    /// Train/test split settings
    pub split: SplitConfig,

    /// Boosted classifier settings
    pub xgboost: XGBoostConfig,

    /// Number of features listed in the report
    pub top_features: usize,

    /// Seed for every stochastic stage that has none of its own
    pub random_state: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            dropped_columns: DROPPED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            target_column: TARGET_COLUMN.to_string(),
            schema: ColumnSchema::credit_default(),
            smote: KMeansSmoteConfig::default(),
            split: SplitConfig::default(),
            xgboost: XGBoostConfig::credit_default(),
            top_features: DEFAULT_TOP_FEATURES,
            random_state: None,
        }
    }
}

impl ExperimentConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the input file
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Builder method to set the shared seed
    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_schema(mut self, schema: ColumnSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_smote(mut self, smote: KMeansSmoteConfig) -> Self {
        self.smote = smote;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_xgboost(mut self, xgboost: XGBoostConfig) -> Self {
        self.xgboost = xgboost;
        self
    }

    pub fn with_top_features(mut self, n: usize) -> Self {
        self.top_features = n;
        self
    }

    /// Reject settings that cannot describe a run
    pub fn validate(&self) -> Result<()> {
        if self.dropped_columns.contains(&self.target_column) {
            return Err(CreditError::ConfigError(format!(
                "target column '{}' is in the dropped columns",
                self.target_column
            )));
        }
        if self.schema.columns.iter().any(|(name, _)| self.dropped_columns.contains(name)) {
            return Err(CreditError::ConfigError(
                "a typed column is also in the dropped columns".to_string(),
            ));
        }
        Ok(())
    }

    /// Oversampler config with the shared seed filled in
    pub fn smote_config(&self) -> KMeansSmoteConfig {
        let seed = self.smote.random_state.or(self.random_state);
        self.smote.clone().with_random_state(seed)
    }

    /// Split config with the shared seed filled in
    pub fn split_config(&self) -> SplitConfig {
        let seed = self.split.random_state.or(self.random_state);
        self.split.clone().with_random_state(seed)
    }

    /// Classifier config with the shared seed filled in
    pub fn xgboost_config(&self) -> XGBoostConfig {
        let seed = self.xgboost.random_state.or(self.random_state);
        self.xgboost.clone().with_random_state(seed)
    }
}
