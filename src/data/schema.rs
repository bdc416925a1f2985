//! Column typing for the credit-default table

use super::Dataset;
use crate::error::{CreditError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Target column holding the default label
pub const TARGET_COLUMN: &str = "PAY";

/// Columns removed right after loading
pub const DROPPED_COLUMNS: [&str; 2] = ["SEX", "EDU"];

/// Working type of a declared column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Cast to 64-bit integer
    Integer,
    /// Cast to string, later label encoded
    Categorical,
}

impl ColumnKind {
    fn dtype(&self) -> DataType {
        match self {
            ColumnKind::Integer => DataType::Int64,
            ColumnKind::Categorical => DataType::String,
        }
    }
}

/// Declared column types, applied in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub columns: Vec<(String, ColumnKind)>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::credit_default()
    }
}

impl ColumnSchema {
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// `AGE` as integer, `STA_1..3` as categorical
    pub fn credit_default() -> Self {
        Self::new()
            .with_column("AGE", ColumnKind::Integer)
            .with_column("STA_1", ColumnKind::Categorical)
            .with_column("STA_2", ColumnKind::Categorical)
            .with_column("STA_3", ColumnKind::Categorical)
    }

    pub fn with_column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push((name.into(), kind));
        self
    }

    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, kind)| *kind == ColumnKind::Categorical)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Cast every declared column. Values that cannot be cast are an error.
    pub fn apply(&self, dataset: Dataset) -> Result<Dataset> {
        let mut df = dataset.into_frame();

        for (name, kind) in &self.columns {
            let column = df
                .column(name)
                .map_err(|_| CreditError::FeatureNotFound(name.clone()))?;

            let cast = column
                .as_materialized_series()
                .strict_cast(&kind.dtype())
                .map_err(|e| CreditError::DataError(format!("cannot cast '{}' to {:?}: {}", name, kind, e)))?;

            df.with_column(cast)?;
        }

        Ok(Dataset::new(df))
    }
}
