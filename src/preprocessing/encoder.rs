//! Label encoding for categorical and target columns

use crate::data::{Dataset, FeatureMatrix};
use crate::error::{CreditError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Maps each distinct value to an integer code in `[0, n_classes)`.
///
/// Codes follow the sorted order of the fitted values. Numeric values sort
/// numerically (`"2" < "10"`) and ahead of text, which sorts lexicographically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
    is_fitted: bool,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on the distinct values of `values`
    pub fn fit<S: AsRef<str>>(&mut self, values: &[S]) -> Result<&mut Self> {
        let distinct: BTreeSet<&str> = values.iter().map(|v| v.as_ref()).collect();
        let mut classes: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        classes.sort_by(|a, b| compare_labels(a, b));

        self.index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        self.classes = classes;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<i64>> {
        if !self.is_fitted {
            return Err(CreditError::ModelNotFitted);
        }

        values
            .iter()
            .map(|v| {
                self.index
                    .get(v.as_ref())
                    .map(|&i| i as i64)
                    .ok_or_else(|| CreditError::InvalidInput(format!("unseen label '{}'", v.as_ref())))
            })
            .collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, values: &[S]) -> Result<Vec<i64>> {
        self.fit(values)?;
        self.transform(values)
    }

    /// Map codes back to the original labels
    pub fn inverse_transform(&self, codes: &[i64]) -> Result<Vec<String>> {
        if !self.is_fitted {
            return Err(CreditError::ModelNotFitted);
        }

        codes
            .iter()
            .map(|&code| self.decode(code))
            .collect()
    }

    /// Label for a single code
    pub fn decode(&self, code: i64) -> Result<String> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .cloned()
            .ok_or_else(|| CreditError::InvalidInput(format!("code {} out of range [0, {})", code, self.classes.len())))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit on a frame column and return the encoded replacement series
    pub fn fit_transform_column(&mut self, column: &Column) -> Result<Series> {
        let values = column_as_strings(column)?;
        let codes = self.fit_transform(&values)?;
        Ok(Series::new(column.name().clone(), codes))
    }

    pub fn transform_column(&self, column: &Column) -> Result<Series> {
        let values = column_as_strings(column)?;
        let codes = self.transform(&values)?;
        Ok(Series::new(column.name().clone(), codes))
    }
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn column_as_strings(column: &Column) -> Result<Vec<String>> {
    let name = column.name().to_string();
    let as_str = column.cast(&DataType::String)?;
    as_str
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::to_string)
                .ok_or_else(|| CreditError::DataError(format!("null value in column '{}'", name)))
        })
        .collect()
}

/// Dataset after categorical and target encoding
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    frame: DataFrame,
    column_encoders: HashMap<String, LabelEncoder>,
    target_column: String,
    target_encoder: LabelEncoder,
}

impl EncodedDataset {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Encoder needed to turn predicted class indices back into labels
    pub fn target_encoder(&self) -> &LabelEncoder {
        &self.target_encoder
    }

    pub fn column_encoder(&self, name: &str) -> Option<&LabelEncoder> {
        self.column_encoders.get(name)
    }

    pub fn to_feature_matrix(&self) -> Result<FeatureMatrix> {
        FeatureMatrix::from_frame(&self.frame, &self.target_column)
    }
}

/// Encodes the declared categorical columns and the target column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    columns: Vec<String>,
    target: String,
}

impl CategoricalEncoder {
    pub fn new<S: AsRef<str>>(columns: &[S], target: impl Into<String>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            target: target.into(),
        }
    }

    /// Fit one encoder per column (plus one for the target) and replace the
    /// column values with their codes.
    pub fn encode(&self, dataset: Dataset) -> Result<EncodedDataset> {
        if self.columns.contains(&self.target) {
            return Err(CreditError::PreprocessingError(format!(
                "target column '{}' is also listed as a categorical feature",
                self.target
            )));
        }
        let mut df = dataset.into_frame();
        let mut column_encoders = HashMap::with_capacity(self.columns.len());

        for name in &self.columns {
            let mut encoder = LabelEncoder::new();
            let encoded = {
                let column = df
                    .column(name)
                    .map_err(|_| CreditError::FeatureNotFound(name.clone()))?;
                encoder.fit_transform_column(column)?
            };
            debug!(column = %name, n_classes = encoder.n_classes(), "Encoded categorical column");
            df.with_column(encoded)?;
            column_encoders.insert(name.clone(), encoder);
        }

        let mut target_encoder = LabelEncoder::new();
        let encoded_target = {
            let column = df
                .column(&self.target)
                .map_err(|_| CreditError::FeatureNotFound(self.target.clone()))?;
            target_encoder.fit_transform_column(column)?
        };
        df.with_column(encoded_target)?;
        debug!(column = %self.target, classes = ?target_encoder.classes(), "Encoded target column");

        Ok(EncodedDataset {
            frame: df,
            column_encoders,
            target_column: self.target.clone(),
            target_encoder,
        })
    }
}
