//! Dataset loading and tabular representations
//!
//! - [`DataLoader`] reads the credit-default CSV into a polars frame
//! - [`ColumnSchema`] casts the declared columns to their working types
//! - [`FeatureMatrix`] is the numeric (X, y) view used by every later stage

mod loader;
mod schema;

pub use loader::{DataLoader, FileInfo};
pub use schema::{ColumnKind, ColumnSchema, DROPPED_COLUMNS, TARGET_COLUMN};

use crate::error::{CreditError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// A loaded table of named columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Feature matrix and integer target vector
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub x: Array2<f64>,
    pub y: Array1<i64>,
    pub feature_names: Vec<String>,
}

impl FeatureMatrix {
    pub fn new(x: Array2<f64>, y: Array1<i64>, feature_names: Vec<String>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} target values", x.nrows()),
                actual: y.len().to_string(),
            });
        }
        if x.ncols() != feature_names.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} feature names", x.ncols()),
                actual: feature_names.len().to_string(),
            });
        }
        Ok(Self { x, y, feature_names })
    }

    /// Split a frame into every non-target column (in frame order) and the target.
    pub fn from_frame(df: &DataFrame, target: &str) -> Result<Self> {
        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|s| s.to_string())
            .collect();

        let target_col = df
            .column(target)
            .map_err(|_| CreditError::FeatureNotFound(target.to_string()))?
            .cast(&DataType::Int64)?;

        let y: Array1<i64> = target_col
            .i64()?
            .into_iter()
            .map(|v| v.ok_or_else(|| CreditError::DataError(format!("null value in target column '{}'", target))))
            .collect::<Result<Vec<i64>>>()?
            .into();

        let x = columns_to_array2(df, &feature_names)?;
        Self::new(x, y, feature_names)
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Extract named columns into a row-major `Array2<f64>`.
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| CreditError::FeatureNotFound(col_name.clone()))?;
            let as_f64 = column.cast(&DataType::Float64)?;
            as_f64
                .f64()?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        CreditError::DataError(format!("null or non-numeric value in column '{}'", col_name))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_matrix_from_frame() {
        let df = df!(
            "AGE" => &[25i64, 40, 33],
            "LIMIT" => &[1000.0, 2500.5, 300.0],
            "PAY" => &[0i64, 1, 0]
        )
        .unwrap();

        let fm = FeatureMatrix::from_frame(&df, "PAY").unwrap();
        assert_eq!(fm.n_samples(), 3);
        assert_eq!(fm.n_features(), 2);
        assert_eq!(fm.feature_names, vec!["AGE".to_string(), "LIMIT".to_string()]);
        assert_eq!(fm.x[[1, 0]], 40.0);
        assert_eq!(fm.x[[1, 1]], 2500.5);
        assert_eq!(fm.y.to_vec(), vec![0, 1, 0]);
    }

    #[test]
    fn test_feature_matrix_missing_target() {
        let df = df!("AGE" => &[25i64, 40]).unwrap();
        let err = FeatureMatrix::from_frame(&df, "PAY").unwrap_err();
        assert!(matches!(err, CreditError::FeatureNotFound(ref c) if c == "PAY"));
    }

    #[test]
    fn test_feature_matrix_row_mismatch() {
        let x = Array2::<f64>::zeros((3, 1));
        let y = Array1::from_vec(vec![0i64, 1]);
        let err = FeatureMatrix::new(x, y, vec!["a".into()]).unwrap_err();
        assert!(matches!(err, CreditError::ShapeError { .. }));
    }
}
