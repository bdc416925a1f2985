//! Min-max feature scaling

use crate::error::{CreditError, Result};
use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // min
    scale: f64,  // range
}

/// Rescales each column to `[0, 1]` using the min/max seen during fit.
///
/// Values outside the fitted range map outside `[0, 1]`; they are not clipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: Vec<ScalerParams>,
    data_min: Vec<f64>,
    data_max: Vec<f64>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit per-column bounds
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(CreditError::ValidationError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let (mins, maxs): (Vec<f64>, Vec<f64>) = x
            .axis_iter(Axis(1))
            .map(|col| {
                col.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    if v.is_nan() { (lo, hi) } else { (lo.min(v), hi.max(v)) }
                })
            })
            .unzip();

        self.params = mins
            .iter()
            .zip(maxs.iter())
            .map(|(&min, &max)| {
                let range = max - min;
                ScalerParams {
                    center: min,
                    scale: if range == 0.0 || !range.is_finite() { 1.0 } else { range },
                }
            })
            .collect();
        self.data_min = mins;
        self.data_max = maxs;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;

        let mut out = x.to_owned();
        for (mut col, params) in out.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            col.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;

        let center = Array1::from_iter(self.params.iter().map(|p| p.center));
        let scale = Array1::from_iter(self.params.iter().map(|p| p.scale));

        let mut out = x.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            Zip::from(&mut row)
                .and(&center)
                .and(&scale)
                .for_each(|v, &c, &s| *v = *v * s + c);
        }
        Ok(out)
    }

    pub fn data_min(&self) -> &[f64] {
        &self.data_min
    }

    pub fn data_max(&self) -> &[f64] {
        &self.data_max
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(CreditError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }
}
