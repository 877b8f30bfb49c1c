//! Least-squares linear models with intercept: ordinary and ridge.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::linalg::solve_psd;
use super::{check_features, check_fit_inputs, Regressor};
use crate::error::{Error, Result};

/// `y = X·coef + intercept`, fitted on centred data.
///
/// `alpha = 0` is ordinary least squares; `alpha > 0` adds an L2 penalty on
/// the coefficients (not the intercept).
#[derive(Debug, Clone)]
pub struct LinearModel {
    alpha: f64,
    /// `n_features × n_outputs`.
    coef: Option<Array2<f64>>,
    intercept: Array1<f64>,
}

impl LinearModel {
    pub fn ordinary() -> Self {
        Self { alpha: 0.0, coef: None, intercept: Array1::zeros(0) }
    }

    pub fn ridge(alpha: f64) -> Self {
        Self { alpha, coef: None, intercept: Array1::zeros(0) }
    }

    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.coef.as_ref()
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }
}

impl Regressor for LinearModel {
    fn name(&self) -> &'static str {
        if self.alpha > 0.0 { "Ridge" } else { "LinearRegression" }
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        if self.alpha < 0.0 {
            return Err(Error::Config(format!("ridge alpha must be >= 0, got {}", self.alpha)));
        }
        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(y.ncols()));
        let xc = &x - &x_mean;
        let yc = &y - &y_mean;

        let mut gram = xc.t().dot(&xc);
        for k in 0..gram.nrows() {
            gram[[k, k]] += self.alpha;
        }
        let rhs = xc.t().dot(&yc);
        let coef = solve_psd(gram.view(), rhs.view());

        self.intercept = &y_mean - &x_mean.dot(&coef);
        self.coef = Some(coef);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let coef = self.coef.as_ref().ok_or(Error::NotFitted("linear model"))?;
        check_features(coef.nrows(), x)?;
        Ok(x.dot(coef) + &self.intercept)
    }
}
