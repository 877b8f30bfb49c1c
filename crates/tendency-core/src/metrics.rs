//! Coefficient of determination.

use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::error::{Error, Result};

/// R² of one output column.
///
/// A constant target has no variance to explain: the score is 1.0 for an
/// exact prediction and 0.0 otherwise.
pub fn r2_column(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    let n = y_true.len() as f64;
    let mean = y_true.sum() / n;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// R² averaged uniformly over output columns.
pub fn r2_score(y_true: ArrayView2<f64>, y_pred: ArrayView2<f64>) -> Result<f64> {
    if y_true.dim() != y_pred.dim() {
        return Err(Error::Shape(format!(
            "targets are {:?} but predictions are {:?}",
            y_true.dim(),
            y_pred.dim()
        )));
    }
    if y_true.is_empty() {
        return Err(Error::Shape("cannot score an empty prediction".into()));
    }
    let total: f64 = y_true
        .axis_iter(Axis(1))
        .zip(y_pred.axis_iter(Axis(1)))
        .map(|(t, p)| r2_column(t, p))
        .sum();
    Ok(total / y_true.ncols() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn perfect_prediction_scores_one() {
        let y = array![[1.0, 2.0], [3.0, 5.0], [4.0, 1.0]];
        assert_abs_diff_eq!(r2_score(y.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let y = array![[1.0], [2.0], [3.0]];
        let p = array![[2.0], [2.0], [2.0]];
        assert_abs_diff_eq!(r2_score(y.view(), p.view()).unwrap(), 0.0);
    }

    #[test]
    fn columns_are_averaged() {
        // column 0 perfect (1.0), column 1 at the mean (0.0)
        let y = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let p = array![[1.0, 2.0], [2.0, 2.0], [3.0, 2.0]];
        assert_abs_diff_eq!(r2_score(y.view(), p.view()).unwrap(), 0.5);
    }

    #[test]
    fn known_value() {
        let y = array![[3.0], [-0.5], [2.0], [7.0]];
        let p = array![[2.5], [0.0], [2.0], [8.0]];
        assert_abs_diff_eq!(r2_score(y.view(), p.view()).unwrap(), 0.948_608_137, epsilon = 1e-8);
    }

    #[test]
    fn constant_target() {
        let y = array![[2.0], [2.0]];
        assert_eq!(r2_score(y.view(), y.view()).unwrap(), 1.0);
        let p = array![[2.0], [3.0]];
        assert_eq!(r2_score(y.view(), p.view()).unwrap(), 0.0);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let y = array![[1.0], [2.0]];
        let p = array![[1.0, 2.0], [2.0, 3.0]];
        assert!(r2_score(y.view(), p.view()).is_err());
    }
}
