//! Dense solves for the normal equations of the linear models.

use ndarray::{Array2, ArrayView2};

/// Relative pivot size below which a direction is treated as degenerate.
const PIVOT_TOL: f64 = 1e-10;

/// Solve `a · x = b` for a symmetric positive semi-definite `a`.
///
/// Gaussian elimination without row exchange. A pivot that vanishes
/// (relative to the largest diagonal entry) marks a collinear or constant
/// feature; its coefficient is set to zero instead of failing, so duplicated
/// columns still yield a usable fit.
pub fn solve_psd(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let m = b.ncols();
    let mut a = a.to_owned();
    let mut b = b.to_owned();

    let max_diag = (0..n).map(|k| a[[k, k]].abs()).fold(0.0f64, f64::max);
    let tol = PIVOT_TOL * max_diag.max(f64::MIN_POSITIVE);
    let mut active = vec![true; n];

    for k in 0..n {
        let pivot = a[[k, k]];
        if pivot <= tol {
            active[k] = false;
            continue;
        }
        for i in k + 1..n {
            let f = a[[i, k]] / pivot;
            if f == 0.0 {
                continue;
            }
            for j in k..n {
                a[[i, j]] -= f * a[[k, j]];
            }
            for c in 0..m {
                b[[i, c]] -= f * b[[k, c]];
            }
        }
    }

    let mut x = Array2::<f64>::zeros((n, m));
    for k in (0..n).rev() {
        if !active[k] {
            continue;
        }
        for c in 0..m {
            let mut s = b[[k, c]];
            for j in k + 1..n {
                s -= a[[k, j]] * x[[j, c]];
            }
            x[[k, c]] = s / a[[k, k]];
        }
    }
    x
}
