//! Brute-force k-nearest-neighbours regression (Euclidean, uniform weights).

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1, ArrayView2};

use super::{check_features, check_fit_inputs, Regressor};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct KNeighbors {
    k: usize,
    /// `k` capped at the training-set size.
    k_fit: usize,
    x: Option<Array2<f64>>,
    y: Array2<f64>,
}

impl KNeighbors {
    pub fn new(k: usize) -> Self {
        Self { k, k_fit: k, x: None, y: Array2::zeros((0, 0)) }
    }
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b).map(|(p, q)| (p - q).powi(2)).sum()
}

/// Distance first, then training index, so ties resolve deterministically.
fn by_distance(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

impl Regressor for KNeighbors {
    fn name(&self) -> &'static str {
        "KNeighbors"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        if self.k == 0 {
            return Err(Error::Config("k-neighbours needs k >= 1".into()));
        }
        self.k_fit = self.k.min(x.nrows());
        if self.k_fit < self.k {
            log::warn!(
                target: "tendency::sweep",
                "k={} exceeds the {} training samples; averaging all of them",
                self.k,
                x.nrows()
            );
        }
        self.x = Some(x.to_owned());
        self.y = y.to_owned();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let train = self.x.as_ref().ok_or(Error::NotFitted("k-neighbours"))?;
        check_features(train.ncols(), x)?;

        let mut out = Array2::<f64>::zeros((x.nrows(), self.y.ncols()));
        let mut dists: Vec<(f64, usize)> = Vec::with_capacity(train.nrows());
        for (query, mut acc) in x.rows().into_iter().zip(out.rows_mut()) {
            dists.clear();
            dists.extend(train.rows().into_iter().enumerate().map(|(i, t)| (sq_dist(query, t), i)));
            if self.k_fit < dists.len() {
                dists.select_nth_unstable_by(self.k_fit - 1, by_distance);
            }
            for &(_, i) in &dists[..self.k_fit] {
                acc += &self.y.row(i);
            }
            acc /= self.k_fit as f64;
        }
        Ok(out)
    }
}
