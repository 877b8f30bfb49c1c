//! Tree ensembles: random forests and extremely randomised trees.
//!
//! Each member tree gets its own `StdRng` seeded from the ensemble seed and
//! the member index, so fitting order does not affect the result. With the
//! `threading` feature members are grown in parallel with rayon.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::tree::{DecisionTree, SplitStrategy};
use super::{check_features, check_fit_inputs, Regressor};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForestKind {
    /// Bootstrap samples, exhaustive best split.
    RandomForest,
    /// All samples, random thresholds.
    ExtraTrees,
}

#[derive(Debug, Clone)]
pub struct Forest {
    kind: ForestKind,
    n_trees: usize,
    seed: u64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_outputs: usize,
}

/// Per-member seed; splitmix64 finaliser so neighbouring indices diverge.
fn member_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Forest {
    pub fn new(kind: ForestKind, n_trees: usize, seed: u64) -> Self {
        Self { kind, n_trees, seed, trees: Vec::new(), n_features: 0, n_outputs: 0 }
    }

    fn grow_member(&self, x: ArrayView2<f64>, y: ArrayView2<f64>, index: usize) -> DecisionTree {
        let mut rng = StdRng::seed_from_u64(member_seed(self.seed, index));
        let n = x.nrows();
        let (strategy, rows) = match self.kind {
            ForestKind::RandomForest => {
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                (SplitStrategy::Best, rows)
            }
            ForestKind::ExtraTrees => (SplitStrategy::Random, (0..n).collect()),
        };
        let mut tree = DecisionTree::new(strategy);
        tree.fit(x, y, rows, &mut rng);
        tree
    }

    #[cfg(not(feature = "threading"))]
    fn grow(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Vec<DecisionTree> {
        (0..self.n_trees).map(|i| self.grow_member(x, y, i)).collect()
    }

    #[cfg(feature = "threading")]
    fn grow(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Vec<DecisionTree> {
        use rayon::prelude::*;
        (0..self.n_trees)
            .into_par_iter()
            .map(|i| self.grow_member(x, y, i))
            .collect()
    }
}

impl Regressor for Forest {
    fn name(&self) -> &'static str {
        match self.kind {
            ForestKind::RandomForest => "RandomForest",
            ForestKind::ExtraTrees => "ExtraTrees",
        }
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        if self.n_trees == 0 {
            return Err(Error::Config("a forest needs at least one tree".into()));
        }
        self.trees = self.grow(x, y);
        self.n_features = x.ncols();
        self.n_outputs = y.ncols();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(Error::NotFitted("forest"));
        }
        check_features(self.n_features, x)?;
        let mut out = Array2::<f64>::zeros((x.nrows(), self.n_outputs));
        for (row, mut acc) in x.rows().into_iter().zip(out.rows_mut()) {
            for tree in &self.trees {
                for (a, v) in acc.iter_mut().zip(tree.predict_row(row)) {
                    *a += v;
                }
            }
            acc /= self.trees.len() as f64;
        }
        Ok(out)
    }
}
