//! Seeded train/test partition of aligned feature and label tables.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::table::Table;

/// One randomised partition of a feature/label table pair.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train_x: Array2<f64>,
    pub test_x: Array2<f64>,
    pub train_y: Array2<f64>,
    pub test_y: Array2<f64>,
    /// Source row of each training sample.
    pub train_rows: Vec<usize>,
    /// Source row of each test sample.
    pub test_rows: Vec<usize>,
}

impl TrainTestSplit {
    pub fn n_features(&self) -> usize {
        self.train_x.ncols()
    }

    pub fn n_labels(&self) -> usize {
        self.train_y.ncols()
    }
}

/// Number of held-out rows: `n × fraction`, rounded half to even.
pub fn test_size(n_rows: usize, test_fraction: f64) -> usize {
    (n_rows as f64 * test_fraction).round_ties_even() as usize
}

/// Shuffle row indices with `seed` and return `(train_rows, test_rows)`.
///
/// The first `test_size` shuffled rows are held out. The same `seed` and
/// `n_rows` always give the same partition.
pub fn partition_rows(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::Config(format!(
            "test fraction must lie in (0, 1), got {test_fraction}"
        )));
    }
    let n_test = test_size(n_rows, test_fraction);
    if n_test == 0 || n_test >= n_rows {
        return Err(Error::EmptySplit { rows: n_rows, fraction: test_fraction });
    }

    let mut rows: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);
    let train = rows.split_off(n_test);
    Ok((train, rows))
}

/// Split aligned tables into train and test matrices.
pub fn train_test_split(
    features: &Table,
    labels: &Table,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if features.n_rows() != labels.n_rows() {
        return Err(Error::RowMismatch {
            features: features.n_rows(),
            labels: labels.n_rows(),
        });
    }
    let (train_rows, test_rows) = partition_rows(features.n_rows(), test_fraction, seed)?;

    let x = features.to_array();
    let y = labels.to_array();
    Ok(TrainTestSplit {
        train_x: x.select(Axis(0), &train_rows),
        test_x: x.select(Axis(0), &test_rows),
        train_y: y.select(Axis(0), &train_rows),
        test_y: y.select(Axis(0), &test_rows),
        train_rows,
        test_rows,
    })
}
