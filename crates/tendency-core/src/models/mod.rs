//! Regression estimators and the configurable estimator menu.
//!
//! Every estimator is multi-output: labels are an `n_samples × n_outputs`
//! matrix and predictions come back in the same layout. Scoring is the
//! uniform-average R² of [`crate::metrics::r2_score`].

pub mod forest;
pub mod knn;
mod linalg;
pub mod linear;
pub mod svr;
pub mod tree;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::r2_score;

pub use forest::{Forest, ForestKind};
pub use knn::KNeighbors;
pub use linear::LinearModel;
pub use svr::{Gamma, Kernel, Svr, SvrLabelPolicy};

/// Common interface of every estimator in the sweep.
pub trait Regressor: Send {
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<()>;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Coefficient of determination of the predictions for `x` against `y`.
    fn score(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64> {
        let pred = self.predict(x)?;
        r2_score(y, pred.view())
    }
}

pub(crate) fn check_fit_inputs(x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<()> {
    if x.nrows() != y.nrows() {
        return Err(Error::RowMismatch { features: x.nrows(), labels: y.nrows() });
    }
    if x.nrows() == 0 || x.ncols() == 0 || y.ncols() == 0 {
        return Err(Error::Shape(format!(
            "cannot fit on {:?} features and {:?} labels",
            x.dim(),
            y.dim()
        )));
    }
    Ok(())
}

pub(crate) fn check_features(expected: usize, x: ArrayView2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(Error::Shape(format!(
            "model was fitted on {expected} features, got {}",
            x.ncols()
        )));
    }
    Ok(())
}

fn default_alpha() -> f64 {
    1.0
}

fn default_c() -> f64 {
    1e3
}

fn default_epsilon() -> f64 {
    0.1
}

fn default_max_iter() -> usize {
    svr::DEFAULT_MAX_ITER
}

/// One entry of the estimator menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    Linear,
    Ridge {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    RandomForest { trees: usize },
    KNeighbors { k: usize },
    ExtraTrees { trees: usize },
    Svr {
        kernel: Kernel,
        #[serde(default = "default_c")]
        c: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
        /// SMO step cap; reaching it logs a warning and keeps the partial fit.
        #[serde(default = "default_max_iter")]
        max_iter: usize,
    },
}

impl EstimatorSpec {
    /// Label used in log lines and reports.
    pub fn label(&self) -> String {
        match self {
            EstimatorSpec::Linear => "LRM".into(),
            EstimatorSpec::Ridge { .. } => "Ridge".into(),
            EstimatorSpec::RandomForest { trees } => format!("Random Forest (trees={trees})"),
            EstimatorSpec::KNeighbors { k } => format!("K-Neighbors (k={k})"),
            EstimatorSpec::ExtraTrees { trees } => format!("Extra Trees (trees={trees})"),
            EstimatorSpec::Svr { kernel, .. } => format!("SVR ({})", kernel.label()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(Error::Config(msg));
        match *self {
            EstimatorSpec::Ridge { alpha } if !(alpha >= 0.0) => {
                bad(format!("ridge alpha must be >= 0, got {alpha}"))
            }
            EstimatorSpec::RandomForest { trees: 0 } | EstimatorSpec::ExtraTrees { trees: 0 } => {
                bad(format!("{} needs at least one tree", self.label()))
            }
            EstimatorSpec::KNeighbors { k: 0 } => bad("k-neighbours needs k >= 1".into()),
            EstimatorSpec::Svr { c, epsilon, .. } if !(c > 0.0) || !(epsilon >= 0.0) => {
                bad(format!("SVR needs C > 0 and epsilon >= 0, got C={c}, epsilon={epsilon}"))
            }
            EstimatorSpec::Svr { max_iter: 0, .. } => bad("SVR needs max_iter >= 1".into()),
            _ => Ok(()),
        }
    }

    /// Instantiate an unfitted estimator. `seed` drives the tree ensembles.
    pub fn build(&self, seed: u64, svr_labels: SvrLabelPolicy) -> Box<dyn Regressor> {
        match self {
            EstimatorSpec::Linear => Box::new(LinearModel::ordinary()),
            EstimatorSpec::Ridge { alpha } => Box::new(LinearModel::ridge(*alpha)),
            EstimatorSpec::RandomForest { trees } => {
                Box::new(Forest::new(ForestKind::RandomForest, *trees, seed))
            }
            EstimatorSpec::ExtraTrees { trees } => {
                Box::new(Forest::new(ForestKind::ExtraTrees, *trees, seed))
            }
            EstimatorSpec::KNeighbors { k } => Box::new(KNeighbors::new(*k)),
            EstimatorSpec::Svr { kernel, c, epsilon, max_iter } => Box::new(
                Svr::new(*kernel, *c, *epsilon)
                    .with_max_iter(*max_iter)
                    .with_label_policy(svr_labels),
            ),
        }
    }
}

/// The fixed menu swept for every experiment.
pub fn default_menu() -> Vec<EstimatorSpec> {
    let mut menu = vec![EstimatorSpec::Linear, EstimatorSpec::Ridge { alpha: 1.0 }];
    menu.extend([3, 10, 20, 100, 250].map(|trees| EstimatorSpec::RandomForest { trees }));
    menu.extend([1, 3, 5, 10, 20].map(|k| EstimatorSpec::KNeighbors { k }));
    menu.extend([3, 6, 10, 20].map(|trees| EstimatorSpec::ExtraTrees { trees }));
    menu.extend(
        [
            Kernel::Linear,
            Kernel::Poly { degree: 2, gamma: Gamma::Scale, coef0: 0.0 },
            Kernel::Rbf { gamma: Gamma::Value(0.1) },
        ]
        .map(|kernel| EstimatorSpec::Svr {
            kernel,
            c: 1e3,
            epsilon: 0.1,
            max_iter: default_max_iter(),
        }),
    );
    menu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_menu_has_nineteen_entries() {
        let menu = default_menu();
        assert_eq!(menu.len(), 19);
        assert_eq!(menu[0].label(), "LRM");
        assert_eq!(menu[2].label(), "Random Forest (trees=3)");
        assert_eq!(menu[11].label(), "K-Neighbors (k=20)");
        assert_eq!(menu[12].label(), "Extra Trees (trees=3)");
        assert_eq!(menu[16].label(), "SVR (linear)");
        assert_eq!(menu[17].label(), "SVR (polynomial)");
        assert_eq!(menu[18].label(), "SVR (RBF)");
        assert!(menu.iter().all(|e| e.validate().is_ok()));
    }

    #[test]
    fn specs_parse_from_json() {
        let text = r#"[
            {"kind": "linear"},
            {"kind": "ridge"},
            {"kind": "random_forest", "trees": 7},
            {"kind": "svr", "kernel": {"type": "rbf", "gamma": {"value": 0.5}}}
        ]"#;
        let specs: Vec<EstimatorSpec> = serde_json::from_str(text).unwrap();
        assert_eq!(specs[1], EstimatorSpec::Ridge { alpha: 1.0 });
        assert_eq!(specs[2], EstimatorSpec::RandomForest { trees: 7 });
        assert_eq!(
            specs[3],
            EstimatorSpec::Svr {
                kernel: Kernel::Rbf { gamma: Gamma::Value(0.5) },
                c: 1e3,
                epsilon: 0.1,
                max_iter: 1_000_000,
            }
        );
    }

    #[test]
    fn invalid_specs_are_rejected() {
        assert!(EstimatorSpec::KNeighbors { k: 0 }.validate().is_err());
        assert!(EstimatorSpec::ExtraTrees { trees: 0 }.validate().is_err());
        assert!(EstimatorSpec::Ridge { alpha: -1.0 }.validate().is_err());
        let svr = |c, max_iter| EstimatorSpec::Svr { kernel: Kernel::Linear, c, epsilon: 0.1, max_iter };
        assert!(svr(0.0, 100).validate().is_err());
        assert!(svr(1.0, 0).validate().is_err());
        assert!(svr(1.0, 100).validate().is_ok());
    }

    #[test]
    fn built_estimators_report_their_names() {
        let e = EstimatorSpec::KNeighbors { k: 3 }.build(0, SvrLabelPolicy::PerColumn);
        assert_eq!(e.name(), "KNeighbors");
    }
}
