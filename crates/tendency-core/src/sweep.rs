//! Fit and score every estimator of a menu on one train/test split.

use crate::error::Result;
use crate::models::{EstimatorSpec, SvrLabelPolicy};
use crate::split::TrainTestSplit;

const LOG_TARGET: &str = "tendency::sweep";

/// Held-out R² of one estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub label: String,
    pub score: f64,
}

/// Train each menu entry on the training side and score it on the test side.
///
/// Entries run in menu order and each score is logged as soon as it is known.
/// The first failing estimator aborts the sweep; scores already logged stay
/// in the log.
pub fn run_sweep(
    split: &TrainTestSplit,
    menu: &[EstimatorSpec],
    seed: u64,
    svr_labels: SvrLabelPolicy,
) -> Result<Vec<ScoreRecord>> {
    log::debug!(
        target: LOG_TARGET,
        "sweeping {} estimators on {} train / {} test rows ({} features -> {} labels)",
        menu.len(),
        split.train_x.nrows(),
        split.test_x.nrows(),
        split.n_features(),
        split.n_labels()
    );

    let mut records = Vec::with_capacity(menu.len());
    for spec in menu {
        let label = spec.label();
        let mut model = spec.build(seed, svr_labels);
        model.fit(split.train_x.view(), split.train_y.view())?;
        let score = model.score(split.test_x.view(), split.test_y.view())?;
        log::info!(target: LOG_TARGET, "{label} score: {score}");
        records.push(ScoreRecord { label, score });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::train_test_split;
    use crate::table::Table;
    use crate::Error;

    fn planar(n: usize) -> (Table, Table) {
        let a: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
        let b: Vec<f64> = (0..n).map(|i| (i / 7) as f64).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 3.0 * a - b + 2.0).collect();
        let mut x = Table::new();
        x.push_column("a", a).unwrap();
        x.push_column("b", b).unwrap();
        let mut t = Table::new();
        t.push_column("y", y).unwrap();
        (x, t)
    }

    #[test]
    fn one_record_per_estimator_in_menu_order() {
        let (x, y) = planar(49);
        let split = train_test_split(&x, &y, 0.25, 4).unwrap();
        let menu = vec![
            EstimatorSpec::Linear,
            EstimatorSpec::KNeighbors { k: 1 },
            EstimatorSpec::ExtraTrees { trees: 3 },
        ];
        let records = run_sweep(&split, &menu, 4, SvrLabelPolicy::PerColumn).unwrap();
        let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["LRM", "K-Neighbors (k=1)", "Extra Trees (trees=3)"]);
        assert!(records[0].score > 0.999, "exact plane, got {}", records[0].score);
        assert!(records.iter().all(|r| r.score.is_finite()));
    }

    #[test]
    fn failing_estimator_stops_the_sweep() {
        let (x, mut y) = planar(20);
        y.push_column("z", vec![1.0; 20]).unwrap();
        let split = train_test_split(&x, &y, 0.25, 4).unwrap();
        let menu = vec![
            EstimatorSpec::Svr {
                kernel: crate::models::Kernel::Linear,
                c: 1e3,
                epsilon: 0.1,
                max_iter: 1_000,
            },
        ];
        let err = run_sweep(&split, &menu, 4, SvrLabelPolicy::RequireSingle).unwrap_err();
        assert!(matches!(err, Error::MultiOutputUnsupported { columns: 2, .. }));
    }
}
