//! Experiment configuration and the end-to-end pipeline.
//!
//! An experiment names the feature and label variables to tabularize; the
//! pipeline checks time alignment once, then for every enabled experiment
//! builds the tables, splits them and sweeps the estimator menu.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consistency::{check_time_alignment, enforce_alignment, TimeMismatchPolicy};
use crate::error::{Error, Result};
use crate::grid::GriddedDataset;
use crate::models::{default_menu, EstimatorSpec, SvrLabelPolicy};
use crate::split::train_test_split;
use crate::sweep::{run_sweep, ScoreRecord};
use crate::table::{tabularize, VariableSlice};

const LOG_TARGET: &str = "tendency::sweep";

/// One feature/label selection swept over the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String,
    pub features: Vec<VariableSlice>,
    pub labels: Vec<VariableSlice>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Experiment {
    pub fn new(name: &str, features: &[&str], labels: &[&str]) -> Self {
        Self {
            name: name.into(),
            features: features.iter().copied().map(VariableSlice::new).collect(),
            labels: labels.iter().copied().map(VariableSlice::new).collect(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// The three flow → tendency stages. The forcing-only stage is off unless
/// a configuration turns it on.
pub fn default_experiments() -> Vec<Experiment> {
    vec![
        Experiment::new("flows", &["PS", "T", "U", "V"], &["PTTEND", "PUTEND", "PVTEND"]),
        Experiment::new(
            "flows+forcing",
            &["PS", "T", "U", "V", "PRECL", "Q"],
            &["PTTEND", "PUTEND", "PVTEND", "PTEQ"],
        ),
        Experiment::new("forcing", &["PRECL", "Q"], &["PTEQ"]).disabled(),
    ]
}

// ── Configuration ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub test_fraction: f64,
    pub seed: u64,
    /// Vertical level used for variables whose slice names none.
    pub default_level: usize,
    pub time_mismatch: TimeMismatchPolicy,
    pub svr_labels: SvrLabelPolicy,
    pub estimators: Vec<EstimatorSpec>,
    pub experiments: Vec<Experiment>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.25,
            seed: 4,
            default_level: 0,
            time_mismatch: TimeMismatchPolicy::default(),
            svr_labels: SvrLabelPolicy::default(),
            estimators: default_menu(),
            experiments: default_experiments(),
        }
    }
}

impl SweepConfig {
    /// Read a JSON configuration; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        let config: SweepConfig = serde_json::from_str(&text)
            .map_err(|source| Error::Json { path: PathBuf::from(path), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::Config(format!(
                "test_fraction must lie in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.estimators.is_empty() {
            return Err(Error::Config("estimator menu is empty".into()));
        }
        for spec in &self.estimators {
            spec.validate()?;
        }
        if !self.experiments.iter().any(|e| e.enabled) {
            return Err(Error::Config("no enabled experiment".into()));
        }
        for exp in &self.experiments {
            if exp.features.is_empty() || exp.labels.is_empty() {
                return Err(Error::Config(format!(
                    "experiment '{}' needs at least one feature and one label",
                    exp.name
                )));
            }
        }
        Ok(())
    }
}

// ── Pipeline ───────────────────────────────────────────────────────────────

/// Scores of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub name: String,
    pub features: Vec<String>,
    pub labels: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub scores: Vec<ScoreRecord>,
}

fn names(slices: &[VariableSlice]) -> Vec<String> {
    slices.iter().map(|s| s.name.clone()).collect()
}

/// Check alignment, then sweep every enabled experiment in order.
pub fn run(
    config: &SweepConfig,
    features: &GriddedDataset,
    labels: &GriddedDataset,
) -> Result<Vec<ExperimentReport>> {
    config.validate()?;
    enforce_alignment(check_time_alignment(&features.time, &labels.time), config.time_mismatch)?;

    let mut reports = Vec::new();
    for exp in config.experiments.iter().filter(|e| e.enabled) {
        log::info!(
            target: LOG_TARGET,
            "experiment '{}': {:?} -> {:?}",
            exp.name,
            names(&exp.features),
            names(&exp.labels)
        );
        let x = tabularize(features, &exp.features, config.default_level)?;
        let y = tabularize(labels, &exp.labels, config.default_level)?;
        let split = train_test_split(&x, &y, config.test_fraction, config.seed)?;
        let scores = run_sweep(&split, &config.estimators, config.seed, config.svr_labels)?;
        reports.push(ExperimentReport {
            name: exp.name.clone(),
            features: names(&exp.features),
            labels: names(&exp.labels),
            n_train: split.train_rows.len(),
            n_test: split.test_rows.len(),
            scores,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Variable;
    use ndarray::{ArrayD, Dimension, IxDyn};

    const LEVEL: [&str; 4] = ["time", "lev", "lat", "lon"];
    const SURFACE: [&str; 3] = ["time", "lat", "lon"];

    fn field(dims: &[&str], f: impl Fn(&[usize]) -> f64) -> Variable {
        let shape: Vec<usize> = if dims.len() == 4 { vec![2, 2, 3, 3] } else { vec![2, 3, 3] };
        let values = ArrayD::from_shape_fn(IxDyn(&shape), |ix| f(ix.slice()));
        Variable::new(dims.iter().map(|d| d.to_string()).collect(), values).unwrap()
    }

    /// Smooth position-dependent value; the last two indices are (lat, lon).
    fn wave(ix: &[usize], phase: f64) -> f64 {
        let n = ix.len();
        let (t, j, i) = (ix[0] as f64, ix[n - 2] as f64, ix[n - 1] as f64);
        (0.7 * i + 0.4 * j + 0.3 * t + phase).sin() + 0.1 * (i + j)
    }

    /// (time=2, lev=2, lat=3, lon=3) flows and tendencies.
    fn datasets(label_time: Vec<f64>) -> (GriddedDataset, GriddedDataset) {
        let mut flows = GriddedDataset::new(vec![0.0, 0.25], None);
        flows.insert("PS", field(&SURFACE, |ix| 2.0 + wave(ix, 0.0))).unwrap();
        flows.insert("T", field(&LEVEL, |ix| 3.0 + wave(ix, 1.0))).unwrap();
        flows.insert("U", field(&LEVEL, |ix| wave(ix, 2.0))).unwrap();
        flows.insert("V", field(&LEVEL, |ix| wave(ix, 3.0))).unwrap();
        flows.insert("PRECL", field(&SURFACE, |ix| 0.5 * wave(ix, 4.0))).unwrap();
        flows.insert("Q", field(&LEVEL, |ix| 0.2 * wave(ix, 5.0))).unwrap();

        let mut tend = GriddedDataset::new(label_time, None);
        tend.insert("PTTEND", field(&LEVEL, |ix| 2.0 * wave(ix, 1.0))).unwrap();
        tend.insert("PUTEND", field(&LEVEL, |ix| -wave(ix, 2.0))).unwrap();
        tend.insert("PVTEND", field(&LEVEL, |ix| wave(ix, 3.0) + wave(ix, 0.0))).unwrap();
        tend.insert("PTEQ", field(&LEVEL, |ix| 0.1 * wave(ix, 5.0))).unwrap();
        (flows, tend)
    }

    #[test]
    fn default_config_matches_reference_run() {
        let c = SweepConfig::default();
        assert_eq!(c.test_fraction, 0.25);
        assert_eq!(c.seed, 4);
        assert_eq!(c.estimators.len(), 19);
        let enabled: Vec<&str> =
            c.experiments.iter().filter(|e| e.enabled).map(|e| e.name.as_str()).collect();
        assert_eq!(enabled, ["flows", "flows+forcing"]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: SweepConfig =
            serde_json::from_str(r#"{"seed": 11, "time_mismatch": "abort"}"#).unwrap();
        assert_eq!(c.seed, 11);
        assert_eq!(c.time_mismatch, TimeMismatchPolicy::Abort);
        assert_eq!(c.test_fraction, 0.25);
        assert_eq!(c.experiments, default_experiments());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut c = SweepConfig { test_fraction: 1.0, ..Default::default() };
        assert!(matches!(c.validate(), Err(Error::Config(_))));
        c.test_fraction = 0.25;
        c.estimators.clear();
        assert!(matches!(c.validate(), Err(Error::Config(_))));
        let mut c = SweepConfig::default();
        c.experiments.iter_mut().for_each(|e| e.enabled = false);
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SweepConfig::load(Path::new("/nonexistent/sweep.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn end_to_end_scores_every_estimator() {
        let (flows, tend) = datasets(vec![0.0, 0.25]);
        let reports = run(&SweepConfig::default(), &flows, &tend).unwrap();
        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert_eq!((report.n_train, report.n_test), (14, 4), "{}", report.name);
            assert_eq!(report.scores.len(), 19);
            assert!(
                report.scores.iter().all(|s| s.score.is_finite()),
                "{}: {:?}",
                report.name,
                report.scores
            );
        }
        assert_eq!(reports[1].labels, ["PTTEND", "PUTEND", "PVTEND", "PTEQ"]);
    }

    #[test]
    fn reruns_are_reproducible() {
        let (flows, tend) = datasets(vec![0.0, 0.25]);
        let config = SweepConfig::default();
        let a = run(&config, &flows, &tend).unwrap();
        let b = run(&config, &flows, &tend).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn time_mismatch_warns_by_default_and_aborts_on_request() {
        let (flows, tend) = datasets(vec![0.0, 0.5]);
        let mut config = SweepConfig {
            estimators: vec![EstimatorSpec::Linear],
            ..Default::default()
        };
        assert!(run(&config, &flows, &tend).is_ok());
        config.time_mismatch = TimeMismatchPolicy::Abort;
        assert!(matches!(run(&config, &flows, &tend), Err(Error::TimeMismatch(_))));
    }

    #[test]
    fn forcing_stage_runs_when_enabled() {
        let (flows, tend) = datasets(vec![0.0, 0.25]);
        let mut config = SweepConfig {
            estimators: vec![EstimatorSpec::Ridge { alpha: 1.0 }],
            ..Default::default()
        };
        config.experiments.iter_mut().for_each(|e| e.enabled = e.name == "forcing");
        let reports = run(&config, &flows, &tend).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].features, ["PRECL", "Q"]);
        assert_eq!(reports[0].scores[0].label, "Ridge");
    }

    #[test]
    fn missing_label_variable_fails() {
        let (flows, mut tend) = datasets(vec![0.0, 0.25]);
        tend = {
            let mut t = GriddedDataset::new(tend.time.clone(), None);
            t.insert("PTTEND", tend.variable("PTTEND").unwrap().clone()).unwrap();
            t
        };
        let err = run(&SweepConfig::default(), &flows, &tend).unwrap_err();
        assert!(matches!(err, Error::MissingVariable(ref name) if name == "PUTEND"), "{err}");
    }
}
