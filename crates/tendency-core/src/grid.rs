//! Gridded datasets: named n-d variables sharing a time coordinate.
//!
//! Dimension order follows CAM history files: `(time, lat, lon)` for surface
//! fields and `(time, lev, lat, lon)` for fields on model levels. All values
//! are held as f64, row-major.

use std::collections::BTreeMap;

use ndarray::{concatenate, ArrayD, Axis};

use crate::error::{Error, Result};

/// Name of the record dimension along which multi-file datasets are joined.
pub const TIME_DIM: &str = "time";

/// A single named array with its dimension names.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub values: ArrayD<f64>,
}

impl Variable {
    /// Build a variable, checking that `dims` names every axis of `values`.
    pub fn new(dims: Vec<String>, values: ArrayD<f64>) -> Result<Self> {
        if dims.len() != values.ndim() {
            return Err(Error::Shape(format!(
                "{} dimension names for a rank-{} array",
                dims.len(),
                values.ndim()
            )));
        }
        Ok(Self { dims, values })
    }

    pub fn rank(&self) -> usize {
        self.values.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// True when the leading dimension is the time record dimension.
    pub fn is_time_series(&self) -> bool {
        self.dims.first().is_some_and(|d| d == TIME_DIM)
    }
}

/// A collection of variables keyed by name, plus the time coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GriddedDataset {
    /// Time coordinate values, one per record.
    pub time: Vec<f64>,
    /// CF `units` attribute of the time coordinate, e.g. `days since 2000-12-27 00:00:00`.
    pub time_units: Option<String>,
    variables: BTreeMap<String, Variable>,
}

impl GriddedDataset {
    pub fn new(time: Vec<f64>, time_units: Option<String>) -> Self {
        Self { time, time_units, variables: BTreeMap::new() }
    }

    /// Add (or replace) a variable. Time-series variables must have one
    /// record per time coordinate value.
    pub fn insert(&mut self, name: impl Into<String>, var: Variable) -> Result<()> {
        let name = name.into();
        if var.is_time_series() && var.shape()[0] != self.time.len() {
            return Err(Error::Shape(format!(
                "variable '{name}' has {} records but the time coordinate has {}",
                var.shape()[0],
                self.time.len()
            )));
        }
        self.variables.insert(name, var);
        Ok(())
    }

    /// Look a variable up by name.
    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Join per-file datasets along the time dimension, in the given order.
    ///
    /// The variable set of the first part defines the result. Time-series
    /// variables are concatenated record-wise and must exist in every part
    /// with matching trailing shape; static variables are taken from the
    /// first part unchanged. Variables that only later parts carry are
    /// dropped with a warning. Parts whose time units disagree are rejected.
    pub fn concat_time(parts: Vec<GriddedDataset>) -> Result<GriddedDataset> {
        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            return Err(Error::Config("no dataset files given".into()));
        };
        let rest: Vec<GriddedDataset> = parts.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        for part in &rest {
            if let (Some(a), Some(b)) = (&first.time_units, &part.time_units) {
                if a != b {
                    return Err(Error::TimeUnits(format!(
                        "files disagree on time units: '{a}' vs '{b}'"
                    )));
                }
            }
            for name in part.names().filter(|n| !first.variables.contains_key(*n)) {
                log::warn!(
                    target: "tendency::load",
                    "variable '{name}' is missing from the first file; dropping it"
                );
            }
        }

        let time: Vec<f64> = first
            .time
            .iter()
            .chain(rest.iter().flat_map(|p| p.time.iter()))
            .copied()
            .collect();
        let mut out = GriddedDataset::new(time, first.time_units.clone());

        for (name, var) in &first.variables {
            if !var.is_time_series() {
                out.insert(name.clone(), var.clone())?;
                continue;
            }
            let mut views = vec![var.values.view()];
            for part in &rest {
                let other = part.variable(name)?;
                if other.dims != var.dims || other.shape()[1..] != var.shape()[1..] {
                    return Err(Error::Shape(format!(
                        "variable '{name}' has shape {:?} in one file and {:?} in another",
                        var.shape(),
                        other.shape()
                    )));
                }
                views.push(other.values.view());
            }
            let values = concatenate(Axis(0), &views)
                .map_err(|e| Error::Shape(format!("concatenating '{name}': {e}")))?;
            out.insert(name.clone(), Variable::new(var.dims.clone(), values)?)?;
        }
        Ok(out)
    }
}
