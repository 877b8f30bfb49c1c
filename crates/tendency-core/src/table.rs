//! Flattening gridded variables into feature/label tables.
//!
//! Each selected variable becomes one column holding its slice flattened in
//! row-major order, so row `i` of every column refers to the same
//! (time, lat, lon) cell.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::GriddedDataset;

/// A variable to extract, with the vertical level to take when it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSlice {
    pub name: String,
    /// Index along the `lev` axis; `None` uses the table-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
}

impl VariableSlice {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), level: None }
    }

    pub fn at_level(name: impl Into<String>, level: usize) -> Self {
        Self { name: name.into(), level: Some(level) }
    }
}

/// Ordered, equal-length named columns. The row index is implicit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Vec<f64>)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Append a column. Its length must equal the current row count.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty() && values.len() != self.n_rows() {
            return Err(Error::ColumnLength {
                name,
                expected: self.n_rows(),
                got: values.len(),
            });
        }
        self.columns.push((name, values));
        Ok(())
    }

    /// Row-major `n_rows × n_cols` matrix of the table.
    pub fn to_array(&self) -> Array2<f64> {
        let (rows, cols) = (self.n_rows(), self.n_cols());
        Array2::from_shape_fn((rows, cols), |(r, c)| self.columns[c].1[r])
    }
}

/// Extract one variable as a flat column.
///
/// Surface variables `(time, lat, lon)` are taken whole. Level variables
/// `(time, lev, lat, lon)` are sliced at `slice.level`, or `default_level`
/// when the slice does not name one.
pub fn flatten_variable(
    ds: &GriddedDataset,
    slice: &VariableSlice,
    default_level: usize,
) -> Result<Vec<f64>> {
    let var = ds.variable(&slice.name)?;
    match var.rank() {
        3 => Ok(var.values.iter().copied().collect()),
        4 => {
            let level = slice.level.unwrap_or(default_level);
            let levels = var.shape()[1];
            if level >= levels {
                return Err(Error::LevelOutOfRange {
                    name: slice.name.clone(),
                    level,
                    levels,
                });
            }
            // logical iteration order of the sliced view is row-major
            Ok(var.values.index_axis(Axis(1), level).iter().copied().collect())
        }
        rank => Err(Error::Rank { name: slice.name.clone(), rank }),
    }
}

/// Build a table with one column per slice, in slice order.
pub fn tabularize(
    ds: &GriddedDataset,
    slices: &[VariableSlice],
    default_level: usize,
) -> Result<Table> {
    let mut table = Table::new();
    for slice in slices {
        table.push_column(slice.name.clone(), flatten_variable(ds, slice, default_level)?)?;
    }
    Ok(table)
}
