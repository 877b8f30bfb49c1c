//! NetCDF reader for CAM history files (enabled by the `netcdf` feature).

use std::path::Path;

use ndarray::{ArrayD, IxDyn};

use crate::error::{Error, Result};
use crate::grid::{GriddedDataset, Variable, TIME_DIM};

fn nc_err(path: &Path) -> impl FnOnce(netcdf::Error) -> Error + '_ {
    move |source| Error::NetCdf {
        path: path.to_path_buf(),
        source,
    }
}

/// Read every numeric variable of a NetCDF file as f64.
///
/// The `time` coordinate variable becomes the dataset time axis; its `units`
/// attribute, when textual, is kept for timestamp extraction. Variables that
/// cannot be read as f64 (character arrays, strings) are skipped.
pub fn read_dataset(path: &Path) -> Result<GriddedDataset> {
    let file = netcdf::open(path).map_err(nc_err(path))?;

    let (time, time_units) = match file.variable(TIME_DIM) {
        Some(var) => {
            let values = var.get_values::<f64, _>(..).map_err(nc_err(path))?;
            let units = var.attribute("units").and_then(|a| match a.value() {
                Ok(netcdf::AttributeValue::Str(s)) => Some(s),
                _ => None,
            });
            (values, units)
        }
        None => (Vec::new(), None),
    };

    let mut ds = GriddedDataset::new(time, time_units);
    for var in file.variables() {
        let name = var.name();
        if name == TIME_DIM {
            continue;
        }
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let data = match var.get_values::<f64, _>(..) {
            Ok(d) => d,
            Err(e) => {
                log::debug!(target: "tendency::load", "skipping '{name}' in {}: {e}", path.display());
                continue;
            }
        };
        let values = ArrayD::from_shape_vec(IxDyn(&shape), data)
            .map_err(|e| Error::Shape(format!("variable '{name}': {e}")))?;
        ds.insert(name, Variable::new(dims, values)?)?;
    }
    Ok(ds)
}
