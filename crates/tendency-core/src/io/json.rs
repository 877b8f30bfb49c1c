//! JSON dataset documents.
//!
//! ```json
//! {
//!   "time": [0.0, 0.25],
//!   "time_units": "days since 2000-12-27 00:00:00",
//!   "variables": {
//!     "PS": { "dims": ["time", "lat", "lon"], "shape": [2, 96, 144], "data": [ ... ] }
//!   }
//! }
//! ```
//!
//! `data` is row-major. JSON has no NaN, so fill values are written as `null`
//! and read back as NaN.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{GriddedDataset, Variable};

fn null_as_nan_vec<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

#[derive(Serialize, Deserialize)]
pub struct DatasetDocument {
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub time: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_units: Option<String>,
    pub variables: BTreeMap<String, VariableDocument>,
}

#[derive(Serialize, Deserialize)]
pub struct VariableDocument {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub data: Vec<f64>,
}

impl DatasetDocument {
    pub fn into_dataset(self) -> Result<GriddedDataset> {
        let mut ds = GriddedDataset::new(self.time, self.time_units);
        for (name, doc) in self.variables {
            let values = ArrayD::from_shape_vec(IxDyn(&doc.shape), doc.data)
                .map_err(|e| Error::Shape(format!("variable '{name}': {e}")))?;
            ds.insert(name, Variable::new(doc.dims, values)?)?;
        }
        Ok(ds)
    }

    pub fn from_dataset(ds: &GriddedDataset) -> Self {
        let variables = ds
            .variables()
            .map(|(name, var)| {
                let doc = VariableDocument {
                    dims: var.dims.clone(),
                    shape: var.shape().to_vec(),
                    data: var.values.iter().copied().collect(),
                };
                (name.to_string(), doc)
            })
            .collect();
        Self {
            time: ds.time.clone(),
            time_units: ds.time_units.clone(),
            variables,
        }
    }
}

/// Read one JSON dataset document.
pub fn read_dataset(path: &Path) -> Result<GriddedDataset> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: DatasetDocument = serde_json::from_str(&text).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    doc.into_dataset()
}

/// Write a dataset as a JSON document.
pub fn write_dataset(path: &Path, ds: &GriddedDataset) -> Result<()> {
    let json = serde_json::to_string(&DatasetDocument::from_dataset(ds)).map_err(|source| {
        Error::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, json).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reads_back_as_nan() {
        let text = r#"{
            "time": [0.0],
            "variables": {
                "PS": { "dims": ["time", "lat", "lon"], "shape": [1, 1, 2], "data": [101325.0, null] }
            }
        }"#;
        let doc: DatasetDocument = serde_json::from_str(text).unwrap();
        let ds = doc.into_dataset().unwrap();
        let ps = ds.variable("PS").unwrap();
        assert_eq!(ps.values[[0, 0, 0]], 101325.0);
        assert!(ps.values[[0, 0, 1]].is_nan());
        assert!(ds.time_units.is_none());
    }

    #[test]
    fn shape_must_match_data_length() {
        let text = r#"{
            "time": [0.0],
            "variables": { "PS": { "dims": ["time", "lat"], "shape": [1, 3], "data": [1.0, 2.0] } }
        }"#;
        let doc: DatasetDocument = serde_json::from_str(text).unwrap();
        assert!(matches!(doc.into_dataset(), Err(Error::Shape(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_dataset(Path::new("/nonexistent/flows.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flows.json"), "{err}");
    }

    #[test]
    fn write_then_read_preserves_values() {
        let mut ds = GriddedDataset::new(vec![0.0, 0.5], Some("days since 2000-12-27".into()));
        let values = ArrayD::from_shape_vec(IxDyn(&[2, 1, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        ds.insert("PS", Variable::new(vec!["time".into(), "lat".into(), "lon".into()], values).unwrap())
            .unwrap();

        let path = std::env::temp_dir().join(format!("tendency-json-{}.json", std::process::id()));
        write_dataset(&path, &ds).unwrap();
        let back = read_dataset(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(back, ds);
    }
}
