//! Dataset loaders.
//!
//! Files are dispatched on extension: `.json` documents are always readable,
//! `.nc` files need the `netcdf` feature.

pub mod json;
#[cfg(feature = "netcdf")]
pub mod nc;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grid::GriddedDataset;

const LOG_TARGET: &str = "tendency::load";

/// Open a single dataset file.
pub fn open_dataset(path: &Path) -> Result<GriddedDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => json::read_dataset(path),
        #[cfg(feature = "netcdf")]
        Some("nc" | "nc4" | "cdf") => nc::read_dataset(path),
        _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Open several files and join them along time, in argument order.
pub fn open_mfdataset(paths: &[PathBuf]) -> Result<GriddedDataset> {
    let mut parts = Vec::with_capacity(paths.len());
    for path in paths {
        let ds = open_dataset(path)?;
        log::debug!(
            target: LOG_TARGET,
            "{}: {} variables, {} records",
            path.display(),
            ds.len(),
            ds.time.len()
        );
        parts.push(ds);
    }
    let ds = GriddedDataset::concat_time(parts)?;
    log::info!(
        target: LOG_TARGET,
        "opened {} file(s): {} variables, {} time records",
        paths.len(),
        ds.len(),
        ds.time.len()
    );
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Variable;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = open_dataset(Path::new("flows.grib")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[cfg(not(feature = "netcdf"))]
    #[test]
    fn netcdf_requires_feature() {
        let err = open_dataset(Path::new("cam.h0.nc")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn multi_file_open_concatenates() {
        let dir = std::env::temp_dir().join(format!("tendency-mf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut paths = Vec::new();
        for (i, t) in [0.0, 0.25].iter().enumerate() {
            let mut ds = GriddedDataset::new(vec![*t], None);
            let values = ArrayD::from_elem(IxDyn(&[1, 2, 2]), i as f64);
            ds.insert(
                "PS",
                Variable::new(vec!["time".into(), "lat".into(), "lon".into()], values).unwrap(),
            )
            .unwrap();
            let path = dir.join(format!("flows_{i:03}.json"));
            json::write_dataset(&path, &ds).unwrap();
            paths.push(path);
        }

        let ds = open_mfdataset(&paths).unwrap();
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(ds.time, vec![0.0, 0.25]);
        let ps = ds.variable("PS").unwrap();
        assert_eq!(ps.shape(), &[2, 2, 2]);
        assert_eq!(ps.values[[1, 1, 1]], 1.0);
    }
}
