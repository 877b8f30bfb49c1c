//! Error type shared by every stage of the sweep.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "netcdf")]
    #[error("netCDF error in {path}: {source}")]
    NetCdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("variable '{name}' has rank {rank}; expected (time, lat, lon) or (time, lev, lat, lon)")]
    Rank { name: String, rank: usize },

    #[error("variable '{name}' has {levels} vertical levels; level {level} requested")]
    LevelOutOfRange { name: String, level: usize, levels: usize },

    #[error("column '{name}' has {got} rows; table has {expected}")]
    ColumnLength { name: String, expected: usize, got: usize },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("feature table has {features} rows but label table has {labels}")]
    RowMismatch { features: usize, labels: usize },

    #[error("split of {rows} rows at test fraction {fraction} leaves an empty partition")]
    EmptySplit { rows: usize, fraction: f64 },

    #[error("time coordinates disagree: {0}")]
    TimeMismatch(String),

    #[error("{estimator} supports a single label column; got {columns}")]
    MultiOutputUnsupported { estimator: String, columns: usize },

    #[error("{0} used before fit")]
    NotFitted(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid time units: {0}")]
    TimeUnits(String),
}
