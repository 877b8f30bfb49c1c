//! Regression sweep predicting atmospheric tendencies from flow variables.
//!
//! The pipeline loads a feature and a label dataset ([`io`]), checks their
//! time coordinates agree ([`consistency`]), flattens chosen variables into
//! tables ([`table`]), splits them once ([`split`]) and scores a menu of
//! estimators on the held-out rows ([`sweep`]). [`experiment::run`] chains
//! the stages for every configured experiment.

pub mod consistency;
pub mod error;
pub mod experiment;
pub mod grid;
pub mod io;
pub mod metrics;
pub mod models;
pub mod split;
pub mod sweep;
pub mod table;
pub mod timestamps;

pub use error::{Error, Result};
pub use experiment::{ExperimentReport, SweepConfig};
pub use grid::{GriddedDataset, Variable};
pub use sweep::ScoreRecord;
