//! Time-coordinate agreement between the feature and label datasets.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const LOG_TARGET: &str = "tendency::align";

/// Outcome of comparing two time coordinates element by element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeAlignment {
    Match,
    /// First differing element.
    Mismatch { index: usize, left: f64, right: f64 },
    LengthMismatch { left: usize, right: usize },
}

impl TimeAlignment {
    pub fn is_match(&self) -> bool {
        matches!(self, TimeAlignment::Match)
    }

    fn describe(&self) -> String {
        match *self {
            TimeAlignment::Match => "time values match".into(),
            TimeAlignment::Mismatch { index, left, right } => {
                format!("time[{index}] is {left} in features but {right} in labels")
            }
            TimeAlignment::LengthMismatch { left, right } => {
                format!("{left} feature records vs {right} label records")
            }
        }
    }
}

/// What to do when the two datasets' time coordinates disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMismatchPolicy {
    /// Log a warning and carry on with possibly misaligned rows.
    #[default]
    Warn,
    /// Stop the pipeline with [`Error::TimeMismatch`].
    Abort,
}

/// Exact element-wise comparison. Never fails.
pub fn check_time_alignment(left: &[f64], right: &[f64]) -> TimeAlignment {
    if left.len() != right.len() {
        return TimeAlignment::LengthMismatch { left: left.len(), right: right.len() };
    }
    left.iter()
        .zip(right)
        .enumerate()
        // NaN != NaN, same as an element-wise array comparison
        .find(|(_, (a, b))| a != b)
        .map_or(TimeAlignment::Match, |(index, (&left, &right))| {
            TimeAlignment::Mismatch { index, left, right }
        })
}

/// Log the alignment result and apply `policy`.
pub fn enforce_alignment(alignment: TimeAlignment, policy: TimeMismatchPolicy) -> Result<()> {
    if alignment.is_match() {
        log::info!(target: LOG_TARGET, "OK: time values match as expected");
        return Ok(());
    }
    match policy {
        TimeMismatchPolicy::Warn => {
            log::warn!(
                target: LOG_TARGET,
                "non-matching time values ({}); continuing",
                alignment.describe()
            );
            Ok(())
        }
        TimeMismatchPolicy::Abort => Err(Error::TimeMismatch(alignment.describe())),
    }
}
