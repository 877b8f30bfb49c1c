//! Calendar timestamps from the numeric time coordinate.
//!
//! Time values count fractional days from an origin. Timestamps are
//! truncated to the minute.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::{Error, Result};
use crate::grid::GriddedDataset;

const SECONDS_PER_DAY: f64 = 86_400.0;
const MICROS_PER_DAY: f64 = SECONDS_PER_DAY * 1e6;
const MICROS_PER_MINUTE: i64 = 60_000_000;

/// Timestamps for `days` counted from `origin`, truncated to the minute.
pub fn timestamps_since(days: &[f64], origin: NaiveDateTime) -> Result<Vec<NaiveDateTime>> {
    days.iter()
        .map(|&d| {
            // microsecond resolution, then drop everything below the minute
            let micros = (d * MICROS_PER_DAY).round();
            let stamp = if micros.is_finite() && micros.abs() < i64::MAX as f64 {
                let micros = micros as i64;
                let delta = TimeDelta::microseconds(micros - micros.rem_euclid(MICROS_PER_MINUTE));
                origin.checked_add_signed(delta)
            } else {
                None
            };
            stamp.ok_or_else(|| Error::TimeUnits(format!("{d} days since {origin}")))
        })
        .collect()
}

/// Timestamps of `ds.time`, taken as days since midnight of `initial`.
pub fn extract_timestamps(ds: &GriddedDataset, initial: NaiveDate) -> Result<Vec<NaiveDateTime>> {
    let origin = initial
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::TimeUnits(initial.to_string()))?;
    timestamps_since(&ds.time, origin)
}

/// Origin of a CF `"days since YYYY-MM-DD[ HH:MM:SS]"` units string.
pub fn initial_date_from_units(units: &str) -> Result<NaiveDateTime> {
    let bad = || Error::TimeUnits(units.to_string());
    let rest = units.trim().strip_prefix("days since").ok_or_else(bad)?.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(origin) = NaiveDateTime::parse_from_str(rest, fmt) {
            return Ok(origin);
        }
    }
    NaiveDate::parse_from_str(rest, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(bad)
}

/// Timestamps of a dataset whose time coordinate carries CF units.
pub fn dataset_timestamps(ds: &GriddedDataset) -> Result<Vec<NaiveDateTime>> {
    let units = ds
        .time_units
        .as_deref()
        .ok_or_else(|| Error::TimeUnits("time coordinate has no units".into()))?;
    timestamps_since(&ds.time, initial_date_from_units(units)?)
}
