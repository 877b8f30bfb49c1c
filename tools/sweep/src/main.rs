//! Regression sweep over flow and tendency datasets.
//!
//! Loads both multi-file datasets, checks that their time coordinates agree,
//! then fits and scores every estimator of the menu for each enabled
//! experiment. Scores go to the log on stderr; nothing is written to disk.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tendency_core::experiment::{self, SweepConfig};
use tendency_core::io::open_mfdataset;
use tendency_core::timestamps::dataset_timestamps;
use tendency_core::GriddedDataset;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sweep", about = "Score regression estimators predicting tendencies from flows")]
struct Args {
    /// Flow (feature) dataset files, joined along time in the given order.
    #[arg(long = "input_flows", num_args = 1.., required = true)]
    input_flows: Vec<PathBuf>,

    /// Tendency (label) dataset files, joined along time in the given order.
    #[arg(long = "input_tendencies", num_args = 1.., required = true)]
    input_tendencies: Vec<PathBuf>,

    /// JSON sweep configuration. Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn log_time_range(label: &str, ds: &GriddedDataset) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    match dataset_timestamps(ds) {
        Ok(stamps) => {
            if let (Some(first), Some(last)) = (stamps.first(), stamps.last()) {
                log::debug!("{label}: {} records from {first} to {last}", stamps.len());
            }
        }
        Err(e) => log::debug!("{label}: no calendar time ({e})"),
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => SweepConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SweepConfig::default(),
    };

    let flows = open_mfdataset(&args.input_flows).context("loading flow datasets")?;
    let tendencies =
        open_mfdataset(&args.input_tendencies).context("loading tendency datasets")?;
    log_time_range("flows", &flows);
    log_time_range("tendencies", &tendencies);

    let reports = experiment::run(&config, &flows, &tendencies)?;
    let scored: usize = reports.iter().map(|r| r.scores.len()).sum();
    log::debug!("{} experiments, {scored} scores", reports.len());
    Ok(())
}

/// Log text for a failed run: the context chain, plus a backtrace when
/// `RUST_BACKTRACE` is set.
fn failure_message(err: &anyhow::Error) -> String {
    format!("{err:?}")
}

/// Exit status for a failed run.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<tendency_core::Error>() {
        Some(tendency_core::Error::TimeMismatch(_)) => 3,
        Some(tendency_core::Error::Config(_)) => 4,
        _ => 1,
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", failure_message(&e));
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn errors_map_to_exit_codes() {
        let mismatch = anyhow::Error::new(tendency_core::Error::TimeMismatch("x".into()));
        assert_eq!(exit_code(&mismatch), 3);
        let config = anyhow::Error::new(tendency_core::Error::Config("bad".into()))
            .context("loading config sweep.json");
        assert_eq!(exit_code(&config), 4);
        assert_eq!(exit_code(&anyhow!("disk on fire")), 1);
    }

    #[test]
    fn failure_message_keeps_the_cause_chain() {
        let err = anyhow::Error::new(tendency_core::Error::MissingVariable("PTEQ".into()))
            .context("loading tendency datasets");
        let msg = failure_message(&err);
        assert!(msg.starts_with("loading tendency datasets"), "{msg}");
        assert!(msg.contains("Caused by:"), "{msg}");
        assert!(msg.contains("variable 'PTEQ' not found"), "{msg}");
    }

    #[test]
    fn both_inputs_are_required() {
        assert!(Args::try_parse_from(["sweep", "--input_flows", "a.json"]).is_err());
        let args = Args::try_parse_from([
            "sweep",
            "--input_flows",
            "a.json",
            "b.json",
            "--input_tendencies",
            "c.json",
        ])
        .unwrap();
        assert_eq!(args.input_flows.len(), 2);
        assert!(args.config.is_none());
    }

    #[test]
    fn no_output_file_flag() {
        let parsed = Args::try_parse_from([
            "sweep",
            "--input_flows",
            "a.json",
            "--input_tendencies",
            "c.json",
            "--report",
            "out.json",
        ]);
        assert!(parsed.is_err(), "scores are only logged");
    }
}
