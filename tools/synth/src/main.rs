/// Synthetic dataset generator: writes a pair of CAM-like flow and tendency
/// datasets as JSON documents that the `sweep` tool can read.
///
/// Flows (PS, T, U, V, PRECL, Q) are smooth travelling waves plus noise.
/// Tendencies (PTTEND, PUTEND, PVTEND, PTEQ) are mixtures of linear and
/// nonlinear functions of the flows at the same cell, so the estimators
/// have something to learn.
use std::f64::consts::TAU;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tendency_core::io::json::write_dataset;
use tendency_core::{GriddedDataset, Variable};

// ── Constants ────────────────────────────────────────────────────────────────

/// History files are written every six hours.
const RECORD_DAYS: f64 = 0.25;
const TIME_UNITS: &str = "days since 2000-12-27 00:00:00";
/// Relative amplitude of the uniform noise added to every field.
const NOISE: f64 = 0.05;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "synth", about = "Write synthetic flow/tendency datasets for the sweep tool")]
struct Args {
    /// Output directory (created if absent)
    #[arg(short, long, default_value = "data/synth")]
    output_dir: PathBuf,

    /// Total number of time records
    #[arg(long, default_value = "8")]
    times: usize,

    /// Number of vertical levels
    #[arg(long, default_value = "4")]
    levels: usize,

    #[arg(long, default_value = "12")]
    lats: usize,

    #[arg(long, default_value = "24")]
    lons: usize,

    /// Split the records over this many file pairs
    #[arg(long, default_value = "2")]
    files: usize,

    #[arg(long, default_value = "4")]
    seed: u64,

    /// Offset in days added to the tendency time coordinate
    #[arg(long, default_value = "0.0")]
    time_shift: f64,
}

// ── Field generation ─────────────────────────────────────────────────────────

const SURFACE: [&str; 3] = ["time", "lat", "lon"];
const LEVEL: [&str; 4] = ["time", "lev", "lat", "lon"];

/// Grid cell in normalised coordinates: phase in time, level fraction,
/// latitude in radians, longitude phase.
#[derive(Clone, Copy)]
struct Cell {
    t: f64,
    z: f64,
    lat: f64,
    lon: f64,
}

struct Grid {
    levels: usize,
    lats: usize,
    lons: usize,
}

impl Grid {
    fn cell(&self, record: usize, ix: &[usize]) -> Cell {
        let n = ix.len();
        let k = if n == 4 { ix[1] } else { 0 };
        Cell {
            t: record as f64 * RECORD_DAYS,
            z: k as f64 / self.levels.max(1) as f64,
            lat: ((ix[n - 2] as f64 + 0.5) / self.lats as f64 - 0.5) * std::f64::consts::PI,
            lon: ix[n - 1] as f64 / self.lons as f64 * TAU,
        }
    }

    /// Build one variable for records `start..start + count`.
    fn field(
        &self,
        dims: &[&str],
        start: usize,
        count: usize,
        rng: &mut StdRng,
        f: impl Fn(Cell) -> f64,
    ) -> Result<Variable> {
        let shape: Vec<usize> = if dims.len() == 4 {
            vec![count, self.levels, self.lats, self.lons]
        } else {
            vec![count, self.lats, self.lons]
        };
        let values = ArrayD::from_shape_fn(IxDyn(&shape), |ix| {
            let ix: Vec<usize> = (0..shape.len()).map(|a| ix[a]).collect();
            let v = f(self.cell(start + ix[0], &ix));
            v * (1.0 + NOISE * rng.gen_range(-1.0..1.0))
        });
        Ok(Variable::new(dims.iter().map(|d| d.to_string()).collect(), values)?)
    }
}

fn temperature(c: Cell) -> f64 {
    288.0 - 60.0 * c.z - 30.0 * c.lat.sin().powi(2) + 3.0 * (c.lon - TAU * c.t).cos()
}

fn zonal_wind(c: Cell) -> f64 {
    5.0 + 25.0 * (2.0 * c.lat).cos() * (1.0 - c.z) + 4.0 * (2.0 * c.lon + c.t).sin()
}

fn meridional_wind(c: Cell) -> f64 {
    6.0 * (3.0 * c.lon - TAU * c.t).sin() * c.lat.cos()
}

fn humidity(c: Cell) -> f64 {
    0.015 * c.lat.cos().powi(3) * (-3.0 * c.z).exp() * (1.2 + 0.3 * (c.lon + c.t).sin())
}

fn flows(grid: &Grid, start: usize, count: usize, rng: &mut StdRng) -> Result<GriddedDataset> {
    let time = (start..start + count).map(|r| r as f64 * RECORD_DAYS).collect();
    let mut ds = GriddedDataset::new(time, Some(TIME_UNITS.into()));
    ds.insert(
        "PS",
        grid.field(&SURFACE, start, count, rng, |c| {
            101_325.0 + 1_500.0 * (c.lon + 0.5 * c.lat - TAU * c.t).cos()
        })?,
    )?;
    ds.insert("T", grid.field(&LEVEL, start, count, rng, temperature)?)?;
    ds.insert("U", grid.field(&LEVEL, start, count, rng, zonal_wind)?)?;
    ds.insert("V", grid.field(&LEVEL, start, count, rng, meridional_wind)?)?;
    ds.insert(
        "PRECL",
        grid.field(&SURFACE, start, count, rng, |c| 2e-8 * (1.0 + humidity(c) / 0.015))?,
    )?;
    ds.insert("Q", grid.field(&LEVEL, start, count, rng, humidity)?)?;
    Ok(ds)
}

fn tendencies(
    grid: &Grid,
    start: usize,
    count: usize,
    time_shift: f64,
    rng: &mut StdRng,
) -> Result<GriddedDataset> {
    let time = (start..start + count).map(|r| r as f64 * RECORD_DAYS + time_shift).collect();
    let mut ds = GriddedDataset::new(time, Some(TIME_UNITS.into()));
    ds.insert(
        "PTTEND",
        grid.field(&LEVEL, start, count, rng, |c| {
            1e-5 * (0.02 * (temperature(c) - 260.0) + 0.1 * meridional_wind(c))
        })?,
    )?;
    ds.insert(
        "PUTEND",
        grid.field(&LEVEL, start, count, rng, |c| {
            -1e-5 * zonal_wind(c) * (1.0 + 0.1 * meridional_wind(c).abs())
        })?,
    )?;
    ds.insert(
        "PVTEND",
        grid.field(&LEVEL, start, count, rng, |c| {
            1e-5 * (zonal_wind(c) * meridional_wind(c) / 25.0)
        })?,
    )?;
    ds.insert(
        "PTEQ",
        grid.field(&LEVEL, start, count, rng, |c| {
            -1e-3 * humidity(c) * (1.0 + 0.05 * zonal_wind(c))
        })?,
    )?;
    Ok(ds)
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn run(args: &Args) -> Result<()> {
    if args.files == 0 || args.files > args.times {
        bail!("--files must lie in 1..={} (one record per file at least)", args.times);
    }
    if args.levels == 0 || args.lats == 0 || args.lons == 0 {
        bail!("grid dimensions must be non-zero");
    }
    let grid = Grid { levels: args.levels, lats: args.lats, lons: args.lons };
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let per_file = args.times.div_ceil(args.files);
    let mut start = 0;
    for file in 0..args.files {
        let count = per_file.min(args.times - start);
        if count == 0 {
            break;
        }
        let flow_path = args.output_dir.join(format!("flows_{file:03}.json"));
        let tend_path = args.output_dir.join(format!("tendencies_{file:03}.json"));
        write_dataset(&flow_path, &flows(&grid, start, count, &mut rng)?)
            .with_context(|| format!("writing {}", flow_path.display()))?;
        write_dataset(&tend_path, &tendencies(&grid, start, count, args.time_shift, &mut rng)?)
            .with_context(|| format!("writing {}", tend_path.display()))?;
        log::info!(
            "records {}..{} -> {} / {}",
            start,
            start + count,
            flow_path.display(),
            tend_path.display()
        );
        start += count;
    }
    if args.time_shift != 0.0 {
        log::warn!("tendency time shifted by {} days; the sweep will report a mismatch", args.time_shift);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    run(&Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendency_core::io::open_mfdataset;

    #[test]
    fn generated_files_load_back_as_one_dataset() {
        let dir = std::env::temp_dir().join(format!("synth-test-{}", std::process::id()));
        let args = Args {
            output_dir: dir.clone(),
            times: 5,
            levels: 2,
            lats: 3,
            lons: 4,
            files: 2,
            seed: 1,
            time_shift: 0.0,
        };
        run(&args).unwrap();

        let flows = open_mfdataset(&[dir.join("flows_000.json"), dir.join("flows_001.json")]).unwrap();
        let tends =
            open_mfdataset(&[dir.join("tendencies_000.json"), dir.join("tendencies_001.json")]).unwrap();
        assert_eq!(flows.time, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(flows.time, tends.time);
        assert_eq!(flows.variable("T").unwrap().shape(), &[5, 2, 3, 4]);
        assert_eq!(flows.variable("PS").unwrap().shape(), &[5, 3, 4]);
        assert_eq!(tends.variable("PTEQ").unwrap().shape(), &[5, 2, 3, 4]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn too_many_files_is_rejected() {
        let args = Args::try_parse_from(["synth", "--times", "2", "--files", "3"]).unwrap();
        assert!(run(&args).is_err());
    }
}
