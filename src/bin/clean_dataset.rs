//! Dataset cleaning utility for cardiorisk training data.
//!
//! Reads the raw cardio dataset, applies the cleaning pipeline and writes a
//! comma-separated CSV with the derived feature columns appended.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin clean_dataset -- <input.csv> <output.csv> [--delimiter ';']
//! ```

use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing_subscriber::EnvFilter;

use cardiorisk::adapters::dataset::{read_records, write_records};
use cardiorisk::domain::cleaning::clean;

fn usage() -> anyhow::Error {
    anyhow!("Usage: clean_dataset <input.csv> <output.csv> [--delimiter ';']")
}

fn parse_args() -> Result<(PathBuf, PathBuf, u8)> {
    let mut args = env::args().skip(1);
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut delimiter = b';';

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--delimiter" | "-d" => {
                let v = args.next().ok_or_else(usage)?;
                let [byte] = v.as_bytes() else {
                    bail!("--delimiter must be a single ASCII character");
                };
                delimiter = *byte;
            }
            "-h" | "--help" => return Err(usage()),
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    match <[PathBuf; 2]>::try_from(paths) {
        Ok([input, output]) => Ok((input, output, delimiter)),
        Err(_) => Err(usage()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (input, output, delimiter) = parse_args()?;

    let reader = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
    let records = read_records(BufReader::new(reader), delimiter)
        .with_context(|| format!("reading {}", input.display()))?;
    tracing::info!("Loaded {} rows from {}", records.len(), input.display());

    let (cleaned, report) = clean(records)?;
    tracing::info!(
        duplicates = report.duplicates_dropped,
        invalid_age = report.invalid_age_dropped,
        filled = report.values_filled,
        blood_pressure = report.blood_pressure_dropped,
        age_in_days = report.age_in_days,
        "Cleaning complete: {} -> {} rows",
        report.rows_in,
        report.rows_out
    );

    let writer = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    write_records(BufWriter::new(writer), &cleaned)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!("Wrote cleaned dataset to {}", output.display());

    Ok(())
}
