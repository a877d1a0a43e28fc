//! CSV adapter for the raw and cleaned training datasets.

use std::io::{Read, Write};

use crate::domain::cleaning::{CleanRecord, RawRecord};

/// Error type for dataset I/O.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset is missing required column {0}")]
    MissingColumn(String),
}

/// Columns every raw dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "age",
    "gender",
    "height",
    "weight",
    "ap_hi",
    "ap_lo",
    "cholesterol",
    "gluc",
    "smoke",
    "alco",
    "active",
];

/// Read raw records; empty cells become missing values.
///
/// # Errors
/// Returns `DatasetError::MissingColumn` if a required header is absent, or
/// a CSV error for unparseable cells.
pub fn read_records<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRecord>, DatasetError> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .into_iter()
        .find(|c| !headers.iter().any(|h| h == *c))
    {
        return Err(DatasetError::MissingColumn(missing.to_string()));
    }

    csv.deserialize()
        .collect::<Result<Vec<RawRecord>, _>>()
        .map_err(DatasetError::from)
}

/// Write cleaned records as comma-separated CSV with a header row.
///
/// # Errors
/// Returns an error if serialization or the underlying write fails.
pub fn write_records<W: Write>(writer: W, records: &[CleanRecord]) -> Result<(), DatasetError> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}
