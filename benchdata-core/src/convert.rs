//! Delimited text to flat binary conversion.
//!
//! The benchmark harness reads points as consecutive little-endian `f64`
//! values in row-major order with no header. These helpers produce and read
//! that format.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::artifact::DatasetArtifact;
use crate::error::{DatasetError, Result};
use crate::output::StagedFile;

pub(crate) const VALUE_WIDTH: usize = 8;

/// Settings for one conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Delimited text input.
    pub input: PathBuf,
    /// Binary output.
    pub output: PathBuf,
    /// Cell delimiter.
    pub delimiter: u8,
    /// Row count the input must contain, when known.
    pub expected_rows: Option<u64>,
    /// Values per row the input must contain, when known.
    pub expected_dimensions: Option<usize>,
}

impl ConvertConfig {
    /// Comma-delimited conversion without shape checks.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            delimiter: b',',
            expected_rows: None,
            expected_dimensions: None,
        }
    }
}

/// Converts a delimited point file into the flat binary format.
///
/// Without `expected_dimensions`, every row must match the width of the
/// first one. Blank lines are skipped.
///
/// # Errors
/// Returns [`DatasetError`] when a cell is not numeric, a row has the wrong
/// width, the row count differs from `expected_rows`, or I/O fails.
///
/// # Examples
/// ```
/// # use benchdata_core::convert::{ConvertConfig, convert, read_binary_points};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let input = dir.path().join("points.csv");
/// std::fs::write(&input, "1,2\n3,4\n")?;
/// let artifact = convert(&ConvertConfig::new(&input, dir.path().join("points.bin")))?;
/// assert_eq!(artifact.rows, 2);
/// let rows = read_binary_points(&artifact.path, 2)?;
/// assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "convert.to_binary",
    err,
    skip(config),
    fields(input = %config.input.display(), output = %config.output.display()),
)]
pub fn convert(config: &ConvertConfig) -> Result<DatasetArtifact> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&config.input)
        .map_err(|source| DatasetError::csv(&config.input, source))?;

    let staged = StagedFile::new(&config.output);
    let mut writer = BufWriter::new(staged.create()?);
    let mut width = config.expected_dimensions;
    let mut rows = 0_u64;

    for result in reader.records() {
        let record = result.map_err(|source| DatasetError::csv(&config.input, source))?;
        rows = rows.saturating_add(1);
        let expected = *width.get_or_insert(record.len());
        if record.len() != expected {
            return Err(DatasetError::DimensionMismatch {
                row: rows,
                expected,
                actual: record.len(),
            });
        }
        let line = record.position().map_or(rows, csv::Position::line);
        for cell in &record {
            let value = parse_value(cell, &config.input, line)?;
            writer
                .write_all(&encode(value))
                .map_err(|source| DatasetError::io(staged.staging_path(), source))?;
        }
    }

    if let Some(expected) = config.expected_rows {
        if expected != rows {
            return Err(DatasetError::RowCountMismatch {
                expected,
                actual: rows,
            });
        }
    }

    writer
        .flush()
        .map_err(|source| DatasetError::io(staged.staging_path(), source))?;
    drop(writer);
    let path = staged.commit()?;
    let dimensions = width.unwrap_or(0);

    info!(rows, dimensions, "binary dataset written");
    Ok(DatasetArtifact {
        path,
        rows,
        dimensions,
    })
}

/// Reads a flat binary file back into rows of `dimensions` values.
///
/// # Errors
/// Returns [`DatasetError::ZeroDimensions`] for a zero width,
/// [`DatasetError::MalformedTable`] when the byte length is not a whole number
/// of rows, or [`DatasetError::Io`] when the file cannot be read.
pub fn read_binary_points(path: &Path, dimensions: usize) -> Result<Vec<Vec<f64>>> {
    if dimensions == 0 {
        return Err(DatasetError::ZeroDimensions);
    }
    let bytes = fs::read(path).map_err(|source| DatasetError::io(path, source))?;
    let row_width = dimensions
        .checked_mul(VALUE_WIDTH)
        .ok_or(DatasetError::Overflow)?;

    let chunks = bytes.chunks_exact(row_width);
    if !chunks.remainder().is_empty() {
        return Err(DatasetError::MalformedTable {
            path: path.to_path_buf(),
            line: 0,
            message: format!(
                "{} bytes is not a whole number of {dimensions}-value rows",
                bytes.len()
            ),
        });
    }
    Ok(chunks
        .map(|row| row.chunks_exact(VALUE_WIDTH).map(decode).collect())
        .collect())
}

fn parse_value(cell: &str, path: &Path, line: u64) -> Result<f64> {
    cell.parse().map_err(|_| DatasetError::InvalidNumber {
        path: path.to_path_buf(),
        line,
        value: cell.to_owned(),
    })
}

#[expect(
    clippy::little_endian_bytes,
    reason = "the on-disk point format is defined as little-endian"
)]
pub(crate) const fn encode(value: f64) -> [u8; VALUE_WIDTH] {
    value.to_le_bytes()
}

#[expect(
    clippy::little_endian_bytes,
    reason = "the on-disk point format is defined as little-endian"
)]
fn decode(bytes: &[u8]) -> f64 {
    let mut buffer = [0_u8; VALUE_WIDTH];
    buffer.copy_from_slice(bytes);
    f64::from_le_bytes(buffer)
}
