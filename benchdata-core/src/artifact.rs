//! Descriptions of written datasets.

use std::path::PathBuf;

/// A dataset file produced by one of the generators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetArtifact {
    /// Final location of the comma-delimited file.
    pub path: PathBuf,
    /// Number of rows written.
    pub rows: u64,
    /// Number of values per row.
    pub dimensions: usize,
}

/// Result of a generator that may decline to run.
///
/// Missing prerequisites are reported as [`GenerationOutcome::Skipped`] rather
/// than as errors so callers can print the reason and exit normally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The dataset was written.
    Generated(DatasetArtifact),
    /// Nothing was written.
    Skipped {
        /// Human-readable explanation for the user.
        reason: String,
    },
}
