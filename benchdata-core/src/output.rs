//! Staged output files.
//!
//! Writers target `<name>.part` and only rename onto the final path once the
//! payload is complete, so an interrupted run never leaves a truncated file
//! under a name that later runs would trust.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DatasetError, Result};

const PART_SUFFIX: &str = ".part";

/// A file written under a temporary name and renamed into place on commit.
#[derive(Debug)]
pub(crate) struct StagedFile {
    target: PathBuf,
    staging: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub(crate) fn new(target: &Path) -> Self {
        let mut staging_name = target
            .file_name()
            .map_or_else(OsString::new, ToOwned::to_owned);
        staging_name.push(PART_SUFFIX);
        Self {
            target: target.to_path_buf(),
            staging: target.with_file_name(staging_name),
            committed: false,
        }
    }

    pub(crate) fn staging_path(&self) -> &Path {
        &self.staging
    }

    pub(crate) fn create(&self) -> Result<File> {
        File::create(&self.staging).map_err(|source| DatasetError::io(&self.staging, source))
    }

    pub(crate) fn commit(mut self) -> Result<PathBuf> {
        fs::rename(&self.staging, &self.target)
            .map_err(|source| DatasetError::io(&self.target, source))?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed || !self.staging.exists() {
            return;
        }
        if let Err(error) = fs::remove_file(&self.staging) {
            debug!(path = %self.staging.display(), %error, "failed to remove staging file");
        }
    }
}

/// Header-less comma-delimited writer over a [`StagedFile`].
// Field order matters: the writer must drop before the staged file removes it.
pub(crate) struct CsvSink {
    writer: csv::Writer<File>,
    staged: StagedFile,
    rows: u64,
}

impl CsvSink {
    pub(crate) fn create(target: &Path) -> Result<Self> {
        let staged = StagedFile::new(target);
        let file = staged.create()?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok(Self {
            writer,
            staged,
            rows: 0,
        })
    }

    pub(crate) fn write_values(&mut self, values: &[f64]) -> Result<()> {
        self.write_fields(values.iter().copied().map(format_value))
    }

    pub(crate) fn write_fields<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(fields)
            .map_err(|source| DatasetError::csv(self.staged.staging_path(), source))?;
        self.rows = self.rows.saturating_add(1);
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<(PathBuf, u64)> {
        let Self {
            mut writer,
            staged,
            rows,
        } = self;
        writer
            .flush()
            .map_err(|source| DatasetError::io(staged.staging_path(), source))?;
        drop(writer);
        let path = staged.commit()?;
        Ok((path, rows))
    }
}

const SCIENTIFIC_BELOW: f64 = 1e-4;
const SCIENTIFIC_FROM: f64 = 1e16;

/// Shortest round-trip rendering of `value`.
///
/// Magnitudes below `1e-4` or from `1e16` up switch to exponent notation so
/// tiny and huge samples stay compact instead of expanding to hundreds of
/// digits.
fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && (magnitude < SCIENTIFIC_BELOW || magnitude >= SCIENTIFIC_FROM) {
        format!("{value:e}")
    } else {
        value.to_string()
    }
}
