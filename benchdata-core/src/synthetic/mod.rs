//! Seeded synthetic point clouds.
//!
//! Points are drawn independently from a uniform, Gaussian or lognormal
//! distribution and written row by row, so the row count is bounded only by
//! disk space. A fixed seed makes every file reproducible.

mod sampler;

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{SeedableRng, rngs::StdRng};
use tracing::{Span, field, info, instrument};

use crate::artifact::DatasetArtifact;
use crate::convert::encode;
use crate::error::{DatasetError, Result};
use crate::layout::DataLayout;
use crate::output::{CsvSink, StagedFile};
use sampler::Sampler;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: u64 = 999;

/// Distributions supported by the synthetic sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Distribution {
    /// `U[0, scale]` in every dimension.
    Uniform,
    /// `N(0, scale^2)` in every dimension.
    Gaussian,
    /// `LogNormal(0, scale)` in every dimension.
    Lognormal,
}

impl Distribution {
    /// All distributions in the order they are listed to users.
    pub const ALL: [Self; 3] = [Self::Uniform, Self::Gaussian, Self::Lognormal];

    /// Stable lowercase name used on the command line and in file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Gaussian => "gaussian",
            Self::Lognormal => "lognormal",
        }
    }

    /// Looks a distribution up by its [`name`](Self::name).
    ///
    /// # Examples
    /// ```
    /// use benchdata_core::Distribution;
    ///
    /// assert_eq!(Distribution::from_name("gaussian"), Some(Distribution::Gaussian));
    /// assert_eq!(Distribution::from_name("cauchy"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.name() == name)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of one synthetic dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticConfig {
    /// Sampling distribution.
    pub distribution: Distribution,
    /// Number of rows to generate.
    pub point_count: usize,
    /// Values per row.
    pub dimensions: usize,
    /// Bound for uniform data (which may be negative), standard deviation for
    /// Gaussian data and log-space sigma for lognormal data.
    pub scale: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl SyntheticConfig {
    /// Creates a configuration using [`DEFAULT_SEED`].
    #[must_use]
    pub const fn new(
        distribution: Distribution,
        point_count: usize,
        dimensions: usize,
        scale: f64,
    ) -> Self {
        Self {
            distribution,
            point_count,
            dimensions,
            scale,
            seed: DEFAULT_SEED,
        }
    }

    /// File name encoding the generation parameters.
    ///
    /// The scale is rendered in its shortest form, so integral scales carry no
    /// fractional part.
    ///
    /// # Examples
    /// ```
    /// use benchdata_core::{Distribution, SyntheticConfig};
    ///
    /// let config = SyntheticConfig::new(Distribution::Uniform, 1000, 2, 1.0);
    /// assert_eq!(config.file_name(), "uniform_1000_2_1.csv");
    /// let config = SyntheticConfig::new(Distribution::Lognormal, 10, 3, 0.5);
    /// assert_eq!(config.file_name(), "lognormal_10_3_0.5.csv");
    /// ```
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.csv",
            self.distribution, self.point_count, self.dimensions, self.scale
        )
    }

    /// Destination of this dataset within `layout`.
    #[must_use]
    pub fn output_path(&self, layout: &DataLayout) -> PathBuf {
        layout.synthetic_dir().join(self.file_name())
    }

    /// Returns an iterator over the sampled rows.
    ///
    /// A zero point count or zero dimensions yields no rows at all.
    ///
    /// # Errors
    /// Returns [`DatasetError`] when the shape or scale is invalid.
    ///
    /// # Examples
    /// ```
    /// use benchdata_core::{Distribution, SyntheticConfig};
    ///
    /// let config = SyntheticConfig::new(Distribution::Gaussian, 4, 3, 2.0);
    /// let rows: Vec<Vec<f64>> = config.rows()?.collect();
    /// assert_eq!(rows.len(), 4);
    /// assert!(rows.iter().all(|row| row.len() == 3));
    /// # Ok::<(), benchdata_core::DatasetError>(())
    /// ```
    pub fn rows(&self) -> Result<SyntheticRows> {
        self.validate_shape()?;
        let sampler = Sampler::new(self.distribution, self.scale)?;
        Ok(SyntheticRows {
            rng: StdRng::seed_from_u64(self.seed),
            sampler,
            remaining: if self.dimensions == 0 { 0 } else { self.point_count },
            dimensions: self.dimensions,
        })
    }

    const fn validate_shape(&self) -> Result<()> {
        if self.point_count.checked_mul(self.dimensions).is_none() {
            return Err(DatasetError::Overflow);
        }
        Ok(())
    }
}

/// Row-major iterator over sampled points.
///
/// Each row consumes `dimensions` consecutive draws from the seeded RNG.
#[derive(Clone, Debug)]
pub struct SyntheticRows {
    rng: StdRng,
    sampler: Sampler,
    remaining: usize,
    dimensions: usize,
}

impl Iterator for SyntheticRows {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.remaining = self.remaining.checked_sub(1)?;
        Some(
            (0..self.dimensions)
                .map(|_| self.sampler.sample(&mut self.rng))
                .collect(),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SyntheticRows {}

/// Samples the configured dataset and writes it under `layout`.
///
/// The file is written as `<name>.part` and renamed once complete.
///
/// # Errors
/// Returns [`DatasetError`] when the configuration is invalid or the file
/// cannot be written.
#[instrument(
    name = "synthetic.generate",
    err,
    skip(config, layout),
    fields(
        distribution = %config.distribution,
        point_count = config.point_count,
        dimensions = config.dimensions,
        scale = config.scale,
        seed = config.seed,
        path = field::Empty,
    ),
)]
pub fn generate(config: &SyntheticConfig, layout: &DataLayout) -> Result<DatasetArtifact> {
    let rows = config.rows()?;
    let target = config.output_path(layout);
    Span::current().record("path", field::display(target.display()));

    let mut sink = CsvSink::create(&target)?;
    for row in rows {
        sink.write_values(&row)?;
    }
    let (path, rows_written) = sink.finish()?;

    info!(rows = rows_written, path = %path.display(), "synthetic dataset written");
    Ok(DatasetArtifact {
        path,
        rows: rows_written,
        dimensions: config.dimensions,
    })
}

/// Samples the configured dataset straight into the flat binary format.
///
/// Rows are written to `output` as consecutive little-endian `f64` values,
/// the same layout [`convert::convert`](crate::convert::convert) produces,
/// without an intermediate text file. The same seed yields the same values
/// as [`generate`].
///
/// # Errors
/// Returns [`DatasetError`] when the configuration is invalid or the file
/// cannot be written.
///
/// # Examples
/// ```
/// # use benchdata_core::{Distribution, SyntheticConfig, synthetic};
/// # use benchdata_core::convert::read_binary_points;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let config = SyntheticConfig::new(Distribution::Uniform, 4, 2, 1.0);
/// let artifact = synthetic::generate_binary(&config, &dir.path().join("points.bin"))?;
/// assert_eq!(artifact.rows, 4);
/// assert_eq!(read_binary_points(&artifact.path, 2)?.len(), 4);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "synthetic.generate_binary",
    err,
    skip(config, output),
    fields(
        distribution = %config.distribution,
        point_count = config.point_count,
        dimensions = config.dimensions,
        scale = config.scale,
        seed = config.seed,
        path = %output.display(),
    ),
)]
pub fn generate_binary(config: &SyntheticConfig, output: &Path) -> Result<DatasetArtifact> {
    let rows = config.rows()?;
    let staged = StagedFile::new(output);
    let mut writer = BufWriter::new(staged.create()?);
    let mut rows_written = 0_u64;

    for row in rows {
        for value in row {
            writer
                .write_all(&encode(value))
                .map_err(|source| DatasetError::io(staged.staging_path(), source))?;
        }
        rows_written = rows_written.saturating_add(1);
    }

    writer
        .flush()
        .map_err(|source| DatasetError::io(staged.staging_path(), source))?;
    drop(writer);
    let path = staged.commit()?;

    info!(rows = rows_written, path = %path.display(), "binary synthetic dataset written");
    Ok(DatasetArtifact {
        path,
        rows: rows_written,
        dimensions: config.dimensions,
    })
}
