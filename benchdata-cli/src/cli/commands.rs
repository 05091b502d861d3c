//! Command implementations and argument parsing for the benchdata CLI.

use std::io::{self, Write};
use std::path::PathBuf;

use benchdata_core::convert::{self, ConvertConfig};
use benchdata_core::download::{DownloadClient, UreqDownloadClient};
use benchdata_core::taxi::{self, TAXI_BASE_URL, TaxiConfig};
use benchdata_core::tpch::{self, DEFAULT_DBGEN_DIR, DbgenRunner, ProcessDbgen, TpchConfig};
use benchdata_core::{
    DEFAULT_SEED, DataLayout, DatasetArtifact, DatasetError, DatasetErrorCode, Distribution,
    GenerationOutcome, SyntheticConfig, synthetic,
};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{Span, field, info, instrument, warn};

/// Printed when `--real` names an unknown dataset.
pub const REAL_DATASET_HINT: &str = "Please indicate one of ['tpc', 'osm', 'nytaxi'].";
/// Printed when `--dist` names an unknown distribution.
pub const DISTRIBUTION_HINT: &str = "Please indicate one of ['uniform', 'gaussian', 'lognormal'].";
/// Printed when neither `--dist` nor `--real` is given.
pub const USAGE_HINT: &str = "Please indicate correct arguments.";
/// Printed when a synthetic run lacks `-n`, `-d` or `-s`.
pub const SYNTHETIC_ARGS_HINT: &str = "Please provide -n, -d and -s.";
/// Printed when a TPC-H run lacks `-s`.
pub const SCALE_HINT: &str = "Please provide -s.";
/// Reason reported for `--real osm`.
pub const OSM_UNAVAILABLE: &str = "OpenStreetMap extraction is not available.";

const CONVERT_DATASET: &str = "binary";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone, Default)]
#[command(
    name = "benchdata",
    version,
    about = "Generate synthetic and real-world benchmark datasets."
)]
pub struct Cli {
    /// Dataset selection.
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Locations and seeds shared by every command.
    #[command(flatten)]
    pub settings: Settings,

    /// Optional subcommand; dataset generation runs when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Selects which dataset to generate.
///
/// Names are validated after parsing so that unknown values produce a hint
/// instead of a usage error.
#[derive(Debug, Args, Clone, Default)]
pub struct DatasetArgs {
    /// Synthetic distribution: uniform, gaussian or lognormal.
    #[arg(long)]
    pub dist: Option<String>,

    /// Real-world dataset: tpc, osm or nytaxi. Takes precedence over `--dist`.
    #[arg(long)]
    pub real: Option<String>,

    /// Number of points to sample.
    #[arg(short = 'n')]
    pub points: Option<usize>,

    /// Values per point.
    #[arg(short = 'd')]
    pub dimensions: Option<usize>,

    /// Distribution scale, or the TPC-H scale factor with `--real tpc`.
    #[arg(short = 's', allow_negative_numbers = true)]
    pub scale: Option<f64>,
}

/// Locations and seeds shared by every command.
#[derive(Debug, Args, Clone)]
pub struct Settings {
    /// Root of the dataset tree; defaults to `$BENCHDATA_DATA_DIR` or `./data/`.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Seed for synthetic sampling.
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Directory holding the compiled `dbgen` binary and `dists.dss`.
    #[arg(long, global = true, default_value = DEFAULT_DBGEN_DIR)]
    pub dbgen_dir: PathBuf,

    /// Cache for raw taxi files; defaults to `$BENCHDATA_DOWNLOAD_DIR` or `./.download/`.
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// URL prefix for the monthly taxi files.
    #[arg(long, global = true, default_value = TAXI_BASE_URL)]
    pub taxi_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            seed: DEFAULT_SEED,
            dbgen_dir: PathBuf::from(DEFAULT_DBGEN_DIR),
            download_dir: None,
            taxi_base_url: TAXI_BASE_URL.to_owned(),
        }
    }
}

impl Settings {
    fn layout(&self) -> DataLayout {
        self.data_dir
            .clone()
            .map_or_else(DataLayout::default, DataLayout::new)
    }

    fn taxi_config(&self) -> TaxiConfig {
        let defaults = TaxiConfig::default();
        TaxiConfig {
            download_dir: self.download_dir.clone().unwrap_or(defaults.download_dir),
            base_url: self.taxi_base_url.clone(),
        }
    }
}

/// Supported subcommands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Convert a delimited point file into little-endian `f64` binary.
    Convert(ConvertArgs),
    /// Sample a synthetic dataset straight into little-endian `f64` binary.
    GenData(GenDataArgs),
}

/// Options accepted by the `convert` command.
#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    /// Delimited text input.
    #[arg(long)]
    pub input: PathBuf,

    /// Binary output.
    #[arg(long)]
    pub output: PathBuf,

    /// Cell delimiter.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Number of rows the input must contain.
    #[arg(long)]
    pub rows: Option<u64>,

    /// Number of values each row must contain.
    #[arg(long)]
    pub dims: Option<usize>,
}

/// Options accepted by the `gen-data` command.
///
/// The global `--seed` applies.
#[derive(Debug, Args, Clone)]
pub struct GenDataArgs {
    /// Synthetic distribution: uniform, gaussian or lognormal.
    #[arg(long)]
    pub dist: String,

    /// Number of points to sample.
    #[arg(long)]
    pub num: usize,

    /// Values per point.
    #[arg(long)]
    pub dim: usize,

    /// Distribution scale.
    #[arg(long, allow_negative_numbers = true)]
    pub scale: f64,

    /// Binary output.
    #[arg(long)]
    pub output: PathBuf,
}

/// External effects used by the real-data generators.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    /// Runs the TPC-H generator.
    pub dbgen: &'a dyn DbgenRunner,
    /// Fetches remote files.
    pub downloads: &'a dyn DownloadClient,
}

impl Default for Backends<'static> {
    fn default() -> Self {
        Self {
            dbgen: &ProcessDbgen,
            downloads: &UreqDownloadClient,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The `convert` delimiter is not a single-byte character.
    #[error("delimiter `{delimiter}` must be a single ASCII character")]
    InvalidDelimiter {
        /// Value supplied by the user.
        delimiter: char,
    },
    /// Dataset generation or conversion failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl CliError {
    /// Stable code of the underlying dataset error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<DatasetErrorCode> {
        match self {
            Self::Dataset(error) => Some(error.code()),
            Self::InvalidDelimiter { .. } => None,
        }
    }
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A file was written.
    Generated {
        /// Dataset label shown to the user.
        dataset: String,
        /// The written file.
        artifact: DatasetArtifact,
    },
    /// A prerequisite is missing; nothing was written.
    Skipped {
        /// Dataset label shown to the user.
        dataset: String,
        /// Explanation for the user.
        reason: String,
    },
    /// The invocation was incomplete; the message tells the user what to add.
    Hint(&'static str),
}

impl CommandOutcome {
    fn from_generation(dataset: &str, outcome: GenerationOutcome) -> Self {
        match outcome {
            GenerationOutcome::Generated(artifact) => Self::Generated {
                dataset: dataset.to_owned(),
                artifact,
            },
            GenerationOutcome::Skipped { reason } => Self::Skipped {
                dataset: dataset.to_owned(),
                reason,
            },
        }
    }
}

/// Executes `cli` with the production backends.
///
/// The data directory tree is created before anything else, even when the
/// invocation turns out to be incomplete.
///
/// # Errors
/// Returns [`CliError`] when generation or conversion fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use benchdata_cli::cli::{Cli, CommandOutcome, DatasetArgs, Settings, run_cli};
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = tempfile::tempdir()?;
/// let cli = Cli {
///     dataset: DatasetArgs {
///         dist: Some("uniform".into()),
///         points: Some(4),
///         dimensions: Some(2),
///         scale: Some(1.0),
///         ..DatasetArgs::default()
///     },
///     settings: Settings {
///         data_dir: Some(dir.path().to_path_buf()),
///         ..Settings::default()
///     },
///     command: None,
/// };
/// let CommandOutcome::Generated { artifact, .. } = run_cli(cli)? else {
///     return Err("expected a generated dataset".into());
/// };
/// assert_eq!(artifact.rows, 4);
/// # Ok(())
/// # }
/// ```
pub fn run_cli(cli: Cli) -> Result<CommandOutcome, CliError> {
    run_cli_with(cli, Backends::default())
}

/// [`run_cli`] with explicit backends.
///
/// # Errors
/// Returns [`CliError`] when generation or conversion fails.
#[instrument(
    name = "cli.run",
    err,
    skip(cli, backends),
    fields(command = field::Empty, data_dir = field::Empty),
)]
pub fn run_cli_with(cli: Cli, backends: Backends<'_>) -> Result<CommandOutcome, CliError> {
    let Cli {
        dataset,
        settings,
        command,
    } = cli;
    let layout = settings.layout();
    let span = Span::current();
    span.record("data_dir", field::display(layout.root().display()));
    layout.ensure()?;

    match command {
        Some(Command::Convert(args)) => {
            span.record("command", "convert");
            run_convert(args)
        }
        Some(Command::GenData(args)) => {
            span.record("command", "gen-data");
            run_gen_data(args, settings.seed)
        }
        None => {
            span.record("command", "generate");
            run_dataset(&dataset, &settings, &layout, backends)
        }
    }
}

#[instrument(
    name = "cli.execute",
    err,
    skip_all,
    fields(kind = field::Empty, dataset = field::Empty),
)]
pub(super) fn run_dataset(
    args: &DatasetArgs,
    settings: &Settings,
    layout: &DataLayout,
    backends: Backends<'_>,
) -> Result<CommandOutcome, CliError> {
    let span = Span::current();
    let outcome = match (args.real.as_deref(), args.dist.as_deref()) {
        (Some(real), _) => {
            span.record("kind", "real");
            span.record("dataset", real);
            run_real(real, args.scale, settings, layout, backends)?
        }
        (None, Some(dist)) => {
            span.record("kind", "synthetic");
            span.record("dataset", dist);
            run_synthetic(dist, args, settings.seed, layout)?
        }
        (None, None) => CommandOutcome::Hint(USAGE_HINT),
    };

    match &outcome {
        CommandOutcome::Generated { dataset, artifact } => info!(
            dataset = dataset.as_str(),
            rows = artifact.rows,
            "command completed"
        ),
        CommandOutcome::Skipped { dataset, reason } => {
            warn!(dataset = dataset.as_str(), reason = reason.as_str(), "dataset skipped");
        }
        CommandOutcome::Hint(hint) => warn!(hint, "incomplete invocation"),
    }
    Ok(outcome)
}

fn run_real(
    name: &str,
    scale: Option<f64>,
    settings: &Settings,
    layout: &DataLayout,
    backends: Backends<'_>,
) -> Result<CommandOutcome, CliError> {
    let outcome = match name {
        "tpc" => {
            let Some(scale_factor) = scale else {
                return Ok(CommandOutcome::Hint(SCALE_HINT));
            };
            let config = TpchConfig {
                dbgen_dir: settings.dbgen_dir.clone(),
                scale_factor,
            };
            tpch::generate_with_runner(&config, layout, backends.dbgen)?
        }
        "osm" => GenerationOutcome::Skipped {
            reason: OSM_UNAVAILABLE.to_owned(),
        },
        "nytaxi" => GenerationOutcome::Generated(taxi::generate_with_client(
            &settings.taxi_config(),
            layout,
            backends.downloads,
        )?),
        _ => return Ok(CommandOutcome::Hint(REAL_DATASET_HINT)),
    };
    Ok(CommandOutcome::from_generation(name, outcome))
}

fn run_synthetic(
    name: &str,
    args: &DatasetArgs,
    seed: u64,
    layout: &DataLayout,
) -> Result<CommandOutcome, CliError> {
    let Some(distribution) = Distribution::from_name(name) else {
        return Ok(CommandOutcome::Hint(DISTRIBUTION_HINT));
    };
    let (Some(point_count), Some(dimensions), Some(scale)) =
        (args.points, args.dimensions, args.scale)
    else {
        return Ok(CommandOutcome::Hint(SYNTHETIC_ARGS_HINT));
    };

    let config = SyntheticConfig {
        seed,
        ..SyntheticConfig::new(distribution, point_count, dimensions, scale)
    };
    let artifact = synthetic::generate(&config, layout)?;
    Ok(CommandOutcome::Generated {
        dataset: distribution.name().to_owned(),
        artifact,
    })
}

#[instrument(
    name = "cli.convert",
    err,
    skip(args),
    fields(input = %args.input.display(), output = %args.output.display()),
)]
pub(super) fn run_convert(args: ConvertArgs) -> Result<CommandOutcome, CliError> {
    let ConvertArgs {
        input,
        output,
        delimiter,
        rows,
        dims,
    } = args;
    let byte = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(CliError::InvalidDelimiter { delimiter })?;

    let config = ConvertConfig {
        delimiter: byte,
        expected_rows: rows,
        expected_dimensions: dims,
        ..ConvertConfig::new(input, output)
    };
    let artifact = convert::convert(&config)?;
    info!(rows = artifact.rows, "conversion completed");
    Ok(CommandOutcome::Generated {
        dataset: CONVERT_DATASET.to_owned(),
        artifact,
    })
}

#[instrument(
    name = "cli.gen_data",
    err,
    skip(args),
    fields(dist = args.dist.as_str(), output = %args.output.display()),
)]
pub(super) fn run_gen_data(args: GenDataArgs, seed: u64) -> Result<CommandOutcome, CliError> {
    let GenDataArgs {
        dist,
        num,
        dim,
        scale,
        output,
    } = args;
    let Some(distribution) = Distribution::from_name(&dist) else {
        warn!(hint = DISTRIBUTION_HINT, "incomplete invocation");
        return Ok(CommandOutcome::Hint(DISTRIBUTION_HINT));
    };

    let config = SyntheticConfig {
        seed,
        ..SyntheticConfig::new(distribution, num, dim, scale)
    };
    let artifact = synthetic::generate_binary(&config, &output)?;
    info!(rows = artifact.rows, "binary generation completed");
    Ok(CommandOutcome::Generated {
        dataset: distribution.name().to_owned(),
        artifact,
    })
}

/// Renders `outcome` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use benchdata_cli::cli::{CommandOutcome, render_summary};
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mut buffer = Vec::new();
/// render_summary(&CommandOutcome::Hint("Please provide -s."), &mut buffer)?;
/// assert_eq!(buffer, b"Please provide -s.\n");
/// # Ok(())
/// # }
/// ```
pub fn render_summary(outcome: &CommandOutcome, mut writer: impl Write) -> io::Result<()> {
    match outcome {
        CommandOutcome::Generated { dataset, artifact } => {
            writeln!(writer, "dataset: {dataset}")?;
            writeln!(writer, "path: {}", artifact.path.display())?;
            writeln!(writer, "rows: {}", artifact.rows)?;
            writeln!(writer, "dimensions: {}", artifact.dimensions)?;
        }
        CommandOutcome::Skipped { reason, .. } => writeln!(writer, "{reason}")?,
        CommandOutcome::Hint(hint) => writeln!(writer, "{hint}")?,
    }
    Ok(())
}
