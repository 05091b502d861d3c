//! Small helpers shared across CLI tests.
//!
//! The CLI unit tests run against a temporary data tree with fake `dbgen` and
//! HTTP backends. These helpers keep the test cases concise and consistent.

use std::cell::Cell;
use std::fs;
use std::io::Write;

use benchdata_core::download::DownloadClient;
use benchdata_core::tpch::{DbgenInvocation, DbgenRunner};
use benchdata_core::{DataLayout, DatasetError};
use tempfile::TempDir;

use super::{Backends, Cli, CliError, CommandOutcome, DatasetArgs, Settings, run_cli_with};

const BASE_URL: &str = "https://example.test/trip+data/";

const LINEITEM: &str = "\
1|155190|7706|1|17|21168.23|0.04|0.02|N|O|1996-03-13|1996-02-12|1996-03-22|DELIVER IN PERSON|TRUCK|egular courts|
1|67310|7311|2|36|45983.16|0.09|0.06|N|O|1996-04-12|1996-02-28|1996-04-20|TAKE BACK RETURN|MAIL|ly final|
";

const TRIP_MONTH: &str = "\
VendorID,pickup_longitude,pickup_latitude
2,-73.99,40.73
1,,40.70
";

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

pub(super) fn settings_for(dir: &TempDir) -> Settings {
    Settings {
        data_dir: Some(dir.path().join("data")),
        dbgen_dir: dir.path().join("tpch-dbgen"),
        download_dir: Some(dir.path().join(".download")),
        taxi_base_url: BASE_URL.to_owned(),
        ..Settings::default()
    }
}

pub(super) fn layout_for(dir: &TempDir) -> DataLayout {
    DataLayout::new(dir.path().join("data"))
}

pub(super) fn dataset_cli(dir: &TempDir, dataset: DatasetArgs) -> Cli {
    Cli {
        dataset,
        settings: settings_for(dir),
        command: None,
    }
}

pub(super) fn synthetic_args(
    dist: &str,
    points: usize,
    dimensions: usize,
    scale: f64,
) -> DatasetArgs {
    DatasetArgs {
        dist: Some(dist.to_owned()),
        points: Some(points),
        dimensions: Some(dimensions),
        scale: Some(scale),
        ..DatasetArgs::default()
    }
}

pub(super) fn real_args(name: &str, scale: Option<f64>) -> DatasetArgs {
    DatasetArgs {
        real: Some(name.to_owned()),
        scale,
        ..DatasetArgs::default()
    }
}

/// Places the files `dbgen` needs so the binary check passes.
pub(super) fn install_dbgen(dir: &TempDir) {
    let dbgen_dir = dir.path().join("tpch-dbgen");
    fs::create_dir_all(&dbgen_dir).expect("dbgen dir must be created");
    fs::write(dbgen_dir.join("dbgen"), "").expect("dbgen binary must be written");
    fs::write(dbgen_dir.join("dists.dss"), "").expect("dists must be written");
}

/// Writes [`LINEITEM`] instead of spawning a process.
#[derive(Default)]
pub(super) struct FakeDbgen {
    runs: Cell<usize>,
}

impl FakeDbgen {
    pub(super) fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl DbgenRunner for FakeDbgen {
    fn run(&self, invocation: &DbgenInvocation) -> benchdata_core::Result<()> {
        self.runs.set(self.runs.get().saturating_add(1));
        let table = invocation.work_dir.join("lineitem.tbl");
        fs::write(&table, LINEITEM).map_err(|source| DatasetError::Io {
            path: table.clone(),
            source,
        })
    }
}

/// Serves [`TRIP_MONTH`] for every URL.
#[derive(Default)]
pub(super) struct FakeDownloads {
    calls: Cell<usize>,
}

impl FakeDownloads {
    pub(super) fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DownloadClient for FakeDownloads {
    fn download_to(&self, url: &str, sink: &mut dyn Write) -> benchdata_core::Result<u64> {
        self.calls.set(self.calls.get().saturating_add(1));
        sink.write_all(TRIP_MONTH.as_bytes())
            .map_err(|error| DatasetError::Download {
                url: url.to_owned(),
                message: error.to_string(),
            })?;
        Ok(u64::try_from(TRIP_MONTH.len()).unwrap_or(u64::MAX))
    }
}

pub(super) fn run_with_fakes(
    cli: Cli,
    dbgen: &FakeDbgen,
    downloads: &FakeDownloads,
) -> Result<CommandOutcome, CliError> {
    run_cli_with(cli, Backends { dbgen, downloads })
}

pub(super) fn run_cli_expecting_error(cli: Cli, panic_msg: &str) -> CliError {
    match run_with_fakes(cli, &FakeDbgen::default(), &FakeDownloads::default()) {
        Ok(outcome) => panic!("{panic_msg}: {outcome:?}"),
        Err(err) => err,
    }
}
