//! TPC-H `lineitem` extracts.
//!
//! The reference `dbgen` tool writes the pipe-delimited `lineitem.tbl`; this
//! module keeps its quantity, extended price, discount and tax columns. At
//! scale factor `s` the table holds roughly `6 * s` million rows.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{Span, field, info, instrument, warn};

use crate::artifact::{DatasetArtifact, GenerationOutcome};
use crate::error::{DatasetError, Result};
use crate::layout::DataLayout;
use crate::output::CsvSink;

/// Location of the `dbgen` checkout used when none is supplied.
pub const DEFAULT_DBGEN_DIR: &str = "../tools/tpch-dbgen";
/// Message reported when the generator binary is missing.
pub const MISSING_DBGEN_HINT: &str = "Compile the tpch-dbgen first.";

const DBGEN_BINARY: &str = "dbgen";
const DISTS_FILE: &str = "dists.dss";
const LINEITEM_TABLE: &str = "lineitem.tbl";
/// `l_quantity`, `l_extendedprice`, `l_discount`, `l_tax`.
const LINEITEM_COLUMNS: [usize; 4] = [4, 5, 6, 7];

/// Settings for one TPC-H extract.
#[derive(Clone, Debug, PartialEq)]
pub struct TpchConfig {
    /// Directory containing the compiled `dbgen` binary and `dists.dss`.
    pub dbgen_dir: PathBuf,
    /// TPC-H scale factor.
    pub scale_factor: f64,
}

impl TpchConfig {
    /// Creates a configuration using [`DEFAULT_DBGEN_DIR`].
    #[must_use]
    pub fn new(scale_factor: f64) -> Self {
        Self {
            dbgen_dir: PathBuf::from(DEFAULT_DBGEN_DIR),
            scale_factor,
        }
    }

    /// Name of the extract, e.g. `tpc_1.csv`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("tpc_{}.csv", self.scale_factor)
    }

    fn binary(&self) -> PathBuf {
        self.dbgen_dir.join(DBGEN_BINARY)
    }
}

/// Arguments for a single `dbgen` run.
#[derive(Clone, Debug, PartialEq)]
pub struct DbgenInvocation {
    /// Absolute path to the binary.
    pub binary: PathBuf,
    /// Absolute path to the distributions file.
    pub dists: PathBuf,
    /// Scale factor passed with `-s`.
    pub scale_factor: f64,
    /// Directory that receives `lineitem.tbl`.
    pub work_dir: PathBuf,
}

impl DbgenInvocation {
    /// Command-line arguments, excluding the program.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        vec![
            "-T".to_owned(),
            "L".to_owned(),
            "-b".to_owned(),
            self.dists.display().to_string(),
            "-s".to_owned(),
            self.scale_factor.to_string(),
        ]
    }
}

/// Runs the TPC-H generator.
pub trait DbgenRunner {
    /// Executes `invocation`, leaving `lineitem.tbl` in its working directory.
    ///
    /// # Errors
    /// Returns [`DatasetError`] when the process cannot be spawned or fails.
    fn run(&self, invocation: &DbgenInvocation) -> Result<()>;
}

/// Runs `dbgen` as a child process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessDbgen;

impl DbgenRunner for ProcessDbgen {
    fn run(&self, invocation: &DbgenInvocation) -> Result<()> {
        let status = Command::new(&invocation.binary)
            .args(invocation.args())
            .current_dir(&invocation.work_dir)
            .status()
            .map_err(|source| DatasetError::io(&invocation.binary, source))?;
        if status.success() {
            Ok(())
        } else {
            Err(DatasetError::DbgenFailed {
                status: status.to_string(),
            })
        }
    }
}

/// Runs `dbgen` and writes the four-column extract under `layout`.
///
/// Returns [`GenerationOutcome::Skipped`] when the binary has not been built.
///
/// # Errors
/// Returns [`DatasetError`] when `dbgen` fails or its output is malformed.
pub fn generate(config: &TpchConfig, layout: &DataLayout) -> Result<GenerationOutcome> {
    generate_with_runner(config, layout, &ProcessDbgen)
}

/// [`generate`] with an explicit runner.
///
/// # Errors
/// Returns [`DatasetError`] when `dbgen` fails or its output is malformed.
#[instrument(
    name = "tpch.generate",
    err,
    skip(config, layout, runner),
    fields(
        scale_factor = config.scale_factor,
        dbgen = %config.binary().display(),
        path = field::Empty,
    ),
)]
pub fn generate_with_runner(
    config: &TpchConfig,
    layout: &DataLayout,
    runner: &dyn DbgenRunner,
) -> Result<GenerationOutcome> {
    let binary = config.binary();
    if !binary.is_file() {
        warn!(path = %binary.display(), "dbgen binary not found");
        return Ok(GenerationOutcome::Skipped {
            reason: MISSING_DBGEN_HINT.to_owned(),
        });
    }

    let work_dir = layout.real_dir();
    let table = work_dir.join(LINEITEM_TABLE);
    // dbgen prompts before overwriting, so a leftover table must go first.
    remove_if_present(&table)?;

    let invocation = DbgenInvocation {
        binary: absolute(&binary)?,
        dists: absolute(&config.dbgen_dir.join(DISTS_FILE))?,
        scale_factor: config.scale_factor,
        work_dir: absolute(&work_dir)?,
    };
    runner.run(&invocation)?;

    let target = work_dir.join(config.file_name());
    Span::current().record("path", field::display(target.display()));
    let (path, rows) = extract_lineitem(&table, &target)?;
    remove_if_present(&table)?;

    info!(rows, path = %path.display(), "TPC-H extract written");
    Ok(GenerationOutcome::Generated(DatasetArtifact {
        path,
        rows,
        dimensions: LINEITEM_COLUMNS.len(),
    }))
}

fn extract_lineitem(table: &Path, target: &Path) -> Result<(PathBuf, u64)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .from_path(table)
        .map_err(|source| DatasetError::csv(table, source))?;

    let mut sink = CsvSink::create(target)?;
    let mut values = [0.0_f64; LINEITEM_COLUMNS.len()];
    for result in reader.records() {
        let record = result.map_err(|source| DatasetError::csv(table, source))?;
        let line = record.position().map_or(0, csv::Position::line);
        for (slot, column) in values.iter_mut().zip(LINEITEM_COLUMNS) {
            let raw = record.get(column).ok_or_else(|| DatasetError::MalformedTable {
                path: table.to_path_buf(),
                line,
                message: format!("missing column {column} (found {} fields)", record.len()),
            })?;
            *slot = raw.trim().parse().map_err(|_| DatasetError::InvalidNumber {
                path: table.to_path_buf(),
                line,
                value: raw.to_owned(),
            })?;
        }
        sink.write_values(&values)?;
    }
    sink.finish()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|source| DatasetError::io(path, source))
}

fn remove_if_present(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|source| DatasetError::io(path, source))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::cell::RefCell;
    use tempfile::TempDir;

    const SAMPLE_TABLE: &str = "\
1|155190|7706|1|17|21168.23|0.04|0.02|N|O|1996-03-13|1996-02-12|1996-03-22|DELIVER IN PERSON|TRUCK|egular courts above the|
1|67310|7311|2|36|45983.16|0.09|0.06|N|O|1996-04-12|1996-02-28|1996-04-20|TAKE BACK RETURN|MAIL|ly final dependencies: slyly bold |
1|63700|3701|3|8|13309.60|0.10|0.02|N|O|1996-01-29|1996-03-05|1996-01-31|TAKE BACK RETURN|REG AIR|riously. regular, express dep|
";

    /// Writes a canned table instead of spawning a process.
    struct FakeDbgen {
        table: &'static str,
        invocations: RefCell<Vec<DbgenInvocation>>,
    }

    impl FakeDbgen {
        fn new(table: &'static str) -> Self {
            Self {
                table,
                invocations: RefCell::new(Vec::new()),
            }
        }
    }

    impl DbgenRunner for FakeDbgen {
        fn run(&self, invocation: &DbgenInvocation) -> Result<()> {
            self.invocations.borrow_mut().push(invocation.clone());
            let path = invocation.work_dir.join(LINEITEM_TABLE);
            fs::write(&path, self.table).map_err(|source| DatasetError::io(&path, source))
        }
    }

    struct FailingDbgen;

    impl DbgenRunner for FailingDbgen {
        fn run(&self, _invocation: &DbgenInvocation) -> Result<()> {
            Err(DatasetError::DbgenFailed {
                status: "exit status: 1".to_owned(),
            })
        }
    }

    struct Workspace {
        _dir: TempDir,
        layout: DataLayout,
        config: TpchConfig,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = TempDir::new().expect("temp dir must be created");
        let layout = DataLayout::new(dir.path().join("data"));
        layout.ensure().expect("layout must be created");
        let dbgen_dir = dir.path().join("tpch-dbgen");
        fs::create_dir_all(&dbgen_dir).expect("dbgen dir must be created");
        fs::write(dbgen_dir.join(DBGEN_BINARY), "").expect("binary stub must be written");
        fs::write(dbgen_dir.join(DISTS_FILE), "").expect("dists stub must be written");
        Workspace {
            _dir: dir,
            layout,
            config: TpchConfig {
                dbgen_dir,
                scale_factor: 1.0,
            },
        }
    }

    #[rstest]
    fn extracts_four_columns_and_removes_table(workspace: Workspace) {
        let runner = FakeDbgen::new(SAMPLE_TABLE);

        let outcome = generate_with_runner(&workspace.config, &workspace.layout, &runner)
            .expect("extraction must succeed");

        let GenerationOutcome::Generated(artifact) = outcome else {
            panic!("expected a generated artifact");
        };
        assert_eq!(artifact.rows, 3);
        assert_eq!(artifact.dimensions, 4);
        assert_eq!(artifact.path, workspace.layout.real_dir().join("tpc_1.csv"));
        assert_eq!(
            fs::read_to_string(&artifact.path).expect("extract must exist"),
            "17,21168.23,0.04,0.02\n36,45983.16,0.09,0.06\n8,13309.6,0.1,0.02\n"
        );
        assert!(!workspace.layout.real_dir().join(LINEITEM_TABLE).exists());
    }

    #[rstest]
    fn invocation_matches_dbgen_conventions(workspace: Workspace) {
        let runner = FakeDbgen::new(SAMPLE_TABLE);
        let config = TpchConfig {
            scale_factor: 0.5,
            ..workspace.config.clone()
        };

        generate_with_runner(&config, &workspace.layout, &runner)
            .expect("extraction must succeed");

        let invocations = runner.invocations.borrow();
        let invocation = invocations.first().expect("dbgen must run once");
        assert_eq!(invocations.len(), 1);
        assert!(invocation.binary.is_absolute());
        assert!(invocation.binary.ends_with("tpch-dbgen/dbgen"));
        assert!(invocation.dists.ends_with("tpch-dbgen/dists.dss"));
        let args = invocation.args();
        assert_eq!(
            args.get(..3),
            Some(&["-T".to_owned(), "L".to_owned(), "-b".to_owned()][..])
        );
        assert_eq!(args.get(4..), Some(&["-s".to_owned(), "0.5".to_owned()][..]));
        assert!(workspace.layout.real_dir().join("tpc_0.5.csv").exists());
    }

    #[rstest]
    fn missing_binary_is_skipped(workspace: Workspace) {
        let config = TpchConfig {
            dbgen_dir: workspace.config.dbgen_dir.join("missing"),
            scale_factor: 1.0,
        };
        let runner = FakeDbgen::new(SAMPLE_TABLE);

        let outcome = generate_with_runner(&config, &workspace.layout, &runner)
            .expect("missing binary is not an error");

        assert_eq!(
            outcome,
            GenerationOutcome::Skipped {
                reason: MISSING_DBGEN_HINT.to_owned()
            }
        );
        assert!(runner.invocations.borrow().is_empty());
    }

    #[rstest]
    fn failing_dbgen_propagates(workspace: Workspace) {
        let error = generate_with_runner(&workspace.config, &workspace.layout, &FailingDbgen)
            .expect_err("dbgen failure must propagate");
        assert!(matches!(error, DatasetError::DbgenFailed { .. }));
    }

    #[rstest]
    fn stale_table_is_replaced(workspace: Workspace) {
        fs::write(
            workspace.layout.real_dir().join(LINEITEM_TABLE),
            "garbage that would not parse",
        )
        .expect("stale table must be written");
        let runner = FakeDbgen::new(SAMPLE_TABLE);

        let outcome = generate_with_runner(&workspace.config, &workspace.layout, &runner)
            .expect("extraction must succeed");

        assert!(matches!(
            outcome,
            GenerationOutcome::Generated(ref artifact) if artifact.rows == 3
        ));
    }

    #[rstest]
    #[case::short_row("1|2|3|4\n", "missing column")]
    #[case::bad_number("1|2|3|4|x|5|6|7|\n", "invalid number")]
    fn malformed_tables_are_rejected(
        workspace: Workspace,
        #[case] table: &'static str,
        #[case] expected: &str,
    ) {
        let runner = FakeDbgen::new(table);

        let error = generate_with_runner(&workspace.config, &workspace.layout, &runner)
            .expect_err("malformed table must fail");

        assert!(
            error.to_string().contains(expected),
            "unexpected error: {error}"
        );
        assert!(!workspace.layout.real_dir().join("tpc_1.csv").exists());
    }
}
