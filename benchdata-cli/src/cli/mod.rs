//! Command-line interface orchestration for the benchdata generators.
//!
//! Without a subcommand the CLI generates one dataset selected by `--dist` or
//! `--real`; `convert` turns a delimited point file into flat binary and
//! `gen-data` samples a synthetic dataset directly into that binary format.

mod commands;

pub use commands::{
    Backends, Cli, CliError, Command, CommandOutcome, ConvertArgs, DISTRIBUTION_HINT, DatasetArgs,
    GenDataArgs, OSM_UNAVAILABLE, REAL_DATASET_HINT, SCALE_HINT, SYNTHETIC_ARGS_HINT, Settings,
    USAGE_HINT, render_summary, run_cli, run_cli_with,
};

#[cfg(test)]
mod test_helpers;
