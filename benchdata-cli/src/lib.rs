//! Support library for the benchdata CLI binary.
//!
//! Exposes the command pipeline and logging setup so doctests and unit tests
//! can drive them without forking a subprocess.

pub mod cli;
pub mod logging;
