//! Benchmark dataset generators.
//!
//! Produces the point files consumed by the spatial index benchmarks:
//! seeded synthetic samples, TPC-H `lineitem` extracts, NYC taxi pickup
//! locations, and flat binary conversions of any of them. Every generator
//! writes a header-less comma-delimited file beneath a [`DataLayout`].

mod artifact;
pub mod convert;
pub mod download;
mod error;
mod layout;
mod output;
pub mod synthetic;
pub mod taxi;
pub mod tpch;

pub use crate::{
    artifact::{DatasetArtifact, GenerationOutcome},
    error::{DatasetError, DatasetErrorCode, Result},
    layout::{DEFAULT_DATA_DIR, DataLayout},
    synthetic::{DEFAULT_SEED, Distribution, SyntheticConfig},
};
