//! Error types for the benchdata core library.
//!
//! Defines the error enum shared by every generator together with stable
//! machine-readable codes and a convenient result alias.

use std::{fmt, path::PathBuf};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Errors raised while generating, downloading, or converting datasets.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A binary point file was read with a zero row width.
    #[error("dimension count must be greater than zero")]
    ZeroDimensions,
    /// The requested `point_count * dimensions` overflowed `usize`.
    #[error("point_count * dimensions overflows usize")]
    Overflow,
    /// The scale parameter is not valid for the chosen distribution.
    #[error("invalid scale {scale} for the {distribution} distribution")]
    InvalidScale {
        /// Distribution name.
        distribution: &'static str,
        /// Scale supplied by the caller.
        scale: f64,
    },
    /// Reading or writing a dataset file failed.
    #[error("I/O failure on `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: std::io::Error,
    },
    /// A dataset download failed.
    #[error("dataset download failed for `{url}`: {message}")]
    Download {
        /// URL that failed.
        url: String,
        /// Human-readable failure message.
        message: String,
    },
    /// The TPC-H generator exited unsuccessfully.
    #[error("dbgen exited unsuccessfully ({status})")]
    DbgenFailed {
        /// Exit status reported by the child process.
        status: String,
    },
    /// A generated table could not be parsed.
    #[error("malformed table `{path}` at line {line}: {message}")]
    MalformedTable {
        /// Table path.
        path: PathBuf,
        /// One-based line number.
        line: u64,
        /// Human-readable validation failure.
        message: String,
    },
    /// A required column was absent from a CSV header.
    #[error("column `{column}` not found in `{path}`")]
    MissingColumn {
        /// File whose header lacked the column.
        path: PathBuf,
        /// Name of the missing column.
        column: &'static str,
    },
    /// A cell could not be parsed as a number.
    #[error("invalid number `{value}` in `{path}` at line {line}")]
    InvalidNumber {
        /// File containing the cell.
        path: PathBuf,
        /// One-based line number.
        line: u64,
        /// Raw cell contents.
        value: String,
    },
    /// A row did not have the expected number of values.
    #[error("row {row} has {actual} values but expected {expected}")]
    DimensionMismatch {
        /// One-based row number.
        row: u64,
        /// Expected number of values.
        expected: usize,
        /// Number of values found.
        actual: usize,
    },
    /// The total row count did not match the caller's expectation.
    #[error("expected {expected} rows but found {actual}")]
    RowCountMismatch {
        /// Expected number of rows.
        expected: u64,
        /// Number of rows found.
        actual: u64,
    },
    /// The CSV reader or writer failed.
    #[error("CSV failure on `{path}`: {source}")]
    Csv {
        /// File being read or written.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

define_error_codes! {
    /// Stable codes describing [`DatasetError`] variants.
    enum DatasetErrorCode for DatasetError {
        /// A zero row width was requested.
        ZeroDimensions => ZeroDimensions => "DATASET_ZERO_DIMENSIONS",
        /// The requested shape overflowed.
        Overflow => Overflow => "DATASET_OVERFLOW",
        /// The scale parameter was invalid.
        InvalidScale => InvalidScale { .. } => "DATASET_INVALID_SCALE",
        /// File I/O failed.
        Io => Io { .. } => "DATASET_IO",
        /// A download failed.
        Download => Download { .. } => "DATASET_DOWNLOAD",
        /// The TPC-H generator failed.
        DbgenFailed => DbgenFailed { .. } => "DATASET_DBGEN_FAILED",
        /// A generated table was malformed.
        MalformedTable => MalformedTable { .. } => "DATASET_MALFORMED_TABLE",
        /// A required column was missing.
        MissingColumn => MissingColumn { .. } => "DATASET_MISSING_COLUMN",
        /// A cell was not numeric.
        InvalidNumber => InvalidNumber { .. } => "DATASET_INVALID_NUMBER",
        /// A row had the wrong width.
        DimensionMismatch => DimensionMismatch { .. } => "DATASET_DIMENSION_MISMATCH",
        /// The row count was unexpected.
        RowCountMismatch => RowCountMismatch { .. } => "DATASET_ROW_COUNT_MISMATCH",
        /// The CSV layer failed.
        Csv => Csv { .. } => "DATASET_CSV",
    }
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, DatasetError>;
