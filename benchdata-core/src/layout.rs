//! Output directory layout.
//!
//! Every dataset lands under a single data root with one subdirectory for
//! synthetic samples and one for real-world extracts.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::{DatasetError, Result};

/// Data root used when neither a flag nor the environment overrides it.
pub const DEFAULT_DATA_DIR: &str = "./data/";

const DATA_DIR_ENV: &str = "BENCHDATA_DATA_DIR";
const SYNTHETIC_DIR: &str = "synthetic";
const REAL_DIR: &str = "real";

/// Directory tree that receives generated datasets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        let root = env::var_os(DATA_DIR_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        Self { root }
    }
}

impl DataLayout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the data root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding synthetic point clouds.
    #[must_use]
    pub fn synthetic_dir(&self) -> PathBuf {
        self.root.join(SYNTHETIC_DIR)
    }

    /// Directory holding real-world extracts.
    #[must_use]
    pub fn real_dir(&self) -> PathBuf {
        self.root.join(REAL_DIR)
    }

    /// Creates any missing directories of the layout.
    ///
    /// Existing directories are left untouched, so repeated calls are cheap
    /// no-ops.
    ///
    /// # Errors
    /// Returns [`DatasetError::Io`] when a directory cannot be created.
    ///
    /// # Examples
    /// ```
    /// # use benchdata_core::DataLayout;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let dir = tempfile::tempdir()?;
    /// let layout = DataLayout::new(dir.path().join("data"));
    /// layout.ensure()?;
    /// assert!(layout.synthetic_dir().is_dir());
    /// assert!(layout.real_dir().is_dir());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(name = "layout.ensure", err, skip(self), fields(root = %self.root.display()))]
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root.clone(), self.synthetic_dir(), self.real_dir()] {
            if dir.is_dir() {
                continue;
            }
            fs::create_dir_all(&dir).map_err(|source| DatasetError::io(&dir, source))?;
            debug!(path = %dir.display(), "created directory");
        }
        Ok(())
    }
}
