//! Download-and-cache helper for remote datasets.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{info, instrument};

use crate::error::{DatasetError, Result};
use crate::output::StagedFile;

/// Download client abstraction so tests can avoid the network.
pub trait DownloadClient {
    /// Streams the contents of `url` into `sink`, returning the byte count.
    ///
    /// # Errors
    /// Returns [`DatasetError::Download`] if the request or transfer fails.
    fn download_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Production client backed by `ureq`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UreqDownloadClient;

impl DownloadClient for UreqDownloadClient {
    fn download_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let failed = |message: String| DatasetError::Download {
            url: url.to_owned(),
            message,
        };
        let response = ureq::get(url)
            .call()
            .map_err(|error| failed(error.to_string()))?;
        let mut reader = response.into_body().into_reader();
        io::copy(&mut reader, sink).map_err(|error| failed(error.to_string()))
    }
}

/// Whether [`ensure_cached`] had to fetch the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    /// The file was already present.
    Hit,
    /// The file was fetched.
    Downloaded {
        /// Number of bytes written.
        bytes: u64,
    },
}

/// Ensures `path` exists, downloading it from `url` when absent.
///
/// Payloads are streamed into `<path>.part` and renamed once complete, so a
/// partial transfer is never treated as a cache hit.
///
/// # Errors
/// Returns [`DatasetError`] when the download or any file operation fails.
#[instrument(name = "download.ensure_cached", err, skip(client), fields(path = %path.display()))]
pub fn ensure_cached(path: &Path, url: &str, client: &dyn DownloadClient) -> Result<CacheStatus> {
    if path.is_file() {
        return Ok(CacheStatus::Hit);
    }

    let staged = StagedFile::new(path);
    let mut writer = BufWriter::new(staged.create()?);
    let bytes = client.download_to(url, &mut writer)?;
    writer
        .flush()
        .map_err(|source| DatasetError::io(staged.staging_path(), source))?;
    drop(writer);
    staged.commit()?;

    info!(bytes, "download completed");
    Ok(CacheStatus::Downloaded { bytes })
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory [`DownloadClient`] used by unit tests.

    use super::{DownloadClient, Result};
    use crate::error::DatasetError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Write;

    pub(crate) struct FakeClient {
        payloads: HashMap<String, Vec<u8>>,
        requested: RefCell<Vec<String>>,
    }

    impl FakeClient {
        pub(crate) fn new(payloads: HashMap<String, Vec<u8>>) -> Self {
            Self {
                payloads,
                requested: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.requested.borrow().len()
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requested.borrow().clone()
        }
    }

    impl DownloadClient for FakeClient {
        fn download_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
            self.requested.borrow_mut().push(url.to_owned());
            let payload = self
                .payloads
                .get(url)
                .ok_or_else(|| DatasetError::Download {
                    url: url.to_owned(),
                    message: "missing fake payload".to_owned(),
                })?;
            sink.write_all(payload)
                .map_err(|error| DatasetError::Download {
                    url: url.to_owned(),
                    message: error.to_string(),
                })?;
            Ok(u64::try_from(payload.len()).unwrap_or(u64::MAX))
        }
    }
}
