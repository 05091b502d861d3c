//! NYC yellow-taxi pickup locations.
//!
//! Six monthly trip files from the first half of 2016 are downloaded into a
//! local cache, reduced to their pickup longitude and latitude, stripped of
//! incomplete rows and concatenated in month order.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{Span, field, info, instrument};

use crate::artifact::DatasetArtifact;
use crate::download::{CacheStatus, DownloadClient, UreqDownloadClient, ensure_cached};
use crate::error::{DatasetError, Result};
use crate::layout::DataLayout;
use crate::output::CsvSink;

/// Public bucket hosting the trip records.
pub const TAXI_BASE_URL: &str = "https://s3.amazonaws.com/nyc-tlc/trip+data/";
/// Cache directory used when neither a flag nor the environment overrides it.
pub const DEFAULT_DOWNLOAD_DIR: &str = "./.download/";
/// Name of the combined output file.
pub const TAXI_OUTPUT_FILE: &str = "nytaxi.csv";

const DOWNLOAD_DIR_ENV: &str = "BENCHDATA_DOWNLOAD_DIR";
const LONGITUDE_COLUMN: &str = "pickup_longitude";
const LATITUDE_COLUMN: &str = "pickup_latitude";
const FIRST_MONTH: u8 = 1;
const LAST_MONTH: u8 = 6;

/// Download and cache settings for the taxi extract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxiConfig {
    /// Directory where raw monthly files are cached.
    pub download_dir: PathBuf,
    /// URL prefix the monthly file names are appended to.
    pub base_url: String,
}

impl Default for TaxiConfig {
    fn default() -> Self {
        Self {
            download_dir: env::var_os(DOWNLOAD_DIR_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR), PathBuf::from),
            base_url: TAXI_BASE_URL.to_owned(),
        }
    }
}

impl TaxiConfig {
    fn file_url(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.base_url.trim_end_matches('/'))
    }
}

/// Names of the monthly trip files, in concatenation order.
///
/// # Examples
/// ```
/// let names = benchdata_core::taxi::monthly_file_names();
/// assert_eq!(names.len(), 6);
/// assert_eq!(names[0], "yellow_tripdata_2016-01.csv");
/// ```
#[must_use]
pub fn monthly_file_names() -> Vec<String> {
    (FIRST_MONTH..=LAST_MONTH)
        .map(|month| format!("yellow_tripdata_2016-{month:02}.csv"))
        .collect()
}

/// Downloads missing monthly files and writes the combined pickup locations.
///
/// # Errors
/// Returns [`DatasetError`] when a download fails or a file is malformed.
pub fn generate(config: &TaxiConfig, layout: &DataLayout) -> Result<DatasetArtifact> {
    generate_with_client(config, layout, &UreqDownloadClient)
}

/// [`generate`] with an explicit download client.
///
/// # Errors
/// Returns [`DatasetError`] when a download fails or a file is malformed.
#[instrument(
    name = "taxi.generate",
    err,
    skip(config, layout, client),
    fields(download_dir = %config.download_dir.display(), downloaded = field::Empty),
)]
pub fn generate_with_client(
    config: &TaxiConfig,
    layout: &DataLayout,
    client: &dyn DownloadClient,
) -> Result<DatasetArtifact> {
    std::fs::create_dir_all(&config.download_dir)
        .map_err(|source| DatasetError::io(&config.download_dir, source))?;

    let mut cached = Vec::new();
    let mut downloaded = 0_usize;
    for file_name in monthly_file_names() {
        let path = config.download_dir.join(&file_name);
        if let CacheStatus::Downloaded { .. } =
            ensure_cached(&path, &config.file_url(&file_name), client)?
        {
            downloaded = downloaded.saturating_add(1);
        }
        cached.push(path);
    }
    Span::current().record("downloaded", downloaded);

    let mut sink = CsvSink::create(&layout.real_dir().join(TAXI_OUTPUT_FILE))?;
    for path in &cached {
        let kept = append_pickups(path, &mut sink)?;
        info!(path = %path.display(), rows = kept, "month extracted");
    }
    let (path, rows) = sink.finish()?;

    info!(rows, path = %path.display(), "taxi dataset written");
    Ok(DatasetArtifact {
        path,
        rows,
        dimensions: 2,
    })
}

fn append_pickups(path: &Path, sink: &mut CsvSink) -> Result<u64> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| DatasetError::csv(path, source))?;
    let headers = reader
        .headers()
        .map_err(|source| DatasetError::csv(path, source))?
        .clone();
    let longitude = column_index(&headers, LONGITUDE_COLUMN, path)?;
    let latitude = column_index(&headers, LATITUDE_COLUMN, path)?;

    let mut kept = 0_u64;
    for result in reader.records() {
        let record = result.map_err(|source| DatasetError::csv(path, source))?;
        let line = record.position().map_or(0, csv::Position::line);
        let Some(lon) = parse_cell(record.get(longitude), path, line)? else {
            continue;
        };
        let Some(lat) = parse_cell(record.get(latitude), path, line)? else {
            continue;
        };
        sink.write_values(&[lon, lat])?;
        kept = kept.saturating_add(1);
    }
    Ok(kept)
}

fn column_index(headers: &csv::StringRecord, column: &'static str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.trim() == column)
        .ok_or_else(|| DatasetError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })
}

/// Cell spellings treated as missing values, matching the defaults of common
/// dataframe readers.
const MISSING_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// Absent, blank and missing-token cells are missing values; the row is dropped.
fn parse_cell(cell: Option<&str>, path: &Path, line: u64) -> Result<Option<f64>> {
    let Some(raw) = cell
        .map(str::trim)
        .filter(|value| !value.is_empty() && !MISSING_TOKENS.contains(value))
    else {
        return Ok(None);
    };
    let value = raw.parse::<f64>().map_err(|_| DatasetError::InvalidNumber {
        path: path.to_path_buf(),
        line,
        value: raw.to_owned(),
    })?;
    Ok((!value.is_nan()).then_some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::fake::FakeClient;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    const BASE_URL: &str = "https://example.test/trip+data/";
    const HEADER: &str =
        "VendorID,tpep_pickup_datetime,pickup_longitude,pickup_latitude,fare_amount";

    struct Workspace {
        _dir: TempDir,
        layout: DataLayout,
        config: TaxiConfig,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = TempDir::new().expect("temp dir must be created");
        let layout = DataLayout::new(dir.path().join("data"));
        layout.ensure().expect("layout must be created");
        let config = TaxiConfig {
            download_dir: dir.path().join(".download"),
            base_url: BASE_URL.to_owned(),
        };
        Workspace {
            _dir: dir,
            layout,
            config,
        }
    }

    fn month_payload(month: u8) -> Vec<u8> {
        format!(
            "{HEADER}\n\
             2,2016-{month:02}-01 00:00:00,-73.9{month},40.7{month},5.5\n\
             1,2016-{month:02}-01 00:01:00,,40.1,3.0\n\
             1,2016-{month:02}-01 00:02:00,-74.0,,3.0\n"
        )
        .into_bytes()
    }

    fn client_for_all_months(config: &TaxiConfig) -> FakeClient {
        let payloads = monthly_file_names()
            .into_iter()
            .zip(FIRST_MONTH..=LAST_MONTH)
            .map(|(name, month)| (config.file_url(&name), month_payload(month)))
            .collect::<HashMap<_, _>>();
        FakeClient::new(payloads)
    }

    #[rstest]
    fn concatenates_months_and_drops_incomplete_rows(workspace: Workspace) {
        let client = client_for_all_months(&workspace.config);

        let artifact = generate_with_client(&workspace.config, &workspace.layout, &client)
            .expect("extraction must succeed");

        assert_eq!(artifact.rows, 6);
        assert_eq!(artifact.dimensions, 2);
        assert_eq!(artifact.path, workspace.layout.real_dir().join(TAXI_OUTPUT_FILE));
        let text = fs::read_to_string(&artifact.path).expect("output must exist");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"-73.91,40.71"));
        assert_eq!(lines.last(), Some(&"-73.96,40.76"));
    }

    #[rstest]
    fn cached_months_are_not_downloaded_again(workspace: Workspace) {
        let client = client_for_all_months(&workspace.config);
        generate_with_client(&workspace.config, &workspace.layout, &client)
            .expect("first run must succeed");
        assert_eq!(client.calls(), 6);

        generate_with_client(&workspace.config, &workspace.layout, &client)
            .expect("second run must succeed");
        assert_eq!(client.calls(), 6);
    }

    #[rstest]
    fn only_missing_months_are_fetched(workspace: Workspace) {
        fs::create_dir_all(&workspace.config.download_dir).expect("cache dir must be created");
        fs::write(
            workspace.config.download_dir.join("yellow_tripdata_2016-03.csv"),
            month_payload(3),
        )
        .expect("cached month must be written");
        let client = client_for_all_months(&workspace.config);

        generate_with_client(&workspace.config, &workspace.layout, &client)
            .expect("extraction must succeed");

        let requested = client.requested();
        assert_eq!(requested.len(), 5);
        assert!(requested.iter().all(|url| !url.ends_with("2016-03.csv")));
        assert!(requested.iter().all(|url| url.starts_with(BASE_URL)));
    }

    #[rstest]
    fn missing_column_is_reported(workspace: Workspace) {
        let mut payloads = HashMap::new();
        for name in monthly_file_names() {
            payloads.insert(
                workspace.config.file_url(&name),
                b"VendorID,pickup_latitude\n1,40.0\n".to_vec(),
            );
        }
        let client = FakeClient::new(payloads);

        let error = generate_with_client(&workspace.config, &workspace.layout, &client)
            .expect_err("missing longitude must fail");

        assert!(matches!(
            error,
            DatasetError::MissingColumn { column: LONGITUDE_COLUMN, .. }
        ));
        assert!(!workspace.layout.real_dir().join(TAXI_OUTPUT_FILE).exists());
    }

    #[rstest]
    fn non_numeric_cells_are_rejected(workspace: Workspace) {
        let mut payloads = HashMap::new();
        for name in monthly_file_names() {
            payloads.insert(
                workspace.config.file_url(&name),
                format!("{HEADER}\n1,2016-01-01 00:00:00,west,40.0,1.0\n").into_bytes(),
            );
        }
        let client = FakeClient::new(payloads);

        let error = generate_with_client(&workspace.config, &workspace.layout, &client)
            .expect_err("non-numeric longitude must fail");

        let DatasetError::InvalidNumber { value, line, .. } = error else {
            panic!("expected InvalidNumber, got {error:?}");
        };
        assert_eq!(value, "west");
        assert_eq!(line, 2);
    }

    #[rstest]
    #[case::na("NA")]
    #[case::null("NULL")]
    #[case::nan("NaN")]
    #[case::slash("N/A")]
    #[case::pandas_na("<NA>")]
    fn missing_value_tokens_drop_the_row(workspace: Workspace, #[case] token: &str) {
        let mut payloads = HashMap::new();
        for name in monthly_file_names() {
            payloads.insert(
                workspace.config.file_url(&name),
                format!(
                    "{HEADER}
                     1,2016-01-01 00:00:00,{token},40.0,1.0
                     1,2016-01-01 00:01:00,-73.5,{token},1.0
                     2,2016-01-01 00:02:00,-73.9,40.7,2.0
"
                )
                .into_bytes(),
            );
        }
        let client = FakeClient::new(payloads);

        let artifact = generate_with_client(&workspace.config, &workspace.layout, &client)
            .expect("missing-value tokens must not fail extraction");

        assert_eq!(artifact.rows, 6);
        let text = fs::read_to_string(&artifact.path).expect("output must exist");
        assert!(text.lines().all(|line| line == "-73.9,40.7"));
    }

    #[rstest]
    #[case("https://host/trip+data/", "https://host/trip+data/a.csv")]
    #[case("https://host/trip+data", "https://host/trip+data/a.csv")]
    fn file_urls_join_cleanly(#[case] base_url: &str, #[case] expected: &str) {
        let config = TaxiConfig {
            download_dir: PathBuf::from("cache"),
            base_url: base_url.to_owned(),
        };
        assert_eq!(config.file_url("a.csv"), expected);
    }
}
