//! Spreadsheet sources.
//!
//! Published sheets arrive as CSV, either over HTTP or from a local file.
//! Rows with more fields than the header are skipped, short rows are padded
//! with empty cells. A source that cannot be reached loads as an empty table.

use crate::error::{Result, SensorError};
use crate::record::{SensorRecord, Table};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a table comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Remote(String),
    File(PathBuf),
}

impl TableSource {
    /// `http(s)://` strings are remote, anything else is a local path.
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if crate::probe::is_probe_target(trimmed) {
            TableSource::Remote(trimmed.to_string())
        } else {
            TableSource::File(PathBuf::from(trimmed))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TableSource::Remote(url) => url.clone(),
            TableSource::File(path) => path.display().to_string(),
        }
    }
}

/// Header plus well-formed rows of a CSV document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse CSV text. Fails only when the header row itself is unreadable.
pub fn parse_csv(text: &str) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = normalize_headers(reader.headers()?.iter());
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping unreadable row {}: {}", line + 2, e);
                skipped += 1;
                continue;
            }
        };
        if record.len() > headers.len() {
            debug!(
                "Skipping row {}: {} fields, expected {}",
                line + 2,
                record.len(),
                headers.len()
            );
            skipped += 1;
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows", skipped);
    }

    Ok(RawSheet { headers, rows })
}

/// Blank headers become `Unnamed: <i>`, repeats get `.1`, `.2`, ...
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h.trim().to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Build a sensor table from CSV text
pub fn parse_table(text: &str, url_column: &str) -> Result<Table> {
    let sheet = parse_csv(text)?;
    let records = sheet
        .rows
        .iter()
        .map(|row| {
            let fields = sheet.headers.iter().cloned().zip(row.iter().cloned());
            SensorRecord::from_fields(fields, url_column)
        })
        .collect();
    Ok(Table::new(sheet.headers, records))
}

/// Fetches sheet exports
#[derive(Clone)]
pub struct SheetClient {
    http: reqwest::Client,
}

impl SheetClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sensorboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SensorError::Source(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Raw document text
    pub async fn fetch_text(&self, source: &TableSource) -> Result<String> {
        match source {
            TableSource::Remote(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| SensorError::Source(format!("{}: {}", url, e)))?;
                if !response.status().is_success() {
                    return Err(SensorError::Source(format!(
                        "{} returned {}",
                        url,
                        response.status()
                    )));
                }
                response
                    .text()
                    .await
                    .map_err(|e| SensorError::Source(format!("{}: {}", url, e)))
            }
            TableSource::File(path) => Ok(tokio::fs::read_to_string(path).await?),
        }
    }

    /// Load a sensor table. Any failure degrades to an empty table.
    pub async fn load_table(&self, source: &TableSource, url_column: &str) -> Table {
        let loaded = match self.fetch_text(source).await {
            Ok(text) => parse_table(&text, url_column),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(table) => {
                info!("Loaded {} rows from {}", table.len(), source.describe());
                table
            }
            Err(e) => {
                warn!("Table source {} unavailable: {}", source.describe(), e);
                Table::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            TableSource::parse("https://docs.example.com/pub?output=csv"),
            TableSource::Remote("https://docs.example.com/pub?output=csv".into())
        );
        assert_eq!(
            TableSource::parse("./data/sensors.csv"),
            TableSource::File(PathBuf::from("./data/sensors.csv"))
        );
    }

    #[test]
    fn test_parse_table_skips_long_rows_and_pads_short() {
        let csv = "Position Name,Floor,apiUrl\n\
                   AHU-01,1,http://a/status\n\
                   AHU-02,1,http://b/status,extra\n\
                   AHU-03,2\n";
        let table = parse_table(csv, "apiUrl").unwrap();

        assert_eq!(table.columns, vec!["Position Name", "Floor", "apiUrl"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].api_url(), Some("http://a/status"));
        assert_eq!(table.records[1].get("Position Name"), Some("AHU-03"));
        assert_eq!(table.records[1].get("apiUrl"), Some(""));
        assert_eq!(table.records[1].api_url(), None);
    }

    #[test]
    fn test_headers_normalized() {
        let sheet = parse_csv("Name,,Name\nx,y,z\n").unwrap();
        assert_eq!(sheet.headers, vec!["Name", "Unnamed: 1", "Name.1"]);
        assert_eq!(sheet.rows, vec![vec!["x", "y", "z"]]);
    }

    #[test]
    fn test_header_only() {
        let table = parse_table("a,b\n", "apiUrl").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let client = SheetClient::new(Duration::from_secs(1)).unwrap();
        let source = TableSource::File(PathBuf::from("/nonexistent/sensors.csv"));
        let table = client.load_table(&source, "apiUrl").await;
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }

    #[tokio::test]
    async fn test_file_source_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors.csv");
        std::fs::write(&path, "Position Name,apiUrl\nCHW-01,http://x/api\n").unwrap();

        let client = SheetClient::new(Duration::from_secs(1)).unwrap();
        let table = client.load_table(&TableSource::File(path), "apiUrl").await;
        assert_eq!(table.len(), 1);
        assert_eq!(table.probe_targets(), vec!["http://x/api"]);
    }
}
