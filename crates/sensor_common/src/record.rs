//! Rows and tables loaded from the spreadsheet sources.
//!
//! Columns are whatever the sheet carries. Nothing here assumes a column
//! exists; every lookup goes through [`Table::has_column`] or returns `Option`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the source table. Identity is its position in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    fields: BTreeMap<String, String>,
    /// Probe target from the URL column, if the row has one
    #[serde(skip_serializing_if = "Option::is_none")]
    api_url: Option<String>,
}

impl SensorRecord {
    /// Build a record from column/value pairs. `url_column` names the column
    /// holding the probe target; blank values count as absent.
    pub fn from_fields<I, K, V>(fields: I, url_column: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let api_url = fields
            .get(url_column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self { fields, api_url }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn has(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// Ordered columns plus ordered records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub records: Vec<SensorRecord>,
}

impl Table {
    pub fn new(columns: Vec<String>, records: Vec<SensorRecord>) -> Self {
        Self { columns, records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Probe targets in row order. Rows without a URL yield an empty string,
    /// which the prober classifies as NoLink.
    pub fn probe_targets(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.api_url().unwrap_or_default().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_extraction() {
        let rec = SensorRecord::from_fields(
            [("Position Name", "AHU-01"), ("apiUrl", "  http://10.0.0.5/status ")],
            "apiUrl",
        );
        assert_eq!(rec.api_url(), Some("http://10.0.0.5/status"));
        assert_eq!(rec.get("Position Name"), Some("AHU-01"));
        assert!(rec.has("apiUrl"));
        assert_eq!(rec.get("Floor"), None);
    }

    #[test]
    fn test_blank_url_is_absent() {
        let rec = SensorRecord::from_fields([("apiUrl", "   ")], "apiUrl");
        assert_eq!(rec.api_url(), None);

        let rec = SensorRecord::from_fields([("Name", "x")], "apiUrl");
        assert_eq!(rec.api_url(), None);
    }

    #[test]
    fn test_probe_targets_keep_positions() {
        let table = Table::new(
            vec!["apiUrl".to_string()],
            vec![
                SensorRecord::from_fields([("apiUrl", "http://a")], "apiUrl"),
                SensorRecord::from_fields([("apiUrl", "")], "apiUrl"),
                SensorRecord::from_fields([("apiUrl", "http://c")], "apiUrl"),
            ],
        );
        assert_eq!(table.probe_targets(), vec!["http://a", "", "http://c"]);
        assert!(table.has_column("apiUrl"));
        assert!(!table.has_column("Floor"));
    }
}
