//! Merge/display adapter.
//!
//! Attaches probe results to their records by position, then narrows the
//! merged table with a [`FilterSelection`]. Row order is never changed.

use crate::error::{Result, SensorError};
use crate::probe::ProbeStatus;
use crate::record::{SensorRecord, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::error;

/// Status label for rows that have not been probed yet
pub const UNKNOWN_STATUS: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRow {
    pub record: SensorRecord,
    /// None until the first probe cycle has run
    pub status: Option<ProbeStatus>,
}

impl MergedRow {
    pub fn status_label(&self) -> &'static str {
        self.status.map(|s| s.as_str()).unwrap_or(UNKNOWN_STATUS)
    }
}

/// Source table annotated with a status column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedTable {
    pub columns: Vec<String>,
    pub status_column: String,
    pub rows: Vec<MergedRow>,
}

/// Counts per status, for the dashboard header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub good: usize,
    pub bad: usize,
    pub no_link: usize,
    pub unknown: usize,
}

/// `merged[i] = records[i] + results[i]`.
///
/// `results == None` means no cycle has run and every row is Unknown. A length
/// mismatch is a hard failure.
pub fn merge(table: &Table, results: Option<&[ProbeStatus]>, status_column: &str) -> Result<MergedTable> {
    if let Some(results) = results {
        if results.len() != table.records.len() {
            error!(
                "Refusing to merge: table has {} rows but probe returned {} results",
                table.records.len(),
                results.len()
            );
            return Err(SensorError::ShapeMismatch {
                records: table.records.len(),
                results: results.len(),
            });
        }
    }

    let mut columns = table.columns.clone();
    if !columns.iter().any(|c| c == status_column) {
        columns.push(status_column.to_string());
    }

    let rows = table
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| MergedRow {
            record: record.clone(),
            status: results.map(|r| r[i]),
        })
        .collect();

    Ok(MergedTable {
        columns,
        status_column: status_column.to_string(),
        rows,
    })
}

impl MergedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Value shown for `column` in `row`. The status column always comes from
    /// the probe, shadowing any same-named source column. Missing cells read
    /// as empty.
    pub fn value<'a>(&self, row: &'a MergedRow, column: &str) -> &'a str {
        if column == self.status_column {
            row.status_label()
        } else {
            row.record.get(column).unwrap_or("")
        }
    }

    /// Row cells in column order
    pub fn cells(&self, row: &MergedRow) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| self.value(row, c).to_string())
            .collect()
    }

    /// Distinct values of a column in first-seen order. Empty if the column
    /// is absent.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        if !self.has_column(column) {
            return Vec::new();
        }
        let mut seen = BTreeSet::new();
        let mut values = Vec::new();
        for row in &self.rows {
            let v = self.value(row, column);
            if seen.insert(v) {
                values.push(v.to_string());
            }
        }
        values
    }

    /// Rows accepted by `selection`, in original order
    pub fn filter(&self, selection: &FilterSelection) -> MergedTable {
        MergedTable {
            columns: self.columns.clone(),
            status_column: self.status_column.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| selection.accepts(self, row))
                .cloned()
                .collect(),
        }
    }

    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary {
            total: self.rows.len(),
            ..Default::default()
        };
        for row in &self.rows {
            match row.status {
                Some(ProbeStatus::Good) => summary.good += 1,
                Some(ProbeStatus::Bad) => summary.bad += 1,
                Some(ProbeStatus::NoLink) => summary.no_link += 1,
                None => summary.unknown += 1,
            }
        }
        summary
    }
}

/// Accepted values per filterable column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSelection {
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSelection {
    /// No constraints at all
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept every value observed in `table` for each listed column that
    /// the table actually has.
    pub fn observed<S: AsRef<str>>(table: &MergedTable, columns: &[S]) -> Self {
        let mut selection = Self::new();
        for column in columns {
            let column = column.as_ref();
            if table.has_column(column) {
                selection.set(column, table.distinct_values(column));
            }
        }
        selection
    }

    pub fn accept<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.set(column, values);
        self
    }

    pub fn set<I, V>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.columns
            .insert(column.to_string(), values.into_iter().map(Into::into).collect());
    }

    pub fn get(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// A row passes when every selected column that exists in the table holds
    /// an accepted value. Columns the table lacks do not constrain.
    pub fn accepts(&self, table: &MergedTable, row: &MergedRow) -> bool {
        self.columns.iter().all(|(column, accepted)| {
            !table.has_column(column) || accepted.contains(table.value(row, column))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "getStatusAPI";

    fn table(rows: &[(&str, &str)]) -> Table {
        let records = rows
            .iter()
            .map(|(name, floor)| {
                SensorRecord::from_fields(
                    [("Position Name", *name), ("Floor", *floor), ("apiUrl", "")],
                    "apiUrl",
                )
            })
            .collect();
        Table::new(
            vec!["Position Name".into(), "Floor".into(), "apiUrl".into()],
            records,
        )
    }

    fn five_rows() -> (Table, Vec<ProbeStatus>) {
        use ProbeStatus::*;
        let t = table(&[("A", "1"), ("B", "1"), ("C", "2"), ("D", "2"), ("E", "3")]);
        (t, vec![Good, Bad, Good, Bad, Good])
    }

    fn names(table: &MergedTable) -> Vec<&str> {
        table
            .rows
            .iter()
            .map(|r| r.record.get("Position Name").unwrap())
            .collect()
    }

    #[test]
    fn test_merge_attaches_by_position() {
        let (t, results) = five_rows();
        let merged = merge(&t, Some(&results), STATUS).unwrap();

        assert_eq!(merged.len(), 5);
        assert_eq!(merged.columns.last().map(String::as_str), Some(STATUS));
        for (row, expected) in merged.rows.iter().zip(&results) {
            assert_eq!(row.status, Some(*expected));
        }
        assert_eq!(merged.value(&merged.rows[1], STATUS), "Bad");
    }

    #[test]
    fn test_merge_without_results_is_unknown() {
        let (t, _) = five_rows();
        let merged = merge(&t, None, STATUS).unwrap();
        assert!(merged.rows.iter().all(|r| r.status_label() == UNKNOWN_STATUS));
        assert_eq!(merged.summary().unknown, 5);
    }

    #[test]
    fn test_merge_shape_mismatch() {
        let (t, mut results) = five_rows();
        results.pop();
        let err = merge(&t, Some(&results), STATUS).unwrap_err();
        assert!(matches!(err, SensorError::ShapeMismatch { records: 5, results: 4 }));
    }

    #[test]
    fn test_status_column_shadows_source_value() {
        let t = Table::new(
            vec!["Name".into(), STATUS.into()],
            vec![SensorRecord::from_fields([("Name", "x"), (STATUS, "Good")], "apiUrl")],
        );
        let merged = merge(&t, Some(&[ProbeStatus::Bad]), STATUS).unwrap();
        assert_eq!(merged.columns, vec!["Name".to_string(), STATUS.to_string()]);
        assert_eq!(merged.cells(&merged.rows[0]), vec!["x", "Bad"]);
    }

    #[test]
    fn test_observed_selection_is_identity() {
        let (t, results) = five_rows();
        let merged = merge(&t, Some(&results), STATUS).unwrap();
        let selection = FilterSelection::observed(&merged, &[STATUS, "Floor", "Zone"]);

        assert!(selection.get("Zone").is_none());
        assert_eq!(merged.filter(&selection), merged);
    }

    #[test]
    fn test_filter_status_good() {
        let (t, results) = five_rows();
        let merged = merge(&t, Some(&results), STATUS).unwrap();
        let selection = FilterSelection::new().accept(STATUS, ["Good"]);

        let filtered = merged.filter(&selection);
        assert_eq!(names(&filtered), vec!["A", "C", "E"]);
        assert_eq!(filtered.summary().good, 3);
    }

    #[test]
    fn test_filter_intersects_columns() {
        let (t, results) = five_rows();
        let merged = merge(&t, Some(&results), STATUS).unwrap();
        let selection = FilterSelection::new()
            .accept(STATUS, ["Good"])
            .accept("Floor", ["1", "3"]);

        assert_eq!(names(&merged.filter(&selection)), vec!["A", "E"]);
    }

    #[test]
    fn test_filter_absent_column_passes() {
        let (t, results) = five_rows();
        let merged = merge(&t, Some(&results), STATUS).unwrap();
        let selection = FilterSelection::new().accept("Zone", ["North"]);
        assert_eq!(merged.filter(&selection).len(), 5);
    }

    #[test]
    fn test_filter_empty_set_rejects_all() {
        let (t, results) = five_rows();
        let merged = merge(&t, Some(&results), STATUS).unwrap();
        let selection = FilterSelection::new().accept(STATUS, Vec::<String>::new());
        assert!(merged.filter(&selection).is_empty());
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let (t, results) = five_rows();
        let merged = merge(&t, Some(&results), STATUS).unwrap();
        assert_eq!(merged.distinct_values("Floor"), vec!["1", "2", "3"]);
        assert_eq!(merged.distinct_values(STATUS), vec!["Good", "Bad"]);
        assert!(merged.distinct_values("Zone").is_empty());
    }

    #[test]
    fn test_summary_counts() {
        use ProbeStatus::*;
        let t = table(&[("A", "1"), ("B", "1"), ("C", "2")]);
        let merged = merge(&t, Some(&[Good, NoLink, Bad]), STATUS).unwrap();
        assert_eq!(
            merged.summary(),
            StatusSummary { total: 3, good: 1, bad: 1, no_link: 1, unknown: 0 }
        );
    }
}
