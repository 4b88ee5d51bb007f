//! In-memory record table loaded from a wellness CSV export.
//!
//! The export is comma-separated with a header row. Two columns are keys
//! (identity and summary date); every other column is a numeric daily metric.
//! Parsing is strict: a malformed cell surfaces as an error to the caller,
//! there is no imputation and no recovery.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::columns;
use crate::error::DashboardError;

/// Date restriction applied when filtering a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Aggregate over every date the identity has records for.
    All,
    /// Restrict to a single summary date.
    On(NaiveDate),
}

impl DateFilter {
    /// Parse a selector value. Accepts the Korean "all" sentinel used by the
    /// export locale, the English spelling, or a `YYYY-MM-DD` date.
    pub fn parse(value: &str) -> Result<Self, DashboardError> {
        let trimmed = value.trim();
        if trimmed == columns::DATE_ALL || trimmed.eq_ignore_ascii_case("all") {
            return Ok(DateFilter::All);
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(DateFilter::On)
            .map_err(|_| DashboardError::InvalidDateFilter(trimmed.to_string()))
    }

    /// Selector label for this filter, matching the export locale.
    pub fn as_label(&self) -> String {
        match self {
            DateFilter::All => columns::DATE_ALL.to_string(),
            DateFilter::On(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// One daily summary row: who, when, and the metric values in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub identity: String,
    pub date: NaiveDate,
    /// Metric values, parallel to [`RecordTable::metric_columns`].
    pub metrics: Vec<f64>,
}

/// Parsed table of daily wellness records.
#[derive(Debug, Clone)]
pub struct RecordTable {
    metric_columns: Vec<String>,
    rows: Vec<Record>,
}

impl RecordTable {
    /// Load a table from a CSV file on disk.
    pub fn from_path(path: &Path) -> Result<Self, DashboardError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a table from any CSV byte stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DashboardError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let identity_idx = headers
            .iter()
            .position(|name| name == columns::IDENTITY)
            .ok_or_else(|| DashboardError::MissingColumn(columns::IDENTITY.to_string()))?;
        let date_idx = headers
            .iter()
            .position(|name| name == columns::SUMMARY_DATE)
            .ok_or_else(|| DashboardError::MissingColumn(columns::SUMMARY_DATE.to_string()))?;

        // Every non-key header is a metric column, kept in file order.
        let mut metric_columns = Vec::new();
        let mut metric_indices = Vec::new();
        for (idx, name) in headers.iter().enumerate() {
            if idx != identity_idx && idx != date_idx {
                metric_columns.push(name.to_string());
                metric_indices.push(idx);
            }
        }

        let mut rows = Vec::new();
        for (row_num, result) in csv_reader.records().enumerate() {
            let record = result?;
            let row = row_num + 1;

            let identity = record
                .get(identity_idx)
                .unwrap_or_default()
                .trim()
                .to_string();
            let date_value = record.get(date_idx).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_value, "%Y-%m-%d").map_err(|_| {
                DashboardError::InvalidDate {
                    row,
                    value: date_value.to_string(),
                }
            })?;

            let mut metrics = Vec::with_capacity(metric_indices.len());
            for (&idx, column) in metric_indices.iter().zip(&metric_columns) {
                let value = record.get(idx).unwrap_or_default().trim();
                let parsed = value.parse::<f64>().map_err(|_| {
                    DashboardError::InvalidNumber {
                        row,
                        column: column.clone(),
                        value: value.to_string(),
                    }
                })?;
                metrics.push(parsed);
            }

            rows.push(Record {
                identity,
                date,
                metrics,
            });
        }

        if rows.is_empty() {
            return Err(DashboardError::EmptyTable);
        }

        debug!(
            rows = rows.len(),
            metric_columns = metric_columns.len(),
            "record table loaded"
        );

        Ok(Self {
            metric_columns,
            rows,
        })
    }

    /// Metric column names, in file order (key columns excluded).
    pub fn metric_columns(&self) -> &[String] {
        &self.metric_columns
    }

    /// Full column list for tabular display: keys first, then metrics.
    pub fn display_columns(&self) -> Vec<String> {
        let mut all = vec![
            columns::IDENTITY.to_string(),
            columns::SUMMARY_DATE.to_string(),
        ];
        all.extend(self.metric_columns.iter().cloned());
        all
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct identities, in first-appearance order.
    pub fn identities(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.identity.as_str()) {
                seen.push(row.identity.as_str());
            }
        }
        seen
    }

    /// Distinct summary dates across the whole table, in first-appearance order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.date) {
                seen.push(row.date);
            }
        }
        seen
    }

    /// All rows for one identity, in file order.
    pub fn rows_for(&self, identity: &str) -> Vec<&Record> {
        self.rows
            .iter()
            .filter(|row| row.identity == identity)
            .collect()
    }

    /// Position of a metric column by name.
    pub fn metric_index(&self, column: &str) -> Result<usize, DashboardError> {
        self.metric_columns
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| DashboardError::UnknownColumn(column.to_string()))
    }

    /// Rows for one identity restricted by date. An empty result is not an
    /// error: downstream aggregation renders blanks for it.
    pub fn filter(&self, identity: &str, date: DateFilter) -> TableSlice<'_> {
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                row.identity == identity
                    && match date {
                        DateFilter::All => true,
                        DateFilter::On(day) => row.date == day,
                    }
            })
            .collect();
        TableSlice { table: self, rows }
    }
}

/// A filtered view over a [`RecordTable`], borrowing the matching rows.
#[derive(Debug)]
pub struct TableSlice<'a> {
    table: &'a RecordTable,
    rows: Vec<&'a Record>,
}

impl<'a> TableSlice<'a> {
    pub fn rows(&self) -> &[&'a Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Arithmetic mean of one metric column over this slice.
    ///
    /// Returns `Ok(None)` when the slice is empty; a column the table does
    /// not carry is an error.
    pub fn mean(&self, column: &str) -> Result<Option<f64>, DashboardError> {
        let idx = self.table.metric_index(column)?;
        if self.rows.is_empty() {
            return Ok(None);
        }
        let sum: f64 = self.rows.iter().map(|row| row.metrics[idx]).sum();
        Ok(Some(sum / self.rows.len() as f64))
    }
}
