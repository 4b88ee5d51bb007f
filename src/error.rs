//! Error types for Cogwatch

use thiserror::Error;

/// Errors that can occur while loading data or computing a dashboard view
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid numeric value {value:?} in column {column:?} (data row {row})")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Invalid summary date {value:?} (data row {row}), expected YYYY-MM-DD")]
    InvalidDate { row: usize, value: String },

    #[error("Invalid date selector {0:?}, expected \"전체\", \"all\" or YYYY-MM-DD")]
    InvalidDateFilter(String),

    #[error("No file has been uploaded")]
    NoFile,

    #[error("Uploaded file contains no data rows")]
    EmptyTable,

    #[error("No records for identity: {0}")]
    UnknownIdentity(String),

    #[error("Model input has {actual} features per step, expected {expected}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Classifier invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Classifier returned invalid output: {0}")]
    ModelOutput(String),
}
