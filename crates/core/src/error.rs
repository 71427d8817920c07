//! Error taxonomy for the ingestion pipelines.
//!
//! Parsers return these for every expected failure mode; they never panic on
//! bad input. Aggregation has no error channel at all: absent columns and
//! absent year pairs degrade to zero-valued contributions by construction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Wrong file extension; rejected before any read is attempted.
    #[error("unsupported file type '{extension}': expected {expected}")]
    UnsupportedFormat {
        extension: String,
        expected: &'static str,
    },

    /// Underlying file I/O failure, reported with the OS message.
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    /// Malformed rows; every row error is listed, no partial record set is
    /// returned.
    #[error("CSV parsing errors: {}", .0.join(", "))]
    RowErrors(Vec<String>),

    /// Required columns absent from the first record.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Two distinct raw headers normalized to the same key. Silent
    /// last-write-wins would drop a column nondeterministically, so this is
    /// surfaced as a schema failure instead.
    #[error("duplicate columns after normalization: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),

    /// Workbook-level failure from the spreadsheet reader.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = IngestError::MissingColumns(vec!["area".into(), "segmen".into()]);
        assert_eq!(err.to_string(), "missing required columns: area, segmen");
    }

    #[test]
    fn test_row_errors_message_lists_all_rows() {
        let err = IngestError::RowErrors(vec!["line 2: bad quote".into(), "line 5: bad utf8".into()]);
        let msg = err.to_string();
        assert!(msg.contains("line 2: bad quote"));
        assert!(msg.contains("line 5: bad utf8"));
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = IngestError::UnsupportedFormat {
            extension: "pdf".into(),
            expected: ".csv",
        };
        assert_eq!(err.to_string(), "unsupported file type 'pdf': expected .csv");
    }
}
