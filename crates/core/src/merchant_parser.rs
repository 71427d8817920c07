//! Merchant CSV parser.
//!
//! Turns one uploaded merchant dataset into an ordered sequence of records,
//! or a single failure. Deterministic: same bytes, same output.
//!
//! Rules applied per the upload contract:
//! - only `.csv` files are accepted, rejected before any read
//! - headers are normalized once (whitespace collapsed, trimmed, lower-cased)
//! - cells in numeric-classified columns go through the stripping coercion
//! - row-level errors are collected and surfaced as one aggregate failure
//! - the first record must carry the required identification columns

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::record::{coerce_numeric, normalize_header, Record, Value};

/// A column holds numbers iff its normalized header contains any of these.
pub const NUMERIC_KEYWORDS: &[&str] = &["jml edc", "trx", "sv", "mdfg", "fy", "ytd", "yoy"];

/// Normalized columns every merchant upload must carry (checked on the first
/// record, which is assumed representative of the batch).
pub const REQUIRED_COLUMNS: &[&str] = &[
    "mid_new",
    "alamat",
    "segmen",
    "tgl pasang edc",
    "jml edc",
    "area",
];

/// Successful parse result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMerchants {
    pub records: Vec<Record>,
    /// Number of non-empty data rows.
    pub row_count: usize,
}

pub fn is_numeric_column(normalized_header: &str) -> bool {
    NUMERIC_KEYWORDS.iter().any(|k| normalized_header.contains(k))
}

/// Parse a merchant CSV from disk. The extension gate runs before the read.
pub fn parse_merchant_file(path: &Path) -> Result<ParsedMerchants> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if extension != "csv" {
        return Err(IngestError::UnsupportedFormat {
            extension,
            expected: ".csv",
        });
    }

    let bytes = std::fs::read(path)?;
    // Decode as UTF-8 (lossy on stray bytes); the BOM is stripped below.
    let (content, _, _) = encoding_rs::UTF_8.decode(&bytes);
    parse_merchant_csv(&content)
}

/// Parse merchant CSV content. Pure transform of text to records; callers
/// that already hold the bytes use this directly.
pub fn parse_merchant_csv(content: &str) -> Result<ParsedMerchants> {
    // Remove UTF-8 BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::RowErrors(vec![format!("header row: {}", e)]))?
        .iter()
        .map(normalize_header)
        .collect();

    // Two raw headers collapsing to one key would silently drop a column.
    let mut seen: Vec<&str> = Vec::new();
    let mut duplicates: Vec<String> = Vec::new();
    for h in &headers {
        if seen.contains(&h.as_str()) {
            if !duplicates.contains(h) {
                duplicates.push(h.clone());
            }
        } else {
            seen.push(h);
        }
    }
    if !duplicates.is_empty() {
        return Err(IngestError::DuplicateColumns(duplicates));
    }

    let numeric: Vec<bool> = headers.iter().map(|h| is_numeric_column(h)).collect();

    let mut records: Vec<Record> = Vec::new();
    let mut row_errors: Vec<String> = Vec::new();

    for (line_idx, result) in reader.records().enumerate() {
        let line_num = line_idx + 2; // +1 for 0-index, +1 for header

        let row = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(format!("line {}: {}", line_num, e));
                continue;
            }
        };

        // Skip fully empty rows; they are not data.
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut record = Record::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let raw = row.get(i).unwrap_or("");
            let value = if numeric[i] {
                Value::Number(coerce_numeric(raw))
            } else {
                Value::Text(raw.trim().to_string())
            };
            record.insert(header.clone(), value);
        }
        records.push(record);
    }

    if !row_errors.is_empty() {
        return Err(IngestError::RowErrors(row_errors));
    }

    // Schema validation against the first record. An empty result set is a
    // valid (if useless) upload, so nothing to validate there.
    if let Some(first) = records.first() {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !first.contains_key(**col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }
    }

    let row_count = records.len();
    debug!(rows = row_count, columns = headers.len(), "parsed merchant csv");

    Ok(ParsedMerchants { records, row_count })
}

// =============================================================================
// TESTS
// =============================================================================
