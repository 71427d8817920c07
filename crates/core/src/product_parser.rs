//! Product dataset parser (two-row-header variant).
//!
//! Row 1 is a sparse month label row where blanks mean "same month as the
//! previous non-blank cell" (the merged-cell spreadsheet convention), row 2
//! names the metric, data starts at row 3. Column names are synthesized as
//! `<MONTH>_<METRIC>`; the first column is always `Produk`.
//!
//! Cell values stay raw at this stage; KPI consumers coerce lazily.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::record::{Record, Value};

/// Canonical Indonesian month codes, in calendar order.
pub const MONTH_ORDER: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MEI", "JUN", "JUL", "AGU", "SEP", "OKT", "NOV", "DES",
];

/// Normalize a month label through the canonical 12-entry Indonesian lookup.
/// Indonesian and English spellings and abbreviations are accepted,
/// case-insensitively; unrecognized labels fall back to their first three
/// letters, upper-cased.
pub fn normalize_month(raw: &str) -> String {
    let m = raw.trim().to_lowercase();
    let canonical = match m.as_str() {
        "januari" | "jan" | "january" => Some("JAN"),
        "februari" | "feb" | "february" => Some("FEB"),
        "maret" | "mar" | "march" => Some("MAR"),
        "april" | "apr" => Some("APR"),
        "mei" | "may" => Some("MEI"),
        "juni" | "jun" | "june" => Some("JUN"),
        "juli" | "jul" | "july" => Some("JUL"),
        "agustus" | "agu" | "agust" | "aug" | "august" => Some("AGU"),
        "september" | "sep" | "sept" => Some("SEP"),
        "oktober" | "okt" | "oct" | "october" => Some("OKT"),
        "november" | "nov" => Some("NOV"),
        "desember" | "des" | "dec" | "december" => Some("DES"),
        _ => None,
    };
    match canonical {
        Some(c) => c.to_string(),
        None => raw.trim().chars().take(3).collect::<String>().to_uppercase(),
    }
}

/// Forward-fill a month label row: each blank cell inherits the nearest
/// preceding non-blank cell's value.
pub fn fill_forward(row: &[String]) -> Vec<String> {
    let mut last = String::new();
    row.iter()
        .map(|v| {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                last = trimmed.to_string();
            }
            last.clone()
        })
        .collect()
}

/// Parse a product dataset file. CSV and spreadsheet-binary (XLSX/XLS)
/// inputs are supported; anything else is rejected before reading.
pub fn parse_product_file(path: &Path) -> Result<Vec<Record>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" => read_csv_rows(path)?,
        "xlsx" | "xls" => read_sheet_rows(path)?,
        _ => {
            return Err(IngestError::UnsupportedFormat {
                extension,
                expected: ".csv, .xlsx or .xls",
            })
        }
    };

    Ok(parse_product_rows(&rows))
}

/// Assemble records from raw rows. Fewer than three rows (no data under the
/// two header rows) yields an empty set, not an error.
pub fn parse_product_rows(rows: &[Vec<Value>]) -> Vec<Record> {
    if rows.len() < 3 {
        return Vec::new();
    }

    let months_raw: Vec<String> = rows[0].iter().map(Value::display).collect();
    let months: Vec<String> = fill_forward(&months_raw)
        .iter()
        .map(|m| normalize_month(m))
        .collect();
    let metrics: Vec<String> = rows[1]
        .iter()
        .map(|v| v.display().trim().to_string())
        .collect();

    let headers: Vec<String> = metrics
        .iter()
        .enumerate()
        .map(|(i, metric)| {
            if i == 0 {
                return "Produk".to_string();
            }
            let month = months.get(i).cloned().unwrap_or_default();
            if month.is_empty() {
                metric.to_uppercase()
            } else {
                format!("{}_{}", month, metric.to_uppercase())
            }
        })
        .collect();

    let records: Vec<Record> = rows[2..]
        .iter()
        .filter(|row| {
            row.iter()
                .any(|cell| cell.non_blank_str().is_some() || matches!(cell, Value::Number(_)))
        })
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = row.get(i).cloned().unwrap_or(Value::Text(String::new()));
                    (header.clone(), value)
                })
                .collect()
        })
        .collect();

    debug!(rows = records.len(), columns = headers.len(), "parsed product rows");
    records
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<Value>>> {
    let bytes = std::fs::read(path)?;
    let (content, _, _) = encoding_rs::UTF_8.decode(&bytes);
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| IngestError::RowErrors(vec![e.to_string()]))?;
        rows.push(row.iter().map(|c| Value::Text(c.to_string())).collect());
    }
    Ok(rows)
}

fn read_sheet_rows(path: &Path) -> Result<Vec<Vec<Value>>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::Spreadsheet(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| IngestError::Spreadsheet("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| IngestError::Spreadsheet(e.to_string()))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();
    Ok(rows)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Empty => Value::Text(String::new()),
        other => Value::Text(format!("{}", other)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Value>> {
        rows.iter()
            .map(|r| r.iter().map(|c| Value::Text(c.to_string())).collect())
            .collect()
    }

    // -------------------------------------------------------------------------
    // FORWARD FILL AND MONTH NORMALIZATION
    // -------------------------------------------------------------------------

    #[test]
    fn test_fill_forward_merged_cells() {
        let row: Vec<String> = ["JAN", "", "", "FEB", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(fill_forward(&row), vec!["JAN", "JAN", "JAN", "FEB", "FEB"]);
    }

    #[test]
    fn test_fill_forward_leading_blanks_stay_empty() {
        let row: Vec<String> = ["", "", "MAR"].iter().map(|s| s.to_string()).collect();
        assert_eq!(fill_forward(&row), vec!["", "", "MAR"]);
    }

    #[test]
    fn test_normalize_month_indonesian_and_english() {
        assert_eq!(normalize_month("januari"), "JAN");
        assert_eq!(normalize_month("January"), "JAN");
        assert_eq!(normalize_month(" MEI "), "MEI");
        assert_eq!(normalize_month("oct"), "OKT");
        assert_eq!(normalize_month("Desember"), "DES");
        assert_eq!(normalize_month("AGUST"), "AGU");
    }

    #[test]
    fn test_normalize_month_fallback_first_three_letters() {
        assert_eq!(normalize_month("quarter"), "QUA");
        assert_eq!(normalize_month(""), "");
        assert_eq!(normalize_month("xy"), "XY");
    }

    // -------------------------------------------------------------------------
    // ROW ASSEMBLY
    // -------------------------------------------------------------------------

    #[test]
    fn test_round_trip_single_month() {
        let rows = text_rows(&[
            &["JAN", "", ""],
            &["", "TARGET", "POSISI"],
            &["KSM", "100", "80"],
        ]);
        let records = parse_product_rows(&rows);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.get("Produk"), Some(&Value::Text("KSM".into())));
        assert_eq!(r.get("JAN_TARGET"), Some(&Value::Text("100".into())));
        assert_eq!(r.get("JAN_POSISI"), Some(&Value::Text("80".into())));
    }

    #[test]
    fn test_headers_span_months_via_forward_fill() {
        let rows = text_rows(&[
            &["Produk", "Januari", "", "feb", ""],
            &["Produk", "TARGET", "POSISI", "target", "posisi"],
            &["KSM", "1", "2", "3", "4"],
        ]);
        let records = parse_product_rows(&rows);
        let r = &records[0];
        assert!(r.contains_key("JAN_TARGET"));
        assert!(r.contains_key("JAN_POSISI"));
        assert!(r.contains_key("FEB_TARGET"));
        assert!(r.contains_key("FEB_POSISI"));
    }

    #[test]
    fn test_blank_month_column_keeps_bare_metric() {
        let rows = text_rows(&[
            &["", "", "JAN"],
            &["", "KETERANGAN", "TARGET"],
            &["KSM", "aktif", "10"],
        ]);
        let records = parse_product_rows(&rows);
        let r = &records[0];
        assert_eq!(r.get("KETERANGAN"), Some(&Value::Text("aktif".into())));
        assert!(r.contains_key("JAN_TARGET"));
    }

    #[test]
    fn test_fewer_than_three_rows_is_empty() {
        let rows = text_rows(&[&["JAN"], &["TARGET"]]);
        assert!(parse_product_rows(&rows).is_empty());
    }

    #[test]
    fn test_short_data_rows_padded_with_empty_text() {
        let rows = text_rows(&[
            &["JAN", "", ""],
            &["", "TARGET", "POSISI"],
            &["KSM", "100"],
        ]);
        let records = parse_product_rows(&rows);
        assert_eq!(records[0].get("JAN_POSISI"), Some(&Value::Text("".into())));
    }

    #[test]
    fn test_blank_data_rows_skipped() {
        let rows = text_rows(&[
            &["JAN", ""],
            &["", "TARGET"],
            &["", ""],
            &["KSM", "100"],
        ]);
        let records = parse_product_rows(&rows);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_numeric_sheet_cells_stay_numeric() {
        let rows = vec![
            vec![Value::Text("JAN".into()), Value::Text("".into())],
            vec![Value::Text("".into()), Value::Text("TARGET".into())],
            vec![Value::Text("KSM".into()), Value::Number(100.0)],
        ];
        let records = parse_product_rows(&rows);
        assert_eq!(records[0].get("JAN_TARGET"), Some(&Value::Number(100.0)));
    }

    // -------------------------------------------------------------------------
    // FILE GATE
    // -------------------------------------------------------------------------

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = parse_product_file(Path::new("/nonexistent/data.pdf")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_csv_file_round_trip() {
        let path = std::env::temp_dir().join("tracker_core_product_parser_test.csv");
        std::fs::write(&path, "JAN,,\n,TARGET,POSISI\nKSM,100,80\n").unwrap();
        let records = parse_product_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("JAN_TARGET"),
            Some(&Value::Text("100".into()))
        );
    }
}
