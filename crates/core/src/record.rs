//! Flat record model shared by both ingestion pipelines.
//!
//! A record is one input row: a mapping from a normalized column name to a
//! string or numeric cell value. The column set is discovered at parse time,
//! not declared up front, because weekly metric columns are named
//! positionally by week number and year suffix (e.g. "trx w33 '25").

use serde::Serialize;
use std::collections::HashMap;

/// Well-known merchant dataset columns, by normalized name.
pub mod field {
    pub const MERCHANT_ID: &str = "mid_new";
    pub const OFFICIAL_NAME: &str = "merchantofficialname";
    pub const COMMON_NAME: &str = "commonname";
    pub const ADDRESS: &str = "alamat";
    pub const SEGMENT: &str = "segmen";
    pub const EDC_INSTALL_DATE: &str = "tgl pasang edc";
    pub const EDC_COUNT: &str = "jml edc";
    pub const AREA: &str = "area";
    pub const BRANCH_CODE: &str = "cd_cbg";
    pub const BRANCH_NAME: &str = "cbg";
    pub const ACCOUNT_BRANCH_NAME: &str = "nama cabang rek";
    pub const ACCOUNT_BRANCH_CODE: &str = "kd cb rek";
    pub const LOB_DESC: &str = "lobdesc";
    pub const LOB: &str = "lob";
}

/// One cell value. CSV text cells stay text unless the column is classified
/// as numeric at parse time; spreadsheet cells keep their native numeric type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    /// Numeric view of the cell. Text cells go through the same stripping
    /// rule the merchant parser applies, so lazy coercion by KPI consumers
    /// agrees with eager coercion at parse time.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => coerce_numeric(s),
        }
    }

    /// Trimmed text content, or `None` for numeric or blank cells.
    pub fn non_blank_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t)
                }
            }
            Value::Number(_) => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format!("{}", n),
        }
    }
}

/// One input row keyed by normalized column names.
pub type Record = HashMap<String, Value>;

/// Canonical column key: whitespace runs collapsed to one space, trimmed,
/// lower-cased. Applied exactly once, at parse time. Idempotent.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Numeric coercion for cells in numeric-classified columns: every character
/// that is not a digit, `.` or `-` is stripped; an empty or `"-"` residue is
/// zero; anything that still fails to parse also degrades to zero rather
/// than poisoning downstream sums.
pub fn coerce_numeric(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return 0.0;
    }
    cleaned.parse().unwrap_or(0.0)
}

/// Text field accessor, `None` when absent or numeric.
pub fn text<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Numeric field accessor, zero when absent.
pub fn number(record: &Record, key: &str) -> f64 {
    record.get(key).map(Value::as_number).unwrap_or(0.0)
}

/// First non-empty candidate, else the named default. Precedence is explicit
/// so fallback chains (official name -> common name -> placeholder) stay
/// independently testable.
pub fn first_non_empty<'a>(candidates: &[Option<&'a str>], default: &'a str) -> &'a str {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.is_empty())
        .unwrap_or(default)
}

// =============================================================================
// TESTS
// =============================================================================
