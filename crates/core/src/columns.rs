//! Column classification for the merchant dataset.
//!
//! Weekly metric columns are named positionally ("trx w33 '25") and
//! year-to-date comparison columns use a separate grammar without the
//! apostrophe ("ytd trx w33 24"). The two families are matched with
//! independent patterns; they are not interchangeable.
//!
//! The index is purely descriptive: it holds column names, never data.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::record::Record;

/// Weekly-trend family: `<metric> w<week>`, optionally followed by an
/// apostrophe year (`'25`).
static WEEKLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(trx|sv|mdfg) w(\d+)").expect("weekly column pattern"));

/// Apostrophe year suffix on weekly columns.
static WEEKLY_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(\d+)\s*$").expect("weekly year pattern"));

/// Year-to-date family: `ytd <metric> w<week> <year>`, no apostrophe.
static YTD_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ytd (?:trx|sv|mdfg) w\d+ (\d+)").expect("ytd column pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Trx,
    Sv,
    Mdfg,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Trx, Metric::Sv, Metric::Mdfg];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Trx => "trx",
            Metric::Sv => "sv",
            Metric::Mdfg => "mdfg",
        }
    }

    fn from_key(key: &str) -> Option<Metric> {
        match key {
            "trx" => Some(Metric::Trx),
            "sv" => Some(Metric::Sv),
            "mdfg" => Some(Metric::Mdfg),
            _ => None,
        }
    }
}

/// One weekly metric column.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyColumn {
    pub name: String,
    pub week: u32,
    /// Two-digit apostrophe-year suffix, when the column carries one.
    pub year: Option<String>,
}

/// Discovered columns for a single metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricColumns {
    /// Weekly columns in ascending week order.
    pub weekly: Vec<WeeklyColumn>,
    /// Current-year YTD column name, if one exists.
    pub ytd_current: Option<String>,
    /// Previous-year YTD column name, if one exists.
    pub ytd_previous: Option<String>,
}

impl MetricColumns {
    /// The `n` most recent weekly columns, ascending.
    pub fn last_weeks(&self, n: usize) -> &[WeeklyColumn] {
        let start = self.weekly.len().saturating_sub(n);
        &self.weekly[start..]
    }

    /// Weekly columns restricted to the current year, when both the column
    /// and the index carry a year. Columns without a year suffix cannot be
    /// disqualified and are kept.
    pub fn current_year_weekly<'a>(&'a self, current_year: Option<&str>) -> Vec<&'a WeeklyColumn> {
        self.weekly
            .iter()
            .filter(|w| match (&w.year, current_year) {
                (Some(y), Some(c)) => y == c,
                _ => true,
            })
            .collect()
    }
}

/// Descriptor of every week/year-indexed column in a record batch.
///
/// A single current/previous year pair is derived once from the distinct YTD
/// year suffixes across the whole header set and reused for every metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    pub trx: MetricColumns,
    pub sv: MetricColumns,
    pub mdfg: MetricColumns,
    /// Greatest two-digit year suffix seen in YTD columns.
    pub current_year: Option<String>,
    /// Second greatest, when at least two distinct years are present.
    pub previous_year: Option<String>,
}

impl ColumnIndex {
    pub fn metric(&self, metric: Metric) -> &MetricColumns {
        match metric {
            Metric::Trx => &self.trx,
            Metric::Sv => &self.sv,
            Metric::Mdfg => &self.mdfg,
        }
    }

    /// Classify a set of normalized headers. Zero matches for a metric is
    /// not an error; downstream aggregation treats it as contributing zero.
    pub fn classify<'a, I>(headers: I) -> ColumnIndex
    where
        I: IntoIterator<Item = &'a str>,
    {
        // BTreeSet gives a deterministic scan order regardless of how the
        // caller collected the headers.
        let headers: BTreeSet<&str> = headers.into_iter().collect();

        let mut index = ColumnIndex::default();

        // Distinct YTD year suffixes, shared across metrics.
        let mut years: BTreeSet<String> = BTreeSet::new();
        for h in &headers {
            if let Some(cap) = YTD_YEAR_RE.captures(h) {
                years.insert(cap[1].to_string());
            }
        }
        // Descending lexicographic: first is current, second is previous.
        let mut years: Vec<String> = years.into_iter().collect();
        years.sort_by(|a, b| b.cmp(a));
        index.current_year = years.first().cloned();
        index.previous_year = years.get(1).cloned();

        for metric in Metric::ALL {
            let cols = match metric {
                Metric::Trx => &mut index.trx,
                Metric::Sv => &mut index.sv,
                Metric::Mdfg => &mut index.mdfg,
            };

            for h in &headers {
                let Some(cap) = WEEKLY_RE.captures(h) else { continue };
                if Metric::from_key(&cap[1]) != Some(metric) {
                    continue;
                }
                let week: u32 = cap[2].parse().unwrap_or(0);
                let year = WEEKLY_YEAR_RE.captures(h).map(|c| c[1].to_string());
                cols.weekly.push(WeeklyColumn {
                    name: h.to_string(),
                    week,
                    year,
                });
            }
            cols.weekly.sort_by_key(|w| w.week);

            let ytd_prefix = format!("ytd {}", metric.key());
            cols.ytd_current = find_ytd_column(&headers, &ytd_prefix, index.current_year.as_deref());
            cols.ytd_previous =
                find_ytd_column(&headers, &ytd_prefix, index.previous_year.as_deref());
        }

        debug!(
            current_year = ?index.current_year,
            previous_year = ?index.previous_year,
            trx_weeks = index.trx.weekly.len(),
            sv_weeks = index.sv.weekly.len(),
            mdfg_weeks = index.mdfg.weekly.len(),
            "classified columns"
        );

        index
    }

    /// Build the index from the union of headers across all records. This is
    /// the hardened variant of "the first record defines the schema": a batch
    /// with ragged columns still gets every column classified.
    pub fn from_records(records: &[Record]) -> ColumnIndex {
        Self::classify(records.iter().flat_map(|r| r.keys()).map(String::as_str))
    }
}

fn find_ytd_column(headers: &BTreeSet<&str>, prefix: &str, year: Option<&str>) -> Option<String> {
    let year = year?;
    headers
        .iter()
        .find(|h| h.starts_with(prefix) && h.ends_with(year))
        .map(|h| h.to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(headers: &[&str]) -> ColumnIndex {
        ColumnIndex::classify(headers.iter().copied())
    }

    // -------------------------------------------------------------------------
    // WEEKLY FAMILY
    // -------------------------------------------------------------------------

    #[test]
    fn test_weekly_columns_sorted_ascending_by_week() {
        let index = classify(&[
            "trx w33 '25",
            "trx w32 '25",
            "ytd trx w33 25",
            "ytd trx w33 24",
        ]);
        let names: Vec<&str> = index.trx.weekly.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["trx w32 '25", "trx w33 '25"]);
        assert_eq!(index.current_year.as_deref(), Some("25"));
        assert_eq!(index.previous_year.as_deref(), Some("24"));
    }

    #[test]
    fn test_weekly_family_captures_week_and_year() {
        let index = classify(&["sv w7 '25", "sv w10 '25"]);
        assert_eq!(index.sv.weekly[0].week, 7);
        assert_eq!(index.sv.weekly[0].year.as_deref(), Some("25"));
        assert_eq!(index.sv.weekly[1].week, 10);
    }

    #[test]
    fn test_weekly_without_year_suffix() {
        let index = classify(&["mdfg w12"]);
        assert_eq!(index.mdfg.weekly[0].year, None);
    }

    #[test]
    fn test_ytd_columns_do_not_leak_into_weekly() {
        let index = classify(&["ytd trx w33 25", "fy trx 24", "growth yoy trx"]);
        assert!(index.trx.weekly.is_empty());
    }

    #[test]
    fn test_metrics_are_independent() {
        let index = classify(&["trx w33 '25", "sv w31 '25", "mdfg w30 '25"]);
        assert_eq!(index.trx.weekly.len(), 1);
        assert_eq!(index.sv.weekly.len(), 1);
        assert_eq!(index.mdfg.weekly.len(), 1);
    }

    // -------------------------------------------------------------------------
    // YTD FAMILY AND YEAR SELECTION
    // -------------------------------------------------------------------------

    #[test]
    fn test_ytd_column_names_resolved_per_metric() {
        let index = classify(&[
            "ytd trx w33 25",
            "ytd trx w33 24",
            "ytd sv w33 25",
            "ytd sv w33 24",
        ]);
        assert_eq!(index.trx.ytd_current.as_deref(), Some("ytd trx w33 25"));
        assert_eq!(index.trx.ytd_previous.as_deref(), Some("ytd trx w33 24"));
        assert_eq!(index.sv.ytd_current.as_deref(), Some("ytd sv w33 25"));
        assert_eq!(index.sv.ytd_previous.as_deref(), Some("ytd sv w33 24"));
    }

    #[test]
    fn test_year_set_is_shared_across_metrics() {
        // Only mdfg carries the previous year, but the pair is global.
        let index = classify(&["ytd trx w33 25", "ytd mdfg w33 24"]);
        assert_eq!(index.current_year.as_deref(), Some("25"));
        assert_eq!(index.previous_year.as_deref(), Some("24"));
        assert_eq!(index.trx.ytd_previous, None);
        assert_eq!(index.mdfg.ytd_previous.as_deref(), Some("ytd mdfg w33 24"));
    }

    #[test]
    fn test_single_year_means_no_previous() {
        let index = classify(&["ytd sv w20 25"]);
        assert_eq!(index.current_year.as_deref(), Some("25"));
        assert_eq!(index.previous_year, None);
        assert_eq!(index.sv.ytd_previous, None);
    }

    #[test]
    fn test_no_matching_columns_is_empty_not_error() {
        let index = classify(&["mid_new", "alamat", "segmen"]);
        assert_eq!(index, ColumnIndex::default());
    }

    // -------------------------------------------------------------------------
    // HELPERS
    // -------------------------------------------------------------------------

    #[test]
    fn test_last_weeks_window() {
        let index = classify(&[
            "sv w30 '25",
            "sv w31 '25",
            "sv w32 '25",
            "sv w33 '25",
            "sv w29 '25",
        ]);
        let last: Vec<u32> = index.sv.last_weeks(4).iter().map(|w| w.week).collect();
        assert_eq!(last, vec![30, 31, 32, 33]);
        assert_eq!(index.sv.last_weeks(99).len(), 5);
    }

    #[test]
    fn test_current_year_weekly_filters_by_suffix() {
        let index = classify(&["trx w33 '25", "trx w33 '24", "ytd trx w33 25"]);
        let current: Vec<&str> = index
            .trx
            .current_year_weekly(index.current_year.as_deref())
            .iter()
            .map(|w| w.name.as_str())
            .collect();
        assert_eq!(current, vec!["trx w33 '25"]);
    }

    #[test]
    fn test_from_records_unions_headers() {
        use crate::record::Value;
        let mut a = Record::new();
        a.insert("trx w32 '25".to_string(), Value::Number(1.0));
        let mut b = Record::new();
        b.insert("trx w33 '25".to_string(), Value::Number(2.0));
        let index = ColumnIndex::from_records(&[a, b]);
        assert_eq!(index.trx.weekly.len(), 2);
    }
}
