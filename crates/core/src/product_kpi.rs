//! KPI figures layered on top of parsed product records.
//!
//! A product record carries `<MONTH>_<METRIC>` columns; this module reads
//! target vs. position for a single selected month or accumulated across all
//! detected months. Coercion is lazy: cells stay raw in the record and are
//! numerically interpreted here, missing cells reading as zero.

use serde::Serialize;

use crate::product_parser::MONTH_ORDER;
use crate::record::{Record, Value};

/// Month restriction for KPI computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthFilter {
    /// Accumulate across every detected month.
    All,
    /// One canonical month code (e.g. `JAN`); constructor upper-cases.
    Month(String),
}

impl MonthFilter {
    pub fn month(label: &str) -> MonthFilter {
        MonthFilter::Month(label.trim().to_uppercase())
    }
}

/// Target/position figures for one product and month selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductKpi {
    pub target: f64,
    pub posisi: f64,
    /// Achievement percentage; zero when the target is zero.
    pub pencapaian: f64,
    /// Gap/surplus figure when the source sheet carries one for the selected
    /// month; not applicable for the all-months accumulation.
    pub gap_surplus: Option<f64>,
    /// Year-to-date position; for the all-months accumulation this is the
    /// total position.
    pub ytd: Option<f64>,
}

/// One point of the per-month chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthPoint {
    pub month: String,
    pub target: f64,
    pub posisi: f64,
}

/// Months present in the record, in canonical JAN..DES order. A month counts
/// as present when any key carries it as the prefix before `_`.
pub fn available_months(record: &Record) -> Vec<String> {
    MONTH_ORDER
        .iter()
        .filter(|month| {
            record
                .keys()
                .any(|k| k.split('_').next() == Some(**month))
        })
        .map(|m| m.to_string())
        .collect()
}

/// Compute KPI figures for one product record.
pub fn product_kpi(record: &Record, filter: &MonthFilter) -> ProductKpi {
    match filter {
        MonthFilter::All => {
            let months = available_months(record);
            let target: f64 = months.iter().map(|m| month_value(record, m, "TARGET")).sum();
            let posisi: f64 = months.iter().map(|m| month_value(record, m, "POSISI")).sum();
            ProductKpi {
                target,
                posisi,
                pencapaian: achievement(posisi, target),
                gap_surplus: None,
                ytd: Some(posisi),
            }
        }
        MonthFilter::Month(month) => {
            let target = month_value(record, month, "TARGET");
            let posisi = month_value(record, month, "POSISI");
            let gap_surplus = record
                .get(&format!("{}_GAP/SURPLUS", month))
                .or_else(|| record.get(&format!("{}_GAP", month)))
                .map(Value::as_number);
            let ytd = record
                .get(&format!("{}_YTD", month))
                .map(Value::as_number);
            ProductKpi {
                target,
                posisi,
                pencapaian: achievement(posisi, target),
                gap_surplus,
                ytd,
            }
        }
    }
}

/// Per-month target/position series for charting, in calendar order.
pub fn month_series(record: &Record) -> Vec<MonthPoint> {
    available_months(record)
        .into_iter()
        .map(|month| MonthPoint {
            target: month_value(record, &month, "TARGET"),
            posisi: month_value(record, &month, "POSISI"),
            month,
        })
        .collect()
}

fn month_value(record: &Record, month: &str, metric: &str) -> f64 {
    record
        .get(&format!("{}_{}", month, metric))
        .map(Value::as_number)
        .unwrap_or(0.0)
}

fn achievement(posisi: f64, target: f64) -> f64 {
    if target > 0.0 {
        posisi / target * 100.0
    } else {
        0.0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(fields: &[(&str, &str)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Text(v.to_string())))
            .collect()
    }

    fn sample() -> Record {
        rec(&[
            ("Produk", "KSM"),
            ("JAN_TARGET", "100"),
            ("JAN_POSISI", "80"),
            ("JAN_GAP", "-20"),
            ("JAN_YTD", "80"),
            ("FEB_TARGET", "100"),
            ("FEB_POSISI", "120"),
        ])
    }

    // -------------------------------------------------------------------------
    // MONTH DETECTION
    // -------------------------------------------------------------------------

    #[test]
    fn test_available_months_in_calendar_order() {
        let record = rec(&[
            ("FEB_TARGET", "1"),
            ("JAN_TARGET", "1"),
            ("DES_POSISI", "1"),
        ]);
        assert_eq!(available_months(&record), vec!["JAN", "FEB", "DES"]);
    }

    #[test]
    fn test_non_month_prefixes_ignored() {
        let record = rec(&[("Produk", "KSM"), ("KETERANGAN", "x")]);
        assert!(available_months(&record).is_empty());
    }

    // -------------------------------------------------------------------------
    // SINGLE MONTH
    // -------------------------------------------------------------------------

    #[test]
    fn test_single_month_kpi() {
        let kpi = product_kpi(&sample(), &MonthFilter::month("jan"));
        assert_eq!(kpi.target, 100.0);
        assert_eq!(kpi.posisi, 80.0);
        assert_eq!(kpi.pencapaian, 80.0);
        assert_eq!(kpi.gap_surplus, Some(-20.0));
        assert_eq!(kpi.ytd, Some(80.0));
    }

    #[test]
    fn test_gap_surplus_column_takes_precedence() {
        let record = rec(&[
            ("JAN_TARGET", "10"),
            ("JAN_POSISI", "5"),
            ("JAN_GAP/SURPLUS", "7"),
            ("JAN_GAP", "-5"),
        ]);
        let kpi = product_kpi(&record, &MonthFilter::month("JAN"));
        assert_eq!(kpi.gap_surplus, Some(7.0));
    }

    #[test]
    fn test_missing_month_reads_as_zero() {
        let kpi = product_kpi(&sample(), &MonthFilter::month("MAR"));
        assert_eq!(kpi.target, 0.0);
        assert_eq!(kpi.posisi, 0.0);
        assert_eq!(kpi.pencapaian, 0.0);
        assert_eq!(kpi.gap_surplus, None);
        assert_eq!(kpi.ytd, None);
    }

    #[test]
    fn test_zero_target_means_zero_achievement() {
        let record = rec(&[("JAN_POSISI", "50")]);
        let kpi = product_kpi(&record, &MonthFilter::month("JAN"));
        assert_eq!(kpi.pencapaian, 0.0);
    }

    // -------------------------------------------------------------------------
    // ALL MONTHS
    // -------------------------------------------------------------------------

    #[test]
    fn test_all_months_accumulates() {
        let kpi = product_kpi(&sample(), &MonthFilter::All);
        assert_eq!(kpi.target, 200.0);
        assert_eq!(kpi.posisi, 200.0);
        assert_eq!(kpi.pencapaian, 100.0);
        assert_eq!(kpi.gap_surplus, None);
        assert_eq!(kpi.ytd, Some(200.0));
    }

    #[test]
    fn test_empty_record_all_months_is_zero() {
        let kpi = product_kpi(&Record::new(), &MonthFilter::All);
        assert_eq!(kpi.target, 0.0);
        assert_eq!(kpi.posisi, 0.0);
        assert_eq!(kpi.pencapaian, 0.0);
        assert_eq!(kpi.gap_surplus, None);
        assert_eq!(kpi.ytd, Some(0.0));
    }

    // -------------------------------------------------------------------------
    // CHART SERIES
    // -------------------------------------------------------------------------

    #[test]
    fn test_month_series_calendar_order() {
        let series = month_series(&sample());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].month, "JAN");
        assert_eq!(series[0].target, 100.0);
        assert_eq!(series[1].month, "FEB");
        assert_eq!(series[1].posisi, 120.0);
    }

    #[test]
    fn test_numeric_cells_coerced_lazily() {
        let mut record = Record::new();
        record.insert("JAN_TARGET".to_string(), Value::Number(50.0));
        record.insert("JAN_POSISI".to_string(), Value::Text("1.500".to_string()));
        let kpi = product_kpi(&record, &MonthFilter::month("JAN"));
        assert_eq!(kpi.target, 50.0);
        // lazy text coercion follows the stripping rule
        assert_eq!(kpi.posisi, 1.5);
    }
}
