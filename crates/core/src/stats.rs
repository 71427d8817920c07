//! Aggregate statistics over a classified merchant record batch.
//!
//! The aggregator never fails: every absence case (missing metric columns,
//! missing year pairs, empty input) has a defined zero-valued result, so the
//! consumer never needs null checks. Statistics are always rebuilt wholesale,
//! never patched in place.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::columns::{ColumnIndex, MetricColumns, WeeklyColumn};
use crate::record::{field, first_non_empty, number, text, Record};

/// Window used for the "recent" leaderboards and the trend series.
pub const TREND_WEEKS: usize = 4;

/// A current-vs-previous-year comparison for one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub value: f64,
    pub prev_value: f64,
    pub growth: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonBlock {
    pub merchants: Comparison,
    pub trx: Comparison,
    pub sv: Comparison,
    pub mdfg: Comparison,
    pub edc: Comparison,
}

/// One point of a weekly trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub week: String,
    pub value: f64,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub name: String,
    pub value: f64,
}

/// Merchant leaderboard row; keeps the merchant id for drill-down.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRank {
    pub mid: String,
    pub name: String,
    pub value: f64,
}

/// The full statistics object consumed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_merchants: usize,
    pub with_edc: usize,
    pub without_edc: usize,
    /// Sum of every weekly trx column across all records.
    pub total_trx: f64,
    /// Sum of every weekly sv column across all records.
    pub total_sv: f64,
    pub comparison: ComparisonBlock,
    pub trx_trend: Vec<TrendPoint>,
    pub sv_trend: Vec<TrendPoint>,
    pub mdfg_trend: Vec<TrendPoint>,
    pub segment_distribution: BTreeMap<String, usize>,
    pub edc_by_branch: BTreeMap<String, f64>,
    pub top_merchants_by_sv: Vec<MerchantRank>,
    pub top_branches_by_trx: Vec<RankEntry>,
    pub top_merchants_by_mdfg: Vec<RankEntry>,
    pub top_lobs_by_mdfg: Vec<RankEntry>,
    pub top_lobs_by_sv: Vec<RankEntry>,
}

/// Year-over-year growth in percent. A zero baseline with a non-zero current
/// value reads as 100% growth.
pub fn calc_growth(current: f64, prev: f64) -> f64 {
    if prev == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        (current - prev) / prev * 100.0
    }
}

/// Display name for one merchant: official name, then common name, then a
/// placeholder dash.
pub fn merchant_display_name(record: &Record) -> String {
    first_non_empty(
        &[
            text(record, field::OFFICIAL_NAME),
            text(record, field::COMMON_NAME),
        ],
        "-",
    )
    .to_string()
}

/// Fold the record batch plus the column index into the statistics object.
/// Empty input produces the fully-populated zero-valued default.
pub fn aggregate(records: &[Record], index: &ColumnIndex) -> AggregateStats {
    if records.is_empty() {
        return AggregateStats::default();
    }

    let mut with_edc = 0usize;
    let mut segment_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut edc_by_branch: BTreeMap<String, f64> = BTreeMap::new();

    let mut trx_ytd = (0.0, 0.0);
    let mut sv_ytd = (0.0, 0.0);
    let mut mdfg_ytd = (0.0, 0.0);
    let mut merchants_current = 0usize;
    let mut merchants_previous = 0usize;
    let mut edc_total = 0.0;
    let mut total_trx = 0.0;
    let mut total_sv = 0.0;

    for record in records {
        // A merchant "has EDC" iff the install date cell is non-blank.
        let has_edc = record
            .get(field::EDC_INSTALL_DATE)
            .and_then(|v| v.non_blank_str())
            .is_some();
        if has_edc {
            with_edc += 1;
        }

        let segment = text(record, field::SEGMENT)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown");
        *segment_distribution.entry(segment.to_string()).or_insert(0) += 1;

        // Branch resolution for the EDC distribution: account branch name,
        // then account branch code, then a named default.
        let branch = first_non_empty(
            &[
                record
                    .get(field::ACCOUNT_BRANCH_NAME)
                    .and_then(|v| v.non_blank_str()),
                text(record, field::ACCOUNT_BRANCH_CODE),
            ],
            "Unknown",
        );
        *edc_by_branch.entry(branch.to_string()).or_insert(0.0) +=
            number(record, field::EDC_COUNT);

        edc_total += number(record, field::EDC_COUNT);

        for w in &index.trx.weekly {
            total_trx += number(record, &w.name);
        }
        for w in &index.sv.weekly {
            total_sv += number(record, &w.name);
        }

        let (trx_cur, trx_prev) = ytd_pair(record, &index.trx);
        trx_ytd.0 += trx_cur;
        trx_ytd.1 += trx_prev;
        let (sv_cur, sv_prev) = ytd_pair(record, &index.sv);
        sv_ytd.0 += sv_cur;
        sv_ytd.1 += sv_prev;
        let (mdfg_cur, mdfg_prev) = ytd_pair(record, &index.mdfg);
        mdfg_ytd.0 += mdfg_cur;
        mdfg_ytd.1 += mdfg_prev;

        // Active-merchant counts ride on the trx YTD columns. With no
        // prior-year baseline this reads as 100% growth against zero, a
        // known approximation rather than a general rule.
        if trx_cur > 0.0 {
            merchants_current += 1;
        }
        if trx_prev > 0.0 {
            merchants_previous += 1;
        }
    }

    let comparison = ComparisonBlock {
        merchants: yoy(merchants_current as f64, merchants_previous as f64),
        trx: yoy(trx_ytd.0, trx_ytd.1),
        sv: yoy(sv_ytd.0, sv_ytd.1),
        mdfg: yoy(mdfg_ytd.0, mdfg_ytd.1),
        // No prior-period EDC figure exists, so EDC carries no YoY meaning.
        edc: Comparison {
            value: edc_total,
            prev_value: edc_total,
            growth: 0.0,
        },
    };

    AggregateStats {
        total_merchants: records.len(),
        with_edc,
        without_edc: records.len() - with_edc,
        total_trx,
        total_sv,
        comparison,
        trx_trend: trend(records, &index.trx, index.current_year.as_deref()),
        sv_trend: trend(records, &index.sv, index.current_year.as_deref()),
        mdfg_trend: trend(records, &index.mdfg, index.current_year.as_deref()),
        segment_distribution,
        edc_by_branch,
        top_merchants_by_sv: top_merchants_by_sv(records, index, 10),
        top_branches_by_trx: top_branches_by_trx(records, index, 10),
        top_merchants_by_mdfg: top_merchants_by_mdfg(records, index, 5),
        top_lobs_by_mdfg: top_lobs_by_mdfg(records, index, 5),
        top_lobs_by_sv: top_lobs_by_sv(records, index, 5),
    }
}

fn yoy(current: f64, prev: f64) -> Comparison {
    Comparison {
        value: current,
        prev_value: prev,
        growth: calc_growth(current, prev),
    }
}

fn ytd_pair(record: &Record, cols: &MetricColumns) -> (f64, f64) {
    let current = cols
        .ytd_current
        .as_deref()
        .map(|c| number(record, c))
        .unwrap_or(0.0);
    let previous = cols
        .ytd_previous
        .as_deref()
        .map(|c| number(record, c))
        .unwrap_or(0.0);
    (current, previous)
}

/// Weekly trend series: the four most recent current-year week columns in
/// ascending order, each summed across all records.
fn trend(records: &[Record], cols: &MetricColumns, current_year: Option<&str>) -> Vec<TrendPoint> {
    let weekly = cols.current_year_weekly(current_year);
    let start = weekly.len().saturating_sub(TREND_WEEKS);
    weekly[start..]
        .iter()
        .map(|w| TrendPoint {
            week: format!("W{}", w.week),
            value: column_sum(records, &w.name),
        })
        .collect()
}

fn column_sum(records: &[Record], column: &str) -> f64 {
    records.iter().map(|r| number(r, column)).sum()
}

fn window_sum(record: &Record, window: &[WeeklyColumn]) -> f64 {
    window.iter().map(|w| number(record, &w.name)).sum()
}

/// Group-sum that remembers first-appearance order, so descending sorts
/// break ties by input order.
fn group_sum(entries: impl Iterator<Item = (String, f64)>) -> Vec<RankEntry> {
    let mut order: Vec<RankEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (name, value) in entries {
        match positions.get(&name) {
            Some(&i) => order[i].value += value,
            None => {
                positions.insert(name.clone(), order.len());
                order.push(RankEntry { name, value });
            }
        }
    }
    order
}

/// Stable descending sort capped at `k`.
fn rank_desc(mut entries: Vec<RankEntry>, k: usize) -> Vec<RankEntry> {
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    entries.truncate(k);
    entries
}

/// Top merchants by sales volume over the last four weeks. `k` is a call-site
/// concern: the leaderboard table uses 10, the chart variant 5.
pub fn top_merchants_by_sv(records: &[Record], index: &ColumnIndex, k: usize) -> Vec<MerchantRank> {
    let window = index.sv.last_weeks(TREND_WEEKS);
    let mut ranks: Vec<MerchantRank> = records
        .iter()
        .map(|r| MerchantRank {
            mid: text(r, field::MERCHANT_ID).unwrap_or("").to_string(),
            name: merchant_display_name(r),
            value: window_sum(r, window),
        })
        .collect();
    ranks.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranks.truncate(k);
    ranks
}

/// Top branches by transactions over the last four weeks.
pub fn top_branches_by_trx(records: &[Record], index: &ColumnIndex, k: usize) -> Vec<RankEntry> {
    let window = index.trx.last_weeks(TREND_WEEKS);
    let grouped = group_sum(records.iter().map(|r| {
        let branch = text(r, field::BRANCH_NAME)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("-");
        (branch.to_string(), window_sum(r, window))
    }));
    rank_desc(grouped, k)
}

/// Top merchants by MDFG summed over every weekly MDFG column. Unlike the
/// SV/trx leaderboards this is an all-time window; the asymmetry is
/// intentional and preserved.
pub fn top_merchants_by_mdfg(records: &[Record], index: &ColumnIndex, k: usize) -> Vec<RankEntry> {
    let ranks = records
        .iter()
        .map(|r| RankEntry {
            name: merchant_display_name(r),
            value: window_sum(r, &index.mdfg.weekly),
        })
        .collect();
    rank_desc(ranks, k)
}

/// Top lines of business by all-time MDFG.
pub fn top_lobs_by_mdfg(records: &[Record], index: &ColumnIndex, k: usize) -> Vec<RankEntry> {
    let grouped = group_sum(records.iter().map(|r| {
        (
            lob_name(r).to_string(),
            window_sum(r, &index.mdfg.weekly),
        )
    }));
    rank_desc(grouped, k)
}

/// Top lines of business by sales volume over the last four weeks.
pub fn top_lobs_by_sv(records: &[Record], index: &ColumnIndex, k: usize) -> Vec<RankEntry> {
    let window = index.sv.last_weeks(TREND_WEEKS);
    let grouped = group_sum(
        records
            .iter()
            .map(|r| (lob_name(r).to_string(), window_sum(r, window))),
    );
    rank_desc(grouped, k)
}

fn lob_name(record: &Record) -> &str {
    first_non_empty(
        &[text(record, field::LOB_DESC), text(record, field::LOB)],
        "-",
    )
}

// =============================================================================
// TESTS
// =============================================================================
