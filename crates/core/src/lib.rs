//! Merchant acquisition analytics core.
//!
//! Ingests loosely-structured merchant portfolio exports (CSV) and product
//! target workbooks (CSV/XLS/XLSX), classifies their week-based column
//! layouts, and derives the aggregate statistics a reporting surface renders:
//! year-over-year comparisons, weekly trends, distributions, leaderboards,
//! and per-product KPI blocks.

pub mod columns;
pub mod dashboard;
pub mod error;
pub mod merchant_parser;
pub mod product_kpi;
pub mod product_parser;
pub mod record;
pub mod stats;

pub use columns::{ColumnIndex, Metric, MetricColumns, WeeklyColumn};
pub use dashboard::{
    filter_records, BranchOption, Dashboard, MerchantFilter, ProcessedProduct, ProductSlots,
    UploadedProductFile,
};
pub use error::{IngestError, Result};
pub use merchant_parser::{parse_merchant_csv, parse_merchant_file, ParsedMerchants};
pub use product_kpi::{available_months, month_series, product_kpi, MonthFilter, ProductKpi};
pub use product_parser::{parse_product_file, MONTH_ORDER};
pub use record::{normalize_header, Record, Value};
pub use stats::{aggregate, calc_growth, AggregateStats};
