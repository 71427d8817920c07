//! Dashboard state: the owning context for merchant records and product
//! file slots.
//!
//! Every mutation replaces the derived statistics wholesale; nothing is
//! patched incrementally, so a reader always sees a consistent snapshot.

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::columns::ColumnIndex;
use crate::error::Result;
use crate::product_parser::parse_product_file;
use crate::record::{field, text, Record};
use crate::stats::{aggregate, AggregateStats};

// =============================================================================
// MERCHANT SIDE
// =============================================================================

/// Record-set restriction applied upstream of aggregation. `None` means
/// "all" for either dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MerchantFilter {
    /// Exact branch code match.
    pub branch_code: Option<String>,
    /// Exact segment match.
    pub segment: Option<String>,
}

impl MerchantFilter {
    /// Records with a blank or `"0"` branch code are excluded outright; they
    /// carry no usable branch assignment.
    pub fn matches(&self, record: &Record) -> bool {
        let code = text(record, field::BRANCH_CODE).map(str::trim).unwrap_or("");
        if code.is_empty() || code == "0" {
            return false;
        }
        if let Some(want) = &self.branch_code {
            if code != want {
                return false;
            }
        }
        if let Some(want) = &self.segment {
            if text(record, field::SEGMENT).unwrap_or("") != want {
                return false;
            }
        }
        true
    }
}

pub fn filter_records(records: &[Record], filter: &MerchantFilter) -> Vec<Record> {
    records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect()
}

/// A selectable branch: code plus human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchOption {
    pub code: String,
    pub label: String,
}

/// Owns the merchant record set and its derived statistics. The statistics
/// object is rebuilt from scratch on every change to the records or the
/// active filter.
#[derive(Debug, Default)]
pub struct Dashboard {
    merchants: Vec<Record>,
    filter: MerchantFilter,
    filtered: Vec<Record>,
    index: ColumnIndex,
    stats: AggregateStats,
}

impl Dashboard {
    pub fn new() -> Dashboard {
        Dashboard::default()
    }

    pub fn set_merchants(&mut self, merchants: Vec<Record>) {
        self.merchants = merchants;
        self.recompute();
    }

    pub fn clear(&mut self) {
        self.merchants.clear();
        self.recompute();
    }

    pub fn set_filter(&mut self, filter: MerchantFilter) {
        self.filter = filter;
        self.recompute();
    }

    pub fn merchants(&self) -> &[Record] {
        &self.merchants
    }

    pub fn filtered_merchants(&self) -> &[Record] {
        &self.filtered
    }

    pub fn filter(&self) -> &MerchantFilter {
        &self.filter
    }

    pub fn column_index(&self) -> &ColumnIndex {
        &self.index
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Unique branch options across the full (unfiltered) record set, sorted
    /// by label; the label falls back to the code when no branch name exists.
    pub fn branch_options(&self) -> Vec<BranchOption> {
        let mut options: Vec<BranchOption> = Vec::new();
        for record in &self.merchants {
            let code = text(record, field::BRANCH_CODE)
                .map(str::trim)
                .unwrap_or("");
            if code.is_empty() || code == "0" {
                continue;
            }
            if options.iter().any(|o| o.code == code) {
                continue;
            }
            let name = text(record, field::BRANCH_NAME).map(str::trim).unwrap_or("");
            options.push(BranchOption {
                code: code.to_string(),
                label: if name.is_empty() { code } else { name }.to_string(),
            });
        }
        options.sort_by(|a, b| a.label.cmp(&b.label));
        options
    }

    /// Unique non-empty segments across the full record set, sorted.
    pub fn segment_options(&self) -> Vec<String> {
        let mut segments: Vec<String> = Vec::new();
        for record in &self.merchants {
            let Some(segment) = text(record, field::SEGMENT).map(str::trim) else {
                continue;
            };
            if segment.is_empty() || segments.iter().any(|s| s == segment) {
                continue;
            }
            segments.push(segment.to_string());
        }
        segments.sort();
        segments
    }

    fn recompute(&mut self) {
        self.filtered = filter_records(&self.merchants, &self.filter);
        self.index = ColumnIndex::from_records(&self.filtered);
        self.stats = aggregate(&self.filtered, &self.index);
        debug!(
            total = self.merchants.len(),
            filtered = self.filtered.len(),
            "rebuilt dashboard statistics"
        );
    }
}

// =============================================================================
// PRODUCT SIDE
// =============================================================================

/// One dataset slot a user added: a name and an optionally attached file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedProductFile {
    pub id: u64,
    pub product_name: String,
    pub file: Option<PathBuf>,
}

/// The parsed output of one product file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedProduct {
    pub product_name: String,
    pub data: Vec<Record>,
}

/// Collection of product dataset slots.
#[derive(Debug, Default)]
pub struct ProductSlots {
    slots: Vec<UploadedProductFile>,
    next_id: u64,
}

impl ProductSlots {
    pub fn new() -> ProductSlots {
        ProductSlots::default()
    }

    /// Add an empty slot and return its id. Ids are unique per collection
    /// and never reused.
    pub fn add_slot(&mut self) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.slots.push(UploadedProductFile {
            id,
            product_name: String::new(),
            file: None,
        });
        id
    }

    pub fn remove(&mut self, id: u64) {
        self.slots.retain(|s| s.id != id);
    }

    pub fn set_name(&mut self, id: u64, name: &str) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.product_name = name.to_string();
        }
    }

    pub fn attach_file(&mut self, id: u64, file: PathBuf) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.file = Some(file);
        }
    }

    pub fn slots(&self) -> &[UploadedProductFile] {
        &self.slots
    }

    /// Run the product pipeline over every complete slot, strictly
    /// sequentially. Slots without both a name and a file are skipped; the
    /// first failure aborts the whole batch so the caller gets one combined
    /// failure channel.
    pub fn process(&self) -> Result<Vec<ProcessedProduct>> {
        let mut results = Vec::new();
        for slot in &self.slots {
            let Some(file) = &slot.file else { continue };
            if slot.product_name.is_empty() {
                continue;
            }
            debug!(product = %slot.product_name, "processing product file");
            let data = parse_product_file(file)?;
            results.push(ProcessedProduct {
                product_name: slot.product_name.clone(),
                data,
            });
        }
        Ok(results)
    }
}

// =============================================================================
// TESTS
// =============================================================================
