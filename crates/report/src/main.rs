//! Report CLI - renders merchant portfolio statistics from a CSV export
//!
//! Responsibilities:
//! - Parse the merchant CSV and optional product files
//! - Apply branch/segment filters
//! - Print a sectioned text report or a JSON document

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tracker_core::dashboard::{Dashboard, MerchantFilter};
use tracker_core::product_kpi::{product_kpi, MonthFilter, ProductKpi};
use tracker_core::stats::{
    top_branches_by_trx, top_lobs_by_mdfg, top_lobs_by_sv, top_merchants_by_mdfg,
    top_merchants_by_sv, AggregateStats, Comparison,
};
use tracker_core::{parse_merchant_file, parse_product_file};

#[derive(Parser, Debug)]
#[command(name = "report", about = "Merchant acquisition portfolio report")]
struct Args {
    /// Merchant CSV export to analyze
    file: PathBuf,

    /// Restrict to one branch code (cd_cbg)
    #[arg(long)]
    branch: Option<String>,

    /// Restrict to one segment
    #[arg(long)]
    segment: Option<String>,

    /// Product file as name=path, repeatable
    #[arg(long)]
    product: Vec<String>,

    /// Leaderboard depth
    #[arg(long, default_value = "10")]
    top: usize,

    /// Emit the full report as JSON instead of text
    #[arg(long, default_value = "false")]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductReport {
    product_name: String,
    rows: usize,
    kpis: Vec<NamedKpi>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NamedKpi {
    name: String,
    kpi: ProductKpi,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    file: String,
    row_count: usize,
    filtered_count: usize,
    stats: &'a AggregateStats,
    products: Vec<ProductReport>,
}

fn parse_product_arg(raw: &str) -> Result<(String, PathBuf)> {
    let (name, path) = raw
        .split_once('=')
        .with_context(|| format!("invalid --product '{}': expected name=path", raw))?;
    Ok((name.to_string(), PathBuf::from(path)))
}

fn build_products(args: &Args) -> Result<Vec<ProductReport>> {
    let mut products = Vec::new();
    for raw in &args.product {
        let (name, path) = parse_product_arg(raw)?;
        let data = parse_product_file(&path)
            .with_context(|| format!("failed to parse product file {}", path.display()))?;
        let kpis = data
            .iter()
            .map(|record| NamedKpi {
                name: tracker_core::record::text(record, "Produk")
                    .unwrap_or("-")
                    .to_string(),
                kpi: product_kpi(record, &MonthFilter::All),
            })
            .collect();
        products.push(ProductReport {
            product_name: name,
            rows: data.len(),
            kpis,
        });
    }
    Ok(products)
}

fn print_comparison(label: &str, c: &Comparison) {
    println!(
        "  {:<10} {:>16.0} (prev {:>16.0}, {:>+7.1}%)",
        label, c.value, c.prev_value, c.growth
    );
}

fn print_report(args: &Args, dash: &Dashboard, products: &[ProductReport]) {
    let stats = dash.stats();

    println!("=== Merchant Portfolio Report ===");
    println!("File: {}", args.file.display());
    if let Some(branch) = &args.branch {
        println!("Branch filter: {}", branch);
    }
    if let Some(segment) = &args.segment {
        println!("Segment filter: {}", segment);
    }
    println!(
        "Merchants: {} ({} with EDC, {} without)",
        stats.total_merchants, stats.with_edc, stats.without_edc
    );
    println!("Total Trx YTD: {:.0}", stats.total_trx);
    println!("Total SV YTD:  {:.0}", stats.total_sv);

    println!("\nYear over year:");
    print_comparison("Merchants", &stats.comparison.merchants);
    print_comparison("Trx", &stats.comparison.trx);
    print_comparison("SV", &stats.comparison.sv);
    print_comparison("MDFG", &stats.comparison.mdfg);
    print_comparison("EDC", &stats.comparison.edc);

    println!("\nRecent weeks (Trx):");
    for point in &stats.trx_trend {
        println!("  {:<6} {:>16.0}", point.week, point.value);
    }

    println!("\nSegments:");
    for (segment, count) in &stats.segment_distribution {
        println!("  {:<24} {:>8}", segment, count);
    }

    let records = dash.filtered_merchants();
    let index = dash.column_index();

    println!("\nTop merchants by SV (last 4 weeks):");
    for entry in top_merchants_by_sv(records, index, args.top) {
        println!("  {:<16} {:<32} {:>16.0}", entry.mid, entry.name, entry.value);
    }

    println!("\nTop branches by Trx (last 4 weeks):");
    for entry in top_branches_by_trx(records, index, args.top) {
        println!("  {:<32} {:>16.0}", entry.name, entry.value);
    }

    println!("\nTop merchants by MDFG:");
    for entry in top_merchants_by_mdfg(records, index, args.top) {
        println!("  {:<32} {:>16.0}", entry.name, entry.value);
    }

    println!("\nTop LOBs by MDFG:");
    for entry in top_lobs_by_mdfg(records, index, args.top) {
        println!("  {:<32} {:>16.0}", entry.name, entry.value);
    }

    println!("\nTop LOBs by SV (last 4 weeks):");
    for entry in top_lobs_by_sv(records, index, args.top) {
        println!("  {:<32} {:>16.0}", entry.name, entry.value);
    }

    for product in products {
        println!("\n=== Product: {} ({} rows) ===", product.product_name, product.rows);
        for named in &product.kpis {
            println!(
                "  {:<24} target {:>14.0}  posisi {:>14.0}  {:>6.1}%",
                named.name, named.kpi.target, named.kpi.posisi, named.kpi.pencapaian
            );
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let parsed = parse_merchant_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    let row_count = parsed.row_count;

    let mut dash = Dashboard::new();
    dash.set_merchants(parsed.records);
    dash.set_filter(MerchantFilter {
        branch_code: args.branch.clone(),
        segment: args.segment.clone(),
    });

    let products = build_products(&args)?;

    if args.json {
        let report = Report {
            file: args.file.display().to_string(),
            row_count,
            filtered_count: dash.filtered_merchants().len(),
            stats: dash.stats(),
            products,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&args, &dash, &products);
    }

    Ok(())
}
