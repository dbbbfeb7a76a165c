//! Statistics over stored records and finished crawls
//!
//! This module provides functionality for extracting statistics from the
//! SQLite sink and for printing both those and an end-of-run summary.

use super::sqlite_output::{RunRecord, SqliteSink};
use super::traits::WriteResult;
use crate::crawler::CrawlSummary;

/// Statistics of the records stored in a database
#[derive(Debug, Clone)]
pub struct RecordStatistics {
    pub total_records: u64,
    pub in_stock: u64,
    pub on_sale: u64,

    /// Records per section, largest first
    pub by_section: Vec<(String, u64)>,

    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from the SQLite sink
pub fn load_statistics(sink: &SqliteSink) -> WriteResult<RecordStatistics> {
    Ok(RecordStatistics {
        total_records: sink.count_records()?,
        in_stock: sink.count_in_stock()?,
        on_sale: sink.count_on_sale()?,
        by_section: sink.records_by_section()?,
        latest_run: sink.latest_run()?,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RecordStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!(
        "  In stock: {} ({:.1}%)",
        stats.in_stock,
        percentage(stats.in_stock, stats.total_records)
    );
    println!(
        "  On sale: {} ({:.1}%)",
        stats.on_sale,
        percentage(stats.on_sale, stats.total_records)
    );
    println!();

    if !stats.by_section.is_empty() {
        println!("Records by Section:");
        for (section, count) in &stats.by_section {
            println!(
                "  {}: {} ({:.1}%)",
                section,
                count,
                percentage(*count, stats.total_records)
            );
        }
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Records written: {}", run.records_written);
        println!("  Failures: {}", run.failures);
        println!("  Config hash: {}", run.config_hash);
    }
}

/// Prints the summary of a finished crawl
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!(
        "Categories: {} ({} exhausted, {} failed, {} stopped)",
        summary.categories,
        summary.categories_exhausted,
        summary.categories_failed,
        summary.categories_stopped
    );
    println!("Listing pages fetched: {}", summary.pages_fetched);
    println!("Items discovered: {}", summary.items_discovered);
    if summary.duplicates_skipped > 0 {
        println!("Duplicates skipped: {}", summary.duplicates_skipped);
    }
    println!(
        "Records written: {} ({:.1}%)",
        summary.records_written,
        summary.success_rate()
    );
    if summary.cancelled > 0 {
        println!("Cancelled after stop: {}", summary.cancelled);
    }

    if !summary.failures.is_empty() {
        println!();
        println!("Failures:");
        for (kind, count) in &summary.failures {
            println!("  {}: {}", kind.as_str(), count);
        }
    }

    println!();
    println!("Duration: {:.1}s", summary.duration.as_secs_f64());
    if summary.stopped {
        println!("Crawl was stopped before completion");
    }
}
