//! Output module for harvest summaries
//!
//! This module handles:
//! - Loading shard and entity statistics from storage
//! - Printing statistics and run reports to the terminal

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics, LATEST_SHARD_COUNT};

use crate::crawler::{CrawlReport, DiscoveryReport};
use crate::storage::ResetReport;

/// Prints the outcome of a discovery pass
pub fn print_discovery_report(report: &DiscoveryReport) {
    println!("=== Discovery ===");
    println!("  Candidates found: {}", report.candidates);
    println!("  New shards: {}", report.inserted);
    println!("  Already known: {}", report.already_known);
}

/// Prints the outcome of a crawl batch
pub fn print_crawl_report(report: &CrawlReport) {
    println!("=== Crawl Batch ===");
    println!("  Shards selected: {}", report.selected);
    println!(
        "  Committed: {} ({} entities)",
        report.committed, report.entities_written
    );
    println!("  Empty listings: {}", report.empty);
    println!("  Failed: {}", report.failed);
    println!("  Already processed: {}", report.already_processed);
    if report.interrupted {
        println!("  Interrupted before all shards started");
    }
}

/// Prints the outcome of a maintenance reset
pub fn print_reset_report(report: &ResetReport) {
    println!("=== Reset ===");
    println!("  Shards marked unprocessed: {}", report.shards_reset);
    println!("  Entities deleted: {}", report.entities_deleted);
}
