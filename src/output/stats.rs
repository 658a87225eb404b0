//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{ShardRecord, Storage};
use crate::Result;

/// How many of the newest shards the summary lists
pub const LATEST_SHARD_COUNT: u32 = 5;

/// Harvest statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestStatistics {
    /// Total number of shards discovered
    pub total_shards: u64,

    /// Shards whose listing has been committed
    pub processed_shards: u64,

    /// Shards still waiting for a successful crawl
    pub pending_shards: u64,

    /// Total number of entity rows
    pub total_entities: u64,

    /// The most recently discovered shards, newest first
    pub latest_shards: Vec<ShardRecord>,
}

impl HarvestStatistics {
    /// Percentage of shards committed, 0 when nothing was discovered
    pub fn completion_rate(&self) -> f64 {
        if self.total_shards == 0 {
            0.0
        } else {
            (self.processed_shards as f64 / self.total_shards as f64) * 100.0
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics> {
    Ok(HarvestStatistics {
        total_shards: storage.count_shards()?,
        processed_shards: storage.count_shards_by_status(true)?,
        pending_shards: storage.count_shards_by_status(false)?,
        total_entities: storage.count_entities()?,
        latest_shards: storage.latest_shards(LATEST_SHARD_COUNT)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Shards:");
    println!("  Total discovered: {}", stats.total_shards);
    println!("  Processed: {}", stats.processed_shards);
    println!("  Pending: {}", stats.pending_shards);
    println!();

    println!("Entities:");
    println!("  Total rows: {}", stats.total_entities);
    println!();

    if !stats.latest_shards.is_empty() {
        println!("Latest Shards ({}):", stats.latest_shards.len());
        for shard in &stats.latest_shards {
            let status = if shard.processed { "processed" } else { "pending" };
            println!("  - {} [{}] {}", shard.key, status, shard.source_url);
        }
        println!();
    }

    println!(
        "Completion: {:.1}% ({} / {} shards processed)",
        stats.completion_rate(),
        stats.processed_shards,
        stats.total_shards
    );
}
