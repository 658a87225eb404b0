//! Crawler module for catalog discovery and shard harvesting
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with a bounded retry policy
//! - HTML parsing of the catalog root and shard listings
//! - Shard discovery
//! - Batch crawl coordination

mod coordinator;
mod discovery;
mod fetcher;
mod parser;

pub use coordinator::{CrawlReport, EntityCrawler};
pub use discovery::{DiscoveryReport, ShardDiscovery};
pub use fetcher::{build_http_client, fetch_with_retry, HttpFetcher, Page, PageFetcher, RetryPolicy};
pub use parser::{
    extract_shard_links, is_shard_label, resolve_link, ParsedListing, RowParser, ShardLink,
};

use crate::config::Config;
use crate::storage::Storage;
use crate::Result;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use url::Url;

/// Builds shard discovery from the catalog configuration
pub fn discovery_from_config(
    config: &Config,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<ShardDiscovery> {
    let root_url = Url::parse(&config.catalog.root_url)?;
    Ok(ShardDiscovery::new(
        fetcher,
        root_url,
        config.catalog.shard_path_prefix.clone(),
    ))
}

/// Builds an entity crawler from the configuration
pub fn crawler_from_config<S: Storage + 'static>(
    config: &Config,
    storage: Arc<Mutex<S>>,
    fetcher: Arc<dyn PageFetcher>,
    shutdown: Arc<AtomicBool>,
) -> Result<EntityCrawler<S>> {
    let parser = RowParser::from_config(&config.catalog)?;
    Ok(EntityCrawler::new(storage, fetcher, parser, &config.crawler).with_shutdown(shutdown))
}

/// Runs a discovery pass followed by one crawl batch
///
/// The crawl is skipped when discovery fails.
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `storage` - The shared store handle
/// * `fetcher` - Loads the catalog root and shard listings
/// * `batch_limit` - Maximum shards crawled in the batch
/// * `shutdown` - Set to stop before the next shard starts
pub async fn harvest<S: Storage + 'static>(
    config: &Config,
    storage: Arc<Mutex<S>>,
    fetcher: Arc<dyn PageFetcher>,
    batch_limit: u32,
    shutdown: Arc<AtomicBool>,
) -> Result<(DiscoveryReport, CrawlReport)> {
    let discovery = discovery_from_config(config, Arc::clone(&fetcher))?;

    let page = discovery.fetch_root().await?;
    let discovered = {
        let mut guard = crate::storage::lock(&storage)?;
        discovery.record(&mut *guard, &page)?
    };

    let crawler = crawler_from_config(config, storage, fetcher, shutdown)?;
    let crawled = crawler.crawl(batch_limit).await?;

    Ok((discovered, crawled))
}
