//! Shard discovery: scans the catalog root for shard keys

use crate::crawler::fetcher::{fetch_with_retry, Page, PageFetcher};
use crate::crawler::parser::{extract_shard_links, ShardLink};
use crate::storage::{NewShard, Storage};
use crate::Result;
use std::sync::Arc;
use url::Url;

/// Counts from one discovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Distinct shard links found on the catalog root
    pub candidates: usize,

    /// Shards newly added to the store
    pub inserted: usize,

    /// Candidates whose key was already stored
    pub already_known: usize,
}

/// Finds shard keys on the catalog root and records the new ones
pub struct ShardDiscovery {
    fetcher: Arc<dyn PageFetcher>,
    root_url: Url,
    path_prefix: String,
}

impl ShardDiscovery {
    pub fn new(fetcher: Arc<dyn PageFetcher>, root_url: Url, path_prefix: impl Into<String>) -> Self {
        Self {
            fetcher,
            root_url,
            path_prefix: path_prefix.into(),
        }
    }

    /// Runs one discovery pass
    ///
    /// Fetches the catalog root (with retry), extracts shard links and
    /// inserts every key not yet stored in a single transaction. Running it
    /// again over an unchanged catalog inserts nothing.
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoveryReport)` - The pass completed
    /// * `Err(HarvestError::Fetch)` - The root could not be loaded; nothing was written
    /// * `Err(HarvestError::Storage)` - The store rejected the lookup or insert
    pub async fn discover(&self, storage: &mut dyn Storage) -> Result<DiscoveryReport> {
        let page = self.fetch_root().await?;
        self.record(storage, &page)
    }

    /// Loads the catalog root, retrying per the fetcher's policy
    pub async fn fetch_root(&self) -> Result<Page> {
        tracing::info!("Scanning catalog root {}", self.root_url);
        Ok(fetch_with_retry(self.fetcher.as_ref(), &self.root_url).await?)
    }

    /// Records the shard keys found on an already loaded catalog root
    pub fn record(&self, storage: &mut dyn Storage, page: &Page) -> Result<DiscoveryReport> {
        let links = self.scan(&page.body, &page.url);

        let mut report = DiscoveryReport {
            candidates: links.len(),
            ..Default::default()
        };

        let mut new_shards = Vec::new();
        for link in links {
            if storage.shard_exists(&link.key)? {
                report.already_known += 1;
                continue;
            }

            tracing::debug!("Found new shard key {} at {}", link.key, link.url);
            new_shards.push(NewShard {
                key: link.key,
                source_url: link.url.to_string(),
            });
        }

        report.inserted = storage.insert_shards(&new_shards)?;

        tracing::info!(
            "Discovery complete: {} candidates, {} new, {} already known",
            report.candidates,
            report.inserted,
            report.already_known
        );

        Ok(report)
    }

    fn scan(&self, body: &str, base_url: &Url) -> Vec<ShardLink> {
        let document = scraper::Html::parse_document(body);
        extract_shard_links(&document, base_url, &self.path_prefix)
    }
}
