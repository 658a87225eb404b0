//! Roster Harvest: a resumable roster scraper
//!
//! This crate discovers the shard keys (two-letter index pages) of a remote
//! player catalog, crawls each shard's listing into SQLite with at-most-once
//! commits, and serves the collected rows through a paginated query API.

pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod server;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Roster Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid shard transition for shard {shard_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        shard_id: i64,
        from: state::ShardState,
        to: state::ShardState,
    },

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while loading a remote page
///
/// Every variant is recoverable: callers retry according to their
/// [`RetryPolicy`](crawler::RetryPolicy) and eventually skip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Rate limited by {url}")]
    RateLimited { url: String },
}

/// Reasons a single listing row is rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("row has no text")]
    EmptyRow,

    #[error("row has no profile link")]
    MissingLink,

    #[error("row has {found} fields, expected at least 3")]
    TooFewFields { found: usize },

    #[error("row link '{0}' cannot be resolved")]
    InvalidLink(String),
}

/// Result type alias for Roster Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, DiscoveryReport, EntityCrawler, ShardDiscovery};
pub use query::{EntityPage, ListRequest};
pub use state::ShardState;
pub use storage::{SqliteStorage, Storage};
