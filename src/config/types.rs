use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Roster Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the remote catalog lives and how its pages are laid out
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Catalog root page listing every shard link
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Path prefix a shard listing URL must start with
    #[serde(rename = "shard-path-prefix", default = "default_shard_path_prefix")]
    pub shard_path_prefix: String,

    /// CSS selector matching one entity row on a shard listing
    #[serde(rename = "row-selector", default = "default_row_selector")]
    pub row_selector: String,

    /// Separator between the fields of a row's text
    #[serde(rename = "field-delimiter", default = "default_field_delimiter")]
    pub field_delimiter: String,
}

/// Remote page loading: timeout and retry policy
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per page before giving up, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "backoff-ms", default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Crawl batch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of unprocessed shards selected per batch
    #[serde(rename = "batch-limit", default = "default_batch_limit")]
    pub batch_limit: u32,

    /// Shards fetched concurrently within a batch
    #[serde(rename = "max-concurrent-shards", default = "default_max_concurrent_shards")]
    pub max_concurrent_shards: u32,

    /// Commit retries when the database reports it is busy
    #[serde(rename = "busy-retries", default = "default_busy_retries")]
    pub busy_retries: u32,

    /// Delay between busy retries (milliseconds)
    #[serde(rename = "busy-delay-ms", default = "default_busy_delay_ms")]
    pub busy_delay_ms: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// HTTP API bind address
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl CrawlerConfig {
    pub fn busy_delay(&self) -> Duration {
        Duration::from_millis(self.busy_delay_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            max_concurrent_shards: default_max_concurrent_shards(),
            busy_retries: default_busy_retries(),
            busy_delay_ms: default_busy_delay_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_shard_path_prefix() -> String {
    "/en/players/".to_string()
}

fn default_row_selector() -> String {
    ".section_content p".to_string()
}

fn default_field_delimiter() -> String {
    "·".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    format!("roster-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_batch_limit() -> u32 {
    100
}

fn default_max_concurrent_shards() -> u32 {
    1
}

fn default_busy_retries() -> u32 {
    3
}

fn default_busy_delay_ms() -> u64 {
    5_000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}
