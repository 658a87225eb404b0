use crate::config::types::{
    CatalogConfig, Config, CrawlerConfig, FetchConfig, ServerConfig, StorageConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_fetch_config(&config.fetch)?;
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates the catalog location and page layout settings
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "root-url '{}' must use http or https",
            config.root_url
        )));
    }

    let prefix = &config.shard_path_prefix;
    if !prefix.starts_with('/') || !prefix.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "shard-path-prefix must start and end with '/', got '{}'",
            prefix
        )));
    }

    Selector::parse(&config.row_selector).map_err(|e| {
        ConfigError::Validation(format!(
            "row-selector '{}' is not a valid CSS selector: {:?}",
            config.row_selector, e
        ))
    })?;

    if config.field_delimiter.is_empty() {
        return Err(ConfigError::Validation(
            "field-delimiter cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch timeout and retry policy
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl batch settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-limit must be >= 1, got {}",
            config.batch_limit
        )));
    }

    if config.max_concurrent_shards < 1 || config.max_concurrent_shards > 32 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-shards must be between 1 and 32, got {}",
            config.max_concurrent_shards
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    Ok(())
}
