//! HTML parser for catalog and shard listing pages
//!
//! This module handles parsing HTML content to extract:
//! - Shard links (two-letter index labels) from the catalog root
//! - Entity rows from a shard listing page

use crate::config::CatalogConfig;
use crate::storage::NewEntity;
use crate::{ConfigError, ParseError};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A shard link found on the catalog root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLink {
    /// The two-letter label, e.g. `"Ab"`
    pub key: String,

    /// Absolute URL of the shard listing
    pub url: Url,
}

/// Returns true for a two-letter shard label: uppercase then lowercase
pub fn is_shard_label(label: &str) -> bool {
    let mut chars = label.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(first), Some(second), None)
            if first.is_alphabetic() && first.is_uppercase()
                && second.is_alphabetic() && second.is_lowercase()
    )
}

/// Extracts shard links from the catalog root document
///
/// # Link Selection Rules
///
/// **Include** an `<a href="...">` when:
/// - its trimmed visible text is a shard label (see [`is_shard_label`])
/// - the resolved URL path starts with `path_prefix`, is longer than it,
///   and ends with `/`
///
/// **Deduplicate:** when several links carry the same label, the first one
/// in document order wins.
pub fn extract_shard_links(document: &Html, base_url: &Url, path_prefix: &str) -> Vec<ShardLink> {
    let mut links: Vec<ShardLink> = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        let label = element.text().collect::<String>();
        let label = label.trim();
        if !is_shard_label(label) {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, base_url) else {
            continue;
        };

        let path = url.path();
        if !(path.starts_with(path_prefix) && path.len() > path_prefix.len() && path.ends_with('/'))
        {
            continue;
        }

        if links.iter().any(|link| link.key == label) {
            tracing::debug!("Ignoring duplicate shard link {} -> {}", label, url);
            continue;
        }

        links.push(ShardLink {
            key: label.to_string(),
            url,
        });
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}

/// Rows extracted from one shard listing
#[derive(Debug, Clone, Default)]
pub struct ParsedListing {
    /// Accepted rows, in document order
    pub entities: Vec<NewEntity>,

    /// Why each skipped row was rejected
    pub rejected: Vec<ParseError>,
}

/// Turns shard listing pages into entity rows
#[derive(Debug, Clone)]
pub struct RowParser {
    row_selector: Selector,
    link_selector: Selector,
    delimiter: String,
}

impl RowParser {
    /// Creates a parser for rows matching `row_selector`, split on `delimiter`
    pub fn new(row_selector: &str, delimiter: &str) -> Result<Self, ConfigError> {
        let row_selector = Selector::parse(row_selector).map_err(|e| {
            ConfigError::Validation(format!("Invalid row selector '{}': {}", row_selector, e))
        })?;
        let link_selector = Selector::parse("a[href]")
            .map_err(|e| ConfigError::Validation(format!("Invalid link selector: {}", e)))?;

        if delimiter.is_empty() {
            return Err(ConfigError::Validation(
                "Field delimiter cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            row_selector,
            link_selector,
            delimiter: delimiter.to_string(),
        })
    }

    /// Creates a parser from the catalog section of the configuration
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        Self::new(&config.row_selector, &config.field_delimiter)
    }

    /// Parses every row of a listing document
    ///
    /// Rejected rows are collected rather than failing the listing.
    pub fn parse_listing(&self, document: &Html, base_url: &Url) -> ParsedListing {
        let mut listing = ParsedListing::default();

        for row in document.select(&self.row_selector) {
            match self.parse_row(row, base_url) {
                Ok(entity) => listing.entities.push(entity),
                Err(e) => {
                    tracing::debug!("Skipping row on {}: {}", base_url, e);
                    listing.rejected.push(e);
                }
            }
        }

        listing
    }

    fn parse_row(&self, row: ElementRef<'_>, base_url: &Url) -> Result<NewEntity, ParseError> {
        let text = row.text().collect::<String>();
        let fields = self.split_fields(&text)?;

        let href = row
            .select(&self.link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or(ParseError::MissingLink)?;
        let profile_url = resolve_link(href, base_url)
            .ok_or_else(|| ParseError::InvalidLink(href.to_string()))?;

        let mut fields = fields.into_iter();
        let name = fields.next().unwrap_or_default();
        let active_years = fields.next().unwrap_or_default();
        let role = fields.next().unwrap_or_default();
        let extra_info = fields.collect::<Vec<_>>().join(" ");

        Ok(NewEntity {
            name,
            active_years,
            role,
            extra_info,
            profile_url: profile_url.to_string(),
        })
    }

    /// Splits row text into trimmed, whitespace-collapsed fields
    fn split_fields(&self, text: &str) -> Result<Vec<String>, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::EmptyRow);
        }

        let fields: Vec<String> = text
            .split(self.delimiter.as_str())
            .map(|field| field.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();

        if fields.len() < 3 {
            return Err(ParseError::TooFewFields {
                found: fields.len(),
            });
        }

        Ok(fields)
    }
}
