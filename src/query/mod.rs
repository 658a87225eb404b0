//! Paginated, sortable entity listing
//!
//! Input is never rejected: out-of-range page numbers and page sizes are
//! clamped, and unknown sort columns or directions fall back to defaults
//! before any SQL is built.

use crate::storage::{EntityView, Storage, StorageResult};
use serde::Serialize;
use std::fmt;

/// Page size used when none (or a non-positive one) is requested
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller can get
pub const MAX_PAGE_SIZE: u32 = 100;

/// Columns an entity listing can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortColumn {
    #[default]
    Id,
    Name,
    ActiveYears,
    Role,
    ExtraInfo,
    ShardKeyId,
    ProfileUrl,
    Key,
}

impl SortColumn {
    /// Resolves an API column name, or `None` if it is not whitelisted
    pub fn from_api_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "activeYears" => Some(Self::ActiveYears),
            "role" => Some(Self::Role),
            "extraInfo" => Some(Self::ExtraInfo),
            "shardKeyId" => Some(Self::ShardKeyId),
            "profileUrl" => Some(Self::ProfileUrl),
            "key" => Some(Self::Key),
            _ => None,
        }
    }

    /// Name used in the API and echoed back in pagination metadata
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::ActiveYears => "activeYears",
            Self::Role => "role",
            Self::ExtraInfo => "extraInfo",
            Self::ShardKeyId => "shardKeyId",
            Self::ProfileUrl => "profileUrl",
            Self::Key => "key",
        }
    }

    /// Qualified column in the `entities e JOIN shard_keys s` query
    pub fn sql_expr(&self) -> &'static str {
        match self {
            Self::Id => "e.id",
            Self::Name => "e.name",
            Self::ActiveYears => "e.active_years",
            Self::Role => "e.role",
            Self::ExtraInfo => "e.extra_info",
            Self::ShardKeyId => "e.shard_key_id",
            Self::ProfileUrl => "e.profile_url",
            Self::Key => "s.key",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `"desc"` in any case means descending; everything else ascending
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// A normalized listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort_column: SortColumn,
    pub sort_order: SortOrder,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_column: SortColumn::Id,
            sort_order: SortOrder::Asc,
        }
    }
}

impl ListRequest {
    /// Builds a request from raw caller values, clamping instead of failing
    ///
    /// | Input | Result |
    /// |-------|--------|
    /// | `page < 1` or missing | 1 |
    /// | `page_size < 1` or missing | 10 |
    /// | `page_size > 100` | 100 |
    /// | unknown or missing `sort_column` | `id` |
    /// | `sort_order` other than `desc` (any case) | ascending |
    pub fn normalize(
        page: Option<i64>,
        page_size: Option<i64>,
        sort_column: Option<&str>,
        sort_order: Option<&str>,
    ) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p.min(u32::MAX as i64) as u32,
            _ => 1,
        };

        let page_size = match page_size {
            Some(s) if s > MAX_PAGE_SIZE as i64 => MAX_PAGE_SIZE,
            Some(s) if s >= 1 => s as u32,
            _ => DEFAULT_PAGE_SIZE,
        };

        let sort_column = sort_column
            .and_then(SortColumn::from_api_name)
            .unwrap_or_default();

        let sort_order = sort_order
            .map(SortOrder::parse_lenient)
            .unwrap_or_default();

        Self {
            page,
            page_size,
            sort_column,
            sort_order,
        }
    }

    /// Same as [`normalize`](Self::normalize) for string inputs, as they
    /// arrive in a query string; unparsable numbers count as missing
    pub fn from_raw(
        page: Option<&str>,
        page_size: Option<&str>,
        sort_column: Option<&str>,
        sort_order: Option<&str>,
    ) -> Self {
        let number = |value: Option<&str>| value.and_then(|v| v.trim().parse::<i64>().ok());
        Self::normalize(number(page), number(page_size), sort_column, sort_order)
    }

    /// Rows skipped before this page starts
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

/// One page of entities plus the metadata needed to page through the rest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPage {
    pub entities: Vec<EntityView>,
    pub request: ListRequest,
    pub total_records: u64,
}

impl EntityPage {
    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_records, self.request.page_size)
    }

    /// Pagination metadata in the shape the HTTP API returns
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.request.page,
            page_size: self.request.page_size,
            total_records: self.total_records,
            total_pages: self.total_pages(),
            sort_column: self.request.sort_column.api_name(),
            sort_order: self.request.sort_order.api_name(),
        }
    }
}

/// Pagination metadata as serialized by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub total_pages: u64,
    pub sort_column: &'static str,
    pub sort_order: &'static str,
}

/// `ceil(total_records / page_size)`
pub fn total_pages(total_records: u64, page_size: u32) -> u64 {
    let page_size = page_size.max(1) as u64;
    total_records.div_ceil(page_size)
}

/// Fetches one page of entities joined with their shard keys
///
/// `total_records` counts every entity, independent of the page window.
pub fn list_entities(storage: &dyn Storage, request: ListRequest) -> StorageResult<EntityPage> {
    let total_records = storage.count_entities()?;
    let entities = storage.list_entities(
        request.sort_column,
        request.sort_order,
        request.page_size,
        request.offset(),
    )?;

    tracing::debug!(
        "Retrieved {} entities (page {}, size {}, sort {} {})",
        entities.len(),
        request.page,
        request.page_size,
        request.sort_column,
        request.sort_order
    );

    Ok(EntityPage {
        entities,
        request,
        total_records,
    })
}
