//! HTTP request handlers for the web server.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::query::{self, ListRequest};
use crate::storage::{self, Storage, StorageError};

/// Raw listing parameters; numbers stay strings so bad input is clamped, not rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort_column: Option<String>,
    pub sort_order: Option<String>,
}

impl EntityListParams {
    fn to_request(&self) -> ListRequest {
        ListRequest::from_raw(
            self.page.as_deref(),
            self.page_size.as_deref(),
            self.sort_column.as_deref(),
            self.sort_order.as_deref(),
        )
    }
}

/// Liveness message.
pub async fn index() -> impl IntoResponse {
    Json(json!({ "message": "Roster harvest API is running" }))
}

/// One page of entities with pagination metadata.
pub async fn list_entities(
    State(state): State<AppState>,
    Query(params): Query<EntityListParams>,
) -> Response {
    let request = params.to_request();

    let page = with_storage(&state, move |storage| {
        query::list_entities(storage, request)
    })
    .await;

    match page {
        Ok(page) => (
            StatusCode::OK,
            Json(json!({
                "result": true,
                "data": page.entities,
                "pagination": page.pagination(),
                "status": "success",
                "message": "Entities retrieved successfully",
            })),
        )
            .into_response(),
        Err(message) => error_response(message),
    }
}

/// Every shard key with its processed flag.
pub async fn list_shard_keys(State(state): State<AppState>) -> Response {
    match with_storage(&state, |storage| storage.list_shards()).await {
        Ok(shards) => (
            StatusCode::OK,
            Json(json!({
                "result": true,
                "data": shards,
                "status": "success",
            })),
        )
            .into_response(),
        Err(message) => error_response(message),
    }
}

/// Runs a store query on the blocking pool.
async fn with_storage<T, F>(state: &AppState, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&dyn Storage) -> Result<T, StorageError> + Send + 'static,
{
    let handle = state.storage.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let storage = storage::lock(&handle)?;
        f(&*storage)
    })
    .await;

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!("Query failed: {}", e);
            Err(e.to_string())
        }
        Err(e) => {
            tracing::error!("Query task failed: {}", e);
            Err(e.to_string())
        }
    }
}

fn error_response(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "result": false,
            "status": "error",
            "message": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_clamp_instead_of_failing() {
        let params = EntityListParams {
            page: Some("abc".to_string()),
            page_size: Some("500".to_string()),
            sort_column: Some("password".to_string()),
            sort_order: Some("DESC".to_string()),
        };
        let request = params.to_request();

        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 100);
        assert_eq!(request.sort_column, query::SortColumn::Id);
        assert_eq!(request.sort_order, query::SortOrder::Desc);
    }

    #[test]
    fn test_missing_params_use_defaults() {
        let request = EntityListParams::default().to_request();
        assert_eq!(request, ListRequest::default());
    }
}
