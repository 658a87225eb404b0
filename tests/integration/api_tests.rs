//! Integration tests for the query API
//!
//! These tests drive the axum router directly with `tower::ServiceExt`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use roster_harvest::server::{create_router, AppState};
use roster_harvest::storage::{NewEntity, NewShard, SqliteStorage, Storage};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Seeds `per_shard` entities into each of the given shards
fn seeded_storage(dir: &TempDir, shards: &[(&str, usize)]) -> SqliteStorage {
    let mut storage = SqliteStorage::new(&dir.path().join("api.db")).unwrap();

    let new_shards: Vec<NewShard> = shards
        .iter()
        .map(|(key, _)| NewShard {
            key: key.to_string(),
            source_url: format!("https://example.com/en/players/{}/", key.to_lowercase()),
        })
        .collect();
    storage.insert_shards(&new_shards).unwrap();

    let mut counter = 0;
    for (key, count) in shards {
        let shard = storage.get_shard_by_key(key).unwrap().unwrap();
        let entities: Vec<NewEntity> = (0..*count)
            .map(|_| {
                counter += 1;
                NewEntity {
                    name: format!("Player {:02}", counter),
                    active_years: format!("{}-{}", 1990 + counter, 2000 + counter),
                    role: if counter % 2 == 0 { "DF" } else { "FW" }.to_string(),
                    extra_info: String::new(),
                    profile_url: format!("https://example.com/p/{}", counter),
                }
            })
            .collect();
        if !entities.is_empty() {
            storage.commit_shard(shard.id, &entities).unwrap();
        }
    }

    storage
}

fn setup_test_app(shards: &[(&str, usize)]) -> (axum::Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage = seeded_storage(&dir, shards);
    (create_router(AppState::new(storage)), dir)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn ids(json: &Value) -> Vec<i64> {
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_root_message() {
    let (app, _dir) = setup_test_app(&[]);

    let (status, json) = get_json(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Roster harvest API is running");
}

#[tokio::test]
async fn test_entities_second_page() {
    let (app, _dir) = setup_test_app(&[("Aa", 25)]);

    let (status, json) = get_json(app, "/entities?page=2&pageSize=10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], true);
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Entities retrieved successfully");
    assert_eq!(ids(&json), (11..=20).collect::<Vec<i64>>());

    let pagination = &json["pagination"];
    assert_eq!(pagination["page"], 2);
    assert_eq!(pagination["pageSize"], 10);
    assert_eq!(pagination["totalRecords"], 25);
    assert_eq!(pagination["totalPages"], 3);
    assert_eq!(pagination["sortColumn"], "id");
    assert_eq!(pagination["sortOrder"], "asc");
}

#[tokio::test]
async fn test_entity_rows_carry_shard_key() {
    let (app, _dir) = setup_test_app(&[("Aa", 1), ("Ab", 1)]);

    let (_, json) = get_json(app, "/entities").await;

    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Player 01");
    assert_eq!(rows[0]["key"], "Aa");
    assert_eq!(rows[1]["key"], "Ab");
    assert_eq!(rows[0]["activeYears"], "1991-2001");
    assert_eq!(rows[0]["profileUrl"], "https://example.com/p/1");
    assert!(rows[0]["shardKeyId"].is_i64());
    assert_eq!(rows[0]["extraInfo"], "");
}

#[tokio::test]
async fn test_invalid_parameters_are_clamped() {
    let (app, _dir) = setup_test_app(&[("Aa", 3)]);

    let (status, json) = get_json(
        app,
        "/entities?page=-4&pageSize=abc&sortColumn=password&sortOrder=sideways",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let pagination = &json["pagination"];
    assert_eq!(pagination["page"], 1);
    assert_eq!(pagination["pageSize"], 10);
    assert_eq!(pagination["sortColumn"], "id");
    assert_eq!(pagination["sortOrder"], "asc");
    assert_eq!(ids(&json), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_page_size_is_capped() {
    let (app, _dir) = setup_test_app(&[("Aa", 3)]);

    let (_, json) = get_json(app, "/entities?pageSize=1000").await;

    assert_eq!(json["pagination"]["pageSize"], 100);
    assert_eq!(json["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn test_sort_descending_with_stable_tie_break() {
    let (app, _dir) = setup_test_app(&[("Aa", 4)]);

    let (_, json) = get_json(app, "/entities?sortColumn=role&sortOrder=DESC").await;

    // FW rows (odd ids) sort before DF rows; equal roles fall back to id order
    assert_eq!(ids(&json), vec![1, 3, 2, 4]);
    assert_eq!(json["pagination"]["sortColumn"], "role");
    assert_eq!(json["pagination"]["sortOrder"], "desc");
}

#[tokio::test]
async fn test_page_past_end_is_empty() {
    let (app, _dir) = setup_test_app(&[("Aa", 5)]);

    let (status, json) = get_json(app, "/entities?page=9&pageSize=5").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());
    assert_eq!(json["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn test_no_entities() {
    let (app, _dir) = setup_test_app(&[]);

    let (_, json) = get_json(app, "/entities").await;

    assert!(json["data"].as_array().unwrap().is_empty());
    assert_eq!(json["pagination"]["totalRecords"], 0);
    assert_eq!(json["pagination"]["totalPages"], 0);
}

#[tokio::test]
async fn test_shard_keys() {
    let (app, _dir) = setup_test_app(&[("Aa", 2), ("Ab", 0)]);

    let (status, json) = get_json(app, "/shard-keys").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], true);
    assert_eq!(json["status"], "success");

    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["key"], "Aa");
    assert_eq!(rows[0]["processed"], true);
    assert_eq!(rows[0]["sourceUrl"], "https://example.com/en/players/aa/");
    assert_eq!(rows[1]["processed"], false);
    assert!(rows[1]["discoveredAt"].is_string());
}

#[tokio::test]
async fn test_storage_failure_returns_error_envelope() {
    let dir = TempDir::new().unwrap();
    let storage = seeded_storage(&dir, &[("Aa", 2)]);

    let conn = rusqlite::Connection::open(dir.path().join("api.db")).unwrap();
    conn.execute_batch("DROP TABLE entities;").unwrap();

    let app = create_router(AppState::new(storage));
    let (status, json) = get_json(app, "/entities").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["result"], false);
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("entities"));
}
