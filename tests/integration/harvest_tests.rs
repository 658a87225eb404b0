//! Integration tests for discovery and crawling
//!
//! These tests use wiremock to serve a fake catalog and test the full
//! discover-then-crawl cycle end-to-end against a SQLite file.

use roster_harvest::config::{parse_config, Config};
use roster_harvest::crawler::{self, HttpFetcher, PageFetcher};
use roster_harvest::storage::{SqliteStorage, Storage};
use roster_harvest::{FetchError, HarvestError};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock catalog
fn create_test_config(server: &MockServer, db_path: &str) -> Config {
    let toml = format!(
        r#"
        [catalog]
        root-url = "{}/players/"
        shard-path-prefix = "/players/"

        [fetch]
        timeout-ms = 2000
        max-attempts = 3
        backoff-ms = 0
        user-agent = "TestBot/1.0"

        [crawler]
        batch-limit = 100
        busy-retries = 1
        busy-delay-ms = 0

        [storage]
        database-path = "{}"
        "#,
        server.uri(),
        db_path
    );
    parse_config(&toml).expect("test config should be valid")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn listing(rows: &[&str]) -> ResponseTemplate {
    let rows: String = rows.iter().map(|row| format!("<p>{}</p>", row)).collect();
    html(&format!(r#"<div class="section_content">{}</div>"#, rows))
}

async fn mount_root(server: &MockServer, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|key| format!(r#"<a href="/players/{}/">{}</a>"#, key.to_lowercase(), key))
        .collect();
    Mock::given(method("GET"))
        .and(path("/players/"))
        .respond_with(html(&anchors))
        .mount(server)
        .await;
}

struct Harness {
    _dir: TempDir,
    config: Config,
    storage: Arc<Mutex<SqliteStorage>>,
    fetcher: Arc<dyn PageFetcher>,
}

impl Harness {
    fn new(server: &MockServer) -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("harvest.db");
        let config = create_test_config(server, db_path.to_str().unwrap());
        let storage = SqliteStorage::new(&db_path).unwrap();
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.fetch).unwrap());

        Self {
            _dir: dir,
            config,
            storage: Arc::new(Mutex::new(storage)),
            fetcher,
        }
    }

    async fn discover(&self) -> roster_harvest::Result<roster_harvest::DiscoveryReport> {
        let discovery = crawler::discovery_from_config(&self.config, self.fetcher.clone())?;
        let page = discovery.fetch_root().await?;
        let mut storage = self.storage.lock().unwrap();
        discovery.record(&mut *storage, &page)
    }

    async fn crawl(&self) -> roster_harvest::CrawlReport {
        crawler::crawler_from_config(
            &self.config,
            self.storage.clone(),
            self.fetcher.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap()
        .crawl(self.config.crawler.batch_limit)
        .await
        .unwrap()
    }

    fn shard(&self, key: &str) -> roster_harvest::storage::ShardRecord {
        self.storage
            .lock()
            .unwrap()
            .get_shard_by_key(key)
            .unwrap()
            .unwrap()
    }
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa", "Ab"]).await;
    let harness = Harness::new(&server);

    let first = harness.discover().await.unwrap();
    assert_eq!(first.inserted, 2);

    let second = harness.discover().await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.already_known, 2);

    let storage = harness.storage.lock().unwrap();
    let shards = storage.list_shards().unwrap();
    let keys: Vec<&str> = shards.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["Aa", "Ab"]);
    assert!(shards.iter().all(|s| !s.processed));
    assert_eq!(
        shards[0].source_url,
        format!("{}/players/aa/", server.uri())
    );
}

#[tokio::test]
async fn test_discovery_ignores_non_shard_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/players/"))
        .respond_with(html(
            r#"
            <a href="/players/aa/">Aa</a>
            <a href="/players/ab/">AB</a>
            <a href="/players/">Pl</a>
            <a href="/squads/ac/">Ac</a>
            <a href="/players/ad">Ad</a>
            <a href="/players/aa-again/">Aa</a>
            "#,
        ))
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    let report = harness.discover().await.unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(
        harness.shard("Aa").source_url,
        format!("{}/players/aa/", server.uri())
    );
}

#[tokio::test]
async fn test_discovery_fetch_failure_aborts_pass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/players/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    let result = harness.discover().await;

    assert!(matches!(
        result,
        Err(HarvestError::Fetch(FetchError::Status { status: 503, .. }))
    ));
    assert_eq!(harness.storage.lock().unwrap().count_shards().unwrap(), 0);
}

#[tokio::test]
async fn test_crawl_commits_listing_rows() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa"]).await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(listing(&[
            r#"<a href="/players/x/John-Smith">John Smith</a> · 2010-2020 · Forward · Club X"#,
        ]))
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    harness.discover().await.unwrap();
    let report = harness.crawl().await;

    assert_eq!(report.committed, 1);
    assert_eq!(report.entities_written, 1);

    let shard = harness.shard("Aa");
    assert!(shard.processed);

    let entities = harness
        .storage
        .lock()
        .unwrap()
        .entities_for_shard(shard.id)
        .unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].name, "John Smith");
    assert_eq!(entities[0].active_years, "2010-2020");
    assert_eq!(entities[0].role, "Forward");
    assert_eq!(entities[0].extra_info, "Club X");
    assert_eq!(
        entities[0].profile_url,
        format!("{}/players/x/John-Smith", server.uri())
    );
}

#[tokio::test]
async fn test_failing_shard_is_retried_then_left_pending() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa", "Ab"]).await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/players/ab/"))
        .respond_with(listing(&[r#"<a href="/p/1">Abe Abb</a> · 1990-1999 · GK"#]))
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    harness.discover().await.unwrap();
    let report = harness.crawl().await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.committed, 1);

    let failed = harness.shard("Aa");
    assert!(!failed.processed);
    assert!(harness
        .storage
        .lock()
        .unwrap()
        .entities_for_shard(failed.id)
        .unwrap()
        .is_empty());
    assert!(harness.shard("Ab").processed);
}

#[tokio::test]
async fn test_rate_limited_shard_is_retried() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa"]).await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(listing(&[r#"<a href="/p/1">Ann Aal</a> · 2001 · DF"#]))
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    harness.discover().await.unwrap();
    let report = harness.crawl().await;

    assert_eq!(report.committed, 1);
    assert!(harness.shard("Aa").processed);
}

#[tokio::test]
async fn test_empty_listing_stays_pending() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa"]).await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(listing(&["Nothing to see here"]))
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    harness.discover().await.unwrap();
    let report = harness.crawl().await;

    assert_eq!(report.empty, 1);
    assert!(!harness.shard("Aa").processed);
}

#[tokio::test]
async fn test_processed_shards_are_fetched_once() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa"]).await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(listing(&[r#"<a href="/p/1">Ann Aal</a> · 2001 · DF"#]))
        .expect(1)
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    harness.discover().await.unwrap();
    harness.crawl().await;
    let second = harness.crawl().await;

    assert_eq!(second.selected, 0);
    assert_eq!(harness.storage.lock().unwrap().count_entities().unwrap(), 1);
}

#[tokio::test]
async fn test_reset_allows_full_recrawl() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa"]).await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(listing(&[
            r#"<a href="/p/1">Ann Aal</a> · 2001 · DF"#,
            r#"<a href="/p/2">Arn Aas</a> · 2003 · MF"#,
        ]))
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    harness.discover().await.unwrap();
    harness.crawl().await;

    let reset = harness.storage.lock().unwrap().reset_all().unwrap();
    assert_eq!(reset.entities_deleted, 2);
    assert!(!harness.shard("Aa").processed);

    let report = harness.crawl().await;
    assert_eq!(report.committed, 1);
    assert_eq!(harness.storage.lock().unwrap().count_entities().unwrap(), 2);
}

#[tokio::test]
async fn test_harvest_runs_discovery_then_crawl() {
    let server = MockServer::start().await;
    mount_root(&server, &["Aa", "Ab"]).await;
    Mock::given(method("GET"))
        .and(path("/players/aa/"))
        .respond_with(listing(&[r#"<a href="/p/1">Ann Aal</a> · 2001 · DF"#]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/players/ab/"))
        .respond_with(listing(&[r#"<a href="/p/2">Abe Abb</a> · 1990 · GK"#]))
        .mount(&server)
        .await;
    let harness = Harness::new(&server);

    let (discovered, crawled) = crawler::harvest(
        &harness.config,
        harness.storage.clone(),
        harness.fetcher.clone(),
        1,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .unwrap();

    assert_eq!(discovered.inserted, 2);
    assert_eq!(crawled.selected, 1);
    assert_eq!(crawled.committed, 1);
    assert!(harness.shard("Aa").processed);
    assert!(!harness.shard("Ab").processed);
}
