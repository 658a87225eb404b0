//! HTTP API over the harvested data.
//!
//! Serves paginated entity listings and the shard key table as JSON.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::storage::SqliteStorage;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Mutex<SqliteStorage>>,
}

impl AppState {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    /// Opens the configured database.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        Ok(Self::new(storage))
    }
}

/// Start the web server.
pub async fn serve(config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
