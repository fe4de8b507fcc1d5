use std::sync::Arc;

use models::quotes::CategoryFilter;
use notifications::Notifier;
use remote::QuoteServerClient;
use storage::KeyValueStore;
use store::QuoteStore;
use sync::SyncEngine;
use tokio::sync::RwLock;

mod commands;
mod config;
mod console;
mod constants;
mod error;
mod init;
mod models;
mod notifications;
mod remote;
mod storage;
mod store;
mod sync;
mod telemetry;
mod transfer;

/// State shared by the console commands and the background sync.
#[derive(Clone)]
struct Data {
    store: Arc<QuoteStore>,
    /// Persistent key-value store, also backing the quote collection.
    prefs: Arc<dyn KeyValueStore>,
    /// Session-scoped key-value store, cleared when the process exits.
    session: Arc<dyn KeyValueStore>,
    selected: Arc<RwLock<CategoryFilter>>,
    notifier: Notifier,
    server: Option<QuoteServerClient>,
    sync: Option<Arc<SyncEngine>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _ = &*constants::STARTUP_TIME;

    let telemetry = telemetry::init_telemetry()?;
    let config = config::Config::from_env();

    let (data, sync_handle) = init::init(&config).await?;

    let result = console::run(data).await;

    if let Some(handle) = sync_handle {
        handle.shutdown().await;
    }

    tracing::info!("bye!");
    telemetry.shutdown();

    result
}
