use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::Config,
    constants::LAST_CATEGORY_KEY,
    models::quotes::CategoryFilter,
    notifications::Notifier,
    remote::QuoteServerClient,
    storage::{KeyValueStore, MemoryStore, SqliteStore},
    store::QuoteStore,
    sync::{self, SyncEngine, SyncHandle},
    Data,
};

async fn init_selected_category(
    prefs: &dyn KeyValueStore,
    store: &QuoteStore,
) -> CategoryFilter {
    let stored = match prefs.get(LAST_CATEGORY_KEY).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(err = ?e, "could not read last selected category");
            None
        }
    };

    let filter = CategoryFilter::parse(stored.as_deref());

    match &filter {
        CategoryFilter::Only(category) if !store.categories().await.contains(category) => {
            tracing::warn!(category = %category, "last selected category no longer exists. showing all quotes.");
            CategoryFilter::All
        }
        _ => filter,
    }
}

fn init_sync(
    config: &Config,
    store: &Arc<QuoteStore>,
    notifier: &Notifier,
) -> anyhow::Result<(Option<QuoteServerClient>, Option<Arc<SyncEngine>>)> {
    if !config.sync.enabled {
        return Ok((None, None));
    }

    tracing::info!(url = %config.sync.server_url, "initializing quote server client...");
    let server = QuoteServerClient::new(&config.sync)?;

    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        Arc::new(server.clone()),
        notifier.clone(),
        config.sync.timeout,
    ));

    Ok((Some(server), Some(engine)))
}

/// Wires up storage, the quote store and the sync engine, and starts the sync timer.
pub async fn init(config: &Config) -> anyhow::Result<(Data, Option<SyncHandle>)> {
    tracing::info!("initializing... please wait warmly.");

    tracing::info!("initializing database connection...");
    let prefs: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::connect(&config.database_url).await?);

    let store = Arc::new(QuoteStore::load(prefs.clone()).await);
    let selected = init_selected_category(prefs.as_ref(), &store).await;
    let notifier = Notifier::new();
    let (server, engine) = init_sync(config, &store, &notifier)?;

    let handle = engine.clone().map(|engine| {
        tracing::info!(interval = ?config.sync.interval, "initialized quote sync!");
        sync::spawn(engine, config.sync.interval)
    });

    let data = Data {
        store,
        prefs,
        session: Arc::new(MemoryStore::new()),
        selected: Arc::new(RwLock::new(selected)),
        notifier,
        server,
        sync: engine,
    };

    tracing::info!("finished initializing!");
    Ok((data, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn restores_known_category() {
        let prefs: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = QuoteStore::load(prefs.clone()).await;
        prefs.set(LAST_CATEGORY_KEY, "Life").await.unwrap();

        assert_eq!(
            init_selected_category(prefs.as_ref(), &store).await,
            CategoryFilter::Only("Life".into())
        );
    }

    #[tokio::test]
    async fn unknown_category_falls_back_to_all() {
        let prefs: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = QuoteStore::load(prefs.clone()).await;
        prefs.set(LAST_CATEGORY_KEY, "Gone").await.unwrap();

        assert_eq!(
            init_selected_category(prefs.as_ref(), &store).await,
            CategoryFilter::All
        );
    }
}
