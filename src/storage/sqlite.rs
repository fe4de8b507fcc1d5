use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

use super::KeyValueStore;
use crate::error::StorageError;

/// Key-value store backed by the `kv_store` table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        SqliteStore { db }
    }

    /// Connects to `db_url` and runs the embedded migrations.
    pub async fn connect(db_url: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .inspect_err(
                |e| tracing::error!(err = ?e, "an error occurred when connecting to database"),
            )?;

        tracing::info!("running migrations...");
        sqlx::migrate!("./migrations").run(&db).await?;
        tracing::info!("finished running migrations!");

        Ok(SqliteStore::new(db))
    }

    /// A private in-memory database on a single connection.
    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;

        Ok(SqliteStore::new(db))
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(
            r#"
                SELECT
                    value
                FROM kv_store
                WHERE key = $1;
            "#,
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, key = %key, "an error occurred when reading key"),
        )?;

        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
                INSERT INTO
                    kv_store (key, value)
                VALUES
                    ($1, $2)
                ON CONFLICT (key)
                DO UPDATE SET
                    value = excluded.value,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now');
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, key = %key, "an error occurred when writing key"),
        )?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
                DELETE FROM kv_store
                WHERE key = $1;
            "#,
        )
        .bind(key)
        .execute(&self.db)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, key = %key, "an error occurred when removing key"),
        )?;

        Ok(())
    }
}
