use std::path::Path;

use crate::{
    error::ImportError,
    models::quotes::Quote,
    store::{ImportReport, QuoteStore},
};

#[derive(serde::Deserialize)]
struct RawQuote {
    text: String,
    category: String,
}

/// Writes the full collection to `path` as pretty-printed JSON.
#[tracing::instrument(skip(store))]
pub async fn export_to(store: &QuoteStore, path: &Path) -> anyhow::Result<usize> {
    let quotes = store.snapshot().await;
    let json = serde_json::to_string_pretty(&quotes)?;

    tokio::fs::write(path, json)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when writing export file"))?;

    tracing::info!(count = quotes.len(), "exported quotes");

    Ok(quotes.len())
}

/// Validates a JSON document as a list of quotes.
pub fn parse_import(raw: &str) -> Result<Vec<Quote>, ImportError> {
    let entries: Vec<RawQuote> = serde_json::from_str(raw)?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            Quote::new(&entry.text, &entry.category)
                .map_err(|source| ImportError::InvalidEntry { index, source })
        })
        .collect()
}

/// Reads `path` and appends every quote not already in the store.
///
/// Any error leaves the collection untouched.
#[tracing::instrument(skip(store))]
pub async fn import_from(store: &QuoteStore, path: &Path) -> Result<ImportReport, ImportError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let quotes = parse_import(&raw)?;

    let report = store.import(quotes).await?;

    tracing::info!(imported = report.imported, added = report.added, "imported quotes");

    Ok(report)
}
