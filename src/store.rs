use std::{collections::HashSet, sync::Arc};

use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::{
    constants::{defaults::default_quotes, QUOTES_KEY},
    error::{ImportError, StorageError, StoreError},
    models::quotes::{CategoryFilter, Quote},
    storage::KeyValueStore,
    sync::{merge, MergeOutcome},
};

/// Counts reported by an import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub added: usize,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} imported, {} new added", self.imported, self.added)
    }
}

/// Owner of the quote collection.
///
/// Every mutation holds the collection lock until the new state is persisted,
/// so a sync cycle and a user edit never interleave.
pub struct QuoteStore {
    quotes: Mutex<Vec<Quote>>,
    backend: Arc<dyn KeyValueStore>,
}

impl QuoteStore {
    /// Seeds the collection from `backend`, falling back to the defaults.
    #[tracing::instrument(skip_all)]
    pub async fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let stored = match backend.get(QUOTES_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(err = ?e, "could not read stored quotes, using defaults");
                None
            }
        };

        let parsed = stored.and_then(|raw| match parse_collection(&raw) {
            Ok(quotes) => Some(quotes),
            Err(e) => {
                tracing::warn!(err = %e, "stored quotes are malformed, using defaults");
                None
            }
        });

        match parsed {
            Some(quotes) => {
                tracing::info!(count = quotes.len(), "loaded stored quotes");

                QuoteStore {
                    quotes: Mutex::new(quotes),
                    backend,
                }
            }
            None => {
                let store = QuoteStore {
                    quotes: Mutex::new(default_quotes()),
                    backend,
                };

                if let Err(e) = store.persist().await {
                    tracing::error!(err = ?e, "an error occurred when persisting default quotes");
                }

                store
            }
        }
    }

    /// Validates and appends a quote. Duplicates are allowed here.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, text: &str, category: &str) -> Result<Quote, StoreError> {
        let quote = Quote::new(text, category)?;

        let mut quotes = self.quotes.lock().await;
        quotes.push(quote.clone());

        if let Err(e) = self.write(&quotes).await {
            quotes.pop();
            return Err(e.into());
        }

        tracing::info!(quote = %quote, "added quote");

        Ok(quote)
    }

    pub async fn list_by_category(&self, filter: &CategoryFilter) -> Vec<Quote> {
        self.quotes
            .lock()
            .await
            .iter()
            .filter(|quote| filter.matches(quote))
            .cloned()
            .collect()
    }

    /// Distinct categories in order of first occurrence.
    pub async fn categories(&self) -> Vec<String> {
        let quotes = self.quotes.lock().await;
        let mut seen = HashSet::new();

        quotes
            .iter()
            .filter(|quote| seen.insert(quote.category.as_str()))
            .map(|quote| quote.category.clone())
            .collect()
    }

    pub async fn random_quote(&self, filter: &CategoryFilter) -> Option<Quote> {
        let candidates = self.list_by_category(filter).await;

        candidates.choose(&mut rand::thread_rng()).cloned()
    }

    pub async fn snapshot(&self) -> Vec<Quote> {
        self.quotes.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.quotes.lock().await.len()
    }

    pub async fn persist(&self) -> Result<(), StorageError> {
        let quotes = self.quotes.lock().await;

        self.write(&quotes).await
    }

    /// Merges a remote batch and persists the result if anything changed.
    pub async fn merge_remote(&self, remote: &[Quote]) -> Result<MergeOutcome, StorageError> {
        let mut quotes = self.quotes.lock().await;
        let (merged, outcome) = merge(remote, &quotes);

        if outcome.changed {
            self.write(&merged).await?;
            *quotes = merged;
        }

        Ok(outcome)
    }

    /// Appends the quotes whose `(text, category)` is not already present.
    pub async fn import(&self, incoming: Vec<Quote>) -> Result<ImportReport, ImportError> {
        let mut quotes = self.quotes.lock().await;
        let imported = incoming.len();

        let mut seen: HashSet<(String, String)> = quotes
            .iter()
            .map(|quote| (quote.text.clone(), quote.category.clone()))
            .collect();

        let fresh: Vec<Quote> = incoming
            .into_iter()
            .filter(|quote| seen.insert((quote.text.clone(), quote.category.clone())))
            .collect();

        let report = ImportReport {
            imported,
            added: fresh.len(),
        };

        if fresh.is_empty() {
            return Ok(report);
        }

        let mut next = quotes.clone();
        next.extend(fresh);
        self.write(&next).await?;
        *quotes = next;

        Ok(report)
    }

    async fn write(&self, quotes: &[Quote]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(quotes)?;

        self.backend.set(QUOTES_KEY, &raw).await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when persisting quotes"),
        )
    }
}

fn parse_collection(raw: &str) -> Result<Vec<Quote>, String> {
    let quotes: Vec<Quote> = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    match quotes.iter().position(|quote| !quote.is_well_formed()) {
        Some(index) => Err(format!("entry #{index} has a blank or untrimmed field")),
        None => Ok(quotes),
    }
}
