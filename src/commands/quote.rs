use crate::{
    constants::{LAST_CATEGORY_KEY, LAST_QUOTE_KEY, NO_QUOTES_IN_CATEGORY},
    error::StoreError,
    models::quotes::CategoryFilter,
    notifications::NotificationKind,
    Data,
};

/// Shows a random quote from `category`, or from the selected category.
#[tracing::instrument(skip(data))]
pub async fn show(data: &Data, category: Option<&str>) -> anyhow::Result<String> {
    let filter = match category {
        Some(category) => CategoryFilter::parse(Some(category)),
        None => data.selected.read().await.clone(),
    };

    let Some(quote) = data.store.random_quote(&filter).await else {
        return Ok(NO_QUOTES_IN_CATEGORY.to_string());
    };

    let raw = serde_json::to_string(&quote)?;
    data.session
        .set(LAST_QUOTE_KEY, &raw)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when saving last quote"))?;

    Ok(format!("“{}”\n  - {}", quote.text, quote.category))
}

/// Changes the selected category, remembers it, and shows a quote from it.
/// Selecting every category forgets the stored choice.
#[tracing::instrument(skip(data))]
pub async fn select(data: &Data, category: &str) -> anyhow::Result<String> {
    let filter = CategoryFilter::parse(Some(category));

    let saved = match &filter {
        CategoryFilter::All => data.prefs.remove(LAST_CATEGORY_KEY).await,
        CategoryFilter::Only(category) => data.prefs.set(LAST_CATEGORY_KEY, category).await,
    };
    saved.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when saving selected category"),
    )?;

    *data.selected.write().await = filter.clone();

    let quote = show(data, None).await?;

    Ok(format!("selected category \"{}\".\n{}", filter.as_str(), quote))
}

#[tracing::instrument(skip(data))]
pub async fn add(data: &Data, text: &str, category: &str) -> anyhow::Result<()> {
    match data.store.add(text, category).await {
        Ok(quote) => {
            data.notifier
                .notify(NotificationKind::Success, "Quote added successfully!");

            if let Some(server) = data.server.clone() {
                tokio::spawn(async move { server.post_quote(&quote).await });
            }

            Ok(())
        }
        Err(StoreError::Validation(e)) => {
            tracing::debug!(err = %e, "rejected quote");
            data.notifier.notify(
                NotificationKind::Error,
                "Please enter both quote and category.",
            );

            Ok(())
        }
        Err(e) => {
            data.notifier
                .notify(NotificationKind::Error, "Could not save the quote.");

            Err(e.into())
        }
    }
}

pub async fn list(data: &Data, category: Option<&str>) -> String {
    let filter = CategoryFilter::parse(category);
    let quotes = data.store.list_by_category(&filter).await;

    if quotes.is_empty() {
        return NO_QUOTES_IN_CATEGORY.to_string();
    }

    quotes
        .iter()
        .enumerate()
        .map(|(idx, quote)| format!("{}. {}", idx + 1, quote))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn categories(data: &Data) -> String {
    let selected = data.selected.read().await.clone();

    std::iter::once(CategoryFilter::All.as_str().to_string())
        .chain(data.store.categories().await)
        .map(|category| {
            if category == selected.as_str() {
                format!("* {category}")
            } else {
                format!("  {category}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
