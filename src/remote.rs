use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;

use crate::{
    config::SyncConfig,
    error::RemoteFetchError,
    models::{
        quotes::Quote,
        remote::{PostResponse, RemotePost},
    },
};

/// Where a sync cycle gets its remote batch from.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>, RemoteFetchError>;
}

#[derive(Clone)]
pub struct QuoteServerClient {
    client: reqwest::Client,
    url: String,
    limit: usize,
    category: String,
}

impl QuoteServerClient {
    pub fn new(config: &SyncConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("quotesync/{}", env!("CARGO_PKG_VERSION")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(QuoteServerClient {
            client,
            url: config.server_url.clone(),
            limit: config.fetch_limit,
            category: config.remote_category.clone(),
        })
    }

    #[tracing::instrument(skip_all)]
    async fn get_posts(&self) -> Result<Vec<RemotePost>, RemoteFetchError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("_limit", self.limit)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RemoteFetchError::Status(resp.status()));
        }

        let text = resp.text().await?;

        // records are decoded one by one so a malformed entry only loses itself
        let records: Vec<Value> = serde_json::from_str(&text).inspect_err(
            |e| tracing::debug!(err = ?e, text = %text, "an error occurred when parsing response body"),
        )?;

        Ok(records.iter().map(RemotePost::from_value).collect())
    }

    /// Sends a quote to the server. The outcome is only logged.
    #[tracing::instrument(skip(self))]
    pub async fn post_quote(&self, quote: &Quote) {
        let resp = match self.client.post(&self.url).json(quote).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when posting quote");
                return;
            }
        };

        let status = resp.status();

        match resp.json::<PostResponse>().await {
            Ok(body) => tracing::info!(%status, id = ?body.id, "posted quote to server"),
            Err(e) => tracing::warn!(%status, err = ?e, "posted quote but could not decode response"),
        }
    }
}

#[async_trait]
impl QuoteSource for QuoteServerClient {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>, RemoteFetchError> {
        let posts = self.get_posts().await?;

        Ok(posts_to_quotes(posts, self.limit, &self.category))
    }
}

/// Maps the first `limit` usable records to quotes under `category`.
pub fn posts_to_quotes(posts: Vec<RemotePost>, limit: usize, category: &str) -> Vec<Quote> {
    posts
        .into_iter()
        .take(limit)
        .filter_map(|post| {
            let title = post.title?;

            Quote::new(&title, category)
                .inspect_err(|_| tracing::debug!(id = ?post.id, "skipping remote record without a title"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts(raw: &str) -> Vec<RemotePost> {
        let records: Vec<Value> = serde_json::from_str(raw).unwrap();

        records.iter().map(RemotePost::from_value).collect()
    }

    #[test]
    fn client_takes_settings_from_config() {
        let config = SyncConfig {
            fetch_limit: 3,
            remote_category: "Remote".into(),
            ..SyncConfig::default()
        };

        let client = QuoteServerClient::new(&config).unwrap();

        assert_eq!(client.url, config.server_url);
        assert_eq!(client.limit, 3);
        assert_eq!(client.category, "Remote");
    }

    #[test]
    fn maps_titles_to_constant_category() {
        let posts = posts(
            r#"[
                {"userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit"},
                {"userId": 1, "id": 2, "title": " qui est esse ", "body": "est rerum tempore"}
            ]"#,
        );

        let quotes = posts_to_quotes(posts, 10, "Server");

        assert_eq!(
            quotes,
            vec![
                Quote::new("sunt aut facere", "Server").unwrap(),
                Quote::new("qui est esse", "Server").unwrap(),
            ]
        );
    }

    #[test]
    fn truncates_to_limit() {
        let posts = posts(r#"[{"title": "a"}, {"title": "b"}, {"title": "c"}]"#);

        assert_eq!(posts_to_quotes(posts, 2, "Server").len(), 2);
    }

    #[test]
    fn skips_records_without_title() {
        let posts = posts(r#"[{"id": 1}, {"id": 2, "title": "   "}, {"id": 3, "text": "kept"}]"#);

        assert_eq!(
            posts_to_quotes(posts, 10, "Server"),
            vec![Quote::new("kept", "Server").unwrap()]
        );
    }

    #[test]
    fn malformed_records_do_not_drop_the_batch() {
        let posts = posts(
            r#"[
                {"id": 1, "title": "good one"},
                {"id": 2, "title": 42},
                {"id": 3, "title": "both fields", "text": "ignored"},
                "not a record"
            ]"#,
        );

        assert_eq!(
            posts_to_quotes(posts, 10, "Server"),
            vec![
                Quote::new("good one", "Server").unwrap(),
                Quote::new("both fields", "Server").unwrap(),
            ]
        );
    }
}
