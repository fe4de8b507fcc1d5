use std::{str::FromStr, time::Duration};

use crate::constants::defaults;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub enabled: bool,
    pub server_url: String,
    pub interval: Duration,
    pub fetch_limit: usize,
    pub timeout: Duration,
    pub remote_category: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            enabled: true,
            server_url: defaults::QUOTES_SERVER_URL.to_string(),
            interval: Duration::from_secs(defaults::SYNC_INTERVAL_SECS),
            fetch_limit: defaults::SYNC_FETCH_LIMIT,
            timeout: Duration::from_secs(defaults::SYNC_TIMEOUT_SECS),
            remote_category: defaults::SYNC_REMOTE_CATEGORY.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub sync: SyncConfig,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sync_defaults = SyncConfig::default();

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| defaults::DATABASE_URL.to_string());

        let server_url = lookup("QUOTES_SERVER_URL").unwrap_or(sync_defaults.server_url);

        let interval = parse_or(&lookup, "SYNC_INTERVAL_SECS", defaults::SYNC_INTERVAL_SECS)
            .max(1);
        let timeout = parse_or(&lookup, "SYNC_TIMEOUT_SECS", defaults::SYNC_TIMEOUT_SECS).max(1);
        let fetch_limit = parse_or(&lookup, "SYNC_FETCH_LIMIT", defaults::SYNC_FETCH_LIMIT);

        let remote_category = lookup("SYNC_REMOTE_CATEGORY")
            .map(|category| category.trim().to_string())
            .filter(|category| !category.is_empty())
            .unwrap_or(sync_defaults.remote_category);

        let enabled = parse_or(&lookup, "SYNC_ENABLED", sync_defaults.enabled);

        if !enabled {
            tracing::warn!("SYNC_ENABLED is false. quotes will not be synced with the server.");
        }

        Config {
            database_url,
            sync: SyncConfig {
                enabled,
                server_url,
                interval: Duration::from_secs(interval),
                fetch_limit,
                timeout: Duration::from_secs(timeout),
                remote_category,
            },
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = %key, value = %raw, "invalid value, defaulting to {}", default);
            default
        }),
        None => default,
    }
}
