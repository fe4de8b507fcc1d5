use std::time::UNIX_EPOCH;

use time::format_description::well_known::Rfc3339;

use crate::{
    constants::{version::get_version, LAST_QUOTE_KEY, STARTUP_TIME},
    models::quotes::Quote,
    sync::SyncState,
    Data,
};

fn format_uptime(secs: u64) -> String {
    let (hours, rem) = (secs / 3600, secs % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    format!("{hours}h {minutes}m {seconds}s")
}

/// Version, collection size, uptime and sync health.
#[tracing::instrument(skip_all)]
pub async fn status(data: &Data) -> String {
    let uptime = STARTUP_TIME.elapsed().map(|d| d.as_secs()).unwrap_or_default();
    let started = STARTUP_TIME
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut lines = vec![
        format!("version: {}", get_version()),
        format!("rust: {}", rustc_version_runtime::version()),
        format!("quotes: {}", data.store.len().await),
        format!("categories: {}", data.store.categories().await.len()),
        format!("selected: {}", data.selected.read().await.as_str()),
        format!("uptime: {} (since {})", format_uptime(uptime), started),
    ];

    let last_quote = match data.session.get(LAST_QUOTE_KEY).await {
        Ok(raw) => raw.and_then(|raw| serde_json::from_str::<Quote>(&raw).ok()),
        Err(e) => {
            tracing::error!(err = ?e, "an error occurred when reading last quote");
            None
        }
    };

    if let Some(quote) = last_quote {
        lines.push(format!("last shown: {quote}"));
    }

    match &data.sync {
        Some(engine) => {
            let stats = engine.stats().await;
            let state = match engine.state() {
                SyncState::Idle => "idle",
                SyncState::Syncing => "syncing",
            };
            let last_synced = stats
                .last_synced_at
                .and_then(|at| at.format(&Rfc3339).ok())
                .unwrap_or_else(|| "never".to_string());

            lines.push(format!("sync: {state}, last synced {last_synced}"));
            lines.push(format!(
                "sync cycles: {} ({} skipped), {} quote(s) added",
                stats.cycles, stats.skipped, stats.added
            ));
            lines.push(format!(
                "sync failures: {} total, {} in a row",
                stats.failures, stats.failure_streak
            ));
        }
        None => lines.push("sync: disabled".to_string()),
    }

    lines.join("\n")
}
