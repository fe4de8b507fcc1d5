use crate::{sync::CycleResult, Data};

/// Runs a sync cycle right away instead of waiting for the timer.
#[tracing::instrument(skip_all)]
pub async fn sync(data: &Data) -> String {
    let Some(engine) = &data.sync else {
        return "sync is disabled.".to_string();
    };

    match engine.run_cycle().await {
        CycleResult::Skipped => "a sync is already running.".to_string(),
        CycleResult::Failed => "could not reach the quote server. will retry on the next cycle."
            .to_string(),
        CycleResult::Unchanged => "already up to date.".to_string(),
        CycleResult::Merged(outcome) => format!("synced: {} new quote(s).", outcome.added),
    }
}
