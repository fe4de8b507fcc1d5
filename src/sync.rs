use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::StreamExt;
use time::OffsetDateTime;
use tokio::{
    sync::{oneshot, Mutex},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::Instrument;

use crate::{
    constants::FAILURE_STREAK_ERROR_THRESHOLD,
    error::RemoteFetchError,
    models::quotes::{Quote, QuoteKey},
    notifications::{NotificationKind, Notifier},
    remote::QuoteSource,
    store::QuoteStore,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub changed: bool,
    /// Remote records whose key was not present locally.
    pub added: usize,
}

/// Folds a remote batch into `local`, keyed by `(text, category)`.
///
/// Remote records win for their key: a local record sharing a key with the
/// batch is replaced in place by the remote copy, and any further local
/// records with that key are dropped. Remote records with new keys are
/// appended in batch order.
pub fn merge(remote: &[Quote], local: &[Quote]) -> (Vec<Quote>, MergeOutcome) {
    let mut remote_by_key: HashMap<QuoteKey<'_>, &Quote> = HashMap::new();
    for quote in remote {
        remote_by_key.entry(quote.key()).or_insert(quote);
    }

    let mut emitted: HashSet<QuoteKey<'_>> = HashSet::new();
    let mut merged = Vec::with_capacity(local.len() + remote.len());

    for quote in local {
        match remote_by_key.get(&quote.key()) {
            Some(remote_quote) => {
                if emitted.insert(quote.key()) {
                    merged.push((*remote_quote).clone());
                }
            }
            None => merged.push(quote.clone()),
        }
    }

    let mut added = 0;
    for quote in remote {
        if emitted.insert(quote.key()) {
            merged.push(quote.clone());
            added += 1;
        }
    }

    let changed = key_counts(&merged) != key_counts(local);

    (merged, MergeOutcome { changed, added })
}

fn key_counts(quotes: &[Quote]) -> HashMap<QuoteKey<'_>, usize> {
    let mut counts = HashMap::new();
    for quote in quotes {
        *counts.entry(quote.key()).or_insert(0) += 1;
    }

    counts
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub cycles: u64,
    pub skipped: u64,
    pub failures: u64,
    pub failure_streak: u64,
    pub added: u64,
    pub last_synced_at: Option<OffsetDateTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleResult {
    /// Another cycle was already in flight.
    Skipped,
    /// Fetching or persisting failed; nothing changed.
    Failed,
    Unchanged,
    Merged(MergeOutcome),
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically reconciles the store with a remote source.
pub struct SyncEngine {
    store: Arc<QuoteStore>,
    source: Arc<dyn QuoteSource>,
    notifier: Notifier,
    timeout: Duration,
    syncing: AtomicBool,
    stats: Mutex<SyncStats>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<QuoteStore>,
        source: Arc<dyn QuoteSource>,
        notifier: Notifier,
        timeout: Duration,
    ) -> Self {
        SyncEngine {
            store,
            source,
            notifier,
            timeout,
            syncing: AtomicBool::new(false),
            stats: Mutex::new(SyncStats::default()),
        }
    }

    pub fn state(&self) -> SyncState {
        if self.syncing.load(Ordering::Acquire) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    pub async fn stats(&self) -> SyncStats {
        self.stats.lock().await.clone()
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.syncing))
    }

    /// One fetch-and-merge pass. Skipped if a pass is already running.
    #[tracing::instrument(skip_all)]
    pub async fn run_cycle(&self) -> CycleResult {
        let Some(_in_flight) = self.begin() else {
            tracing::debug!("a sync cycle is already in flight, skipping");
            self.stats.lock().await.skipped += 1;

            return CycleResult::Skipped;
        };

        let remote = match self.fetch_remote().await {
            Ok(remote) => remote,
            Err(e) => {
                self.record_failure("fetching quotes from server", &e).await;

                return CycleResult::Failed;
            }
        };

        let outcome = match self.store.merge_remote(&remote).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record_failure("persisting merged quotes", &e).await;

                return CycleResult::Failed;
            }
        };

        {
            let mut stats = self.stats.lock().await;
            if stats.failure_streak > 0 {
                tracing::info!(streak = stats.failure_streak, "quote sync recovered");
            }

            stats.cycles += 1;
            stats.failure_streak = 0;
            stats.added += outcome.added as u64;
            stats.last_synced_at = Some(OffsetDateTime::now_utc());
        }

        if !outcome.changed {
            tracing::debug!(fetched = remote.len(), "no changes from server");

            return CycleResult::Unchanged;
        }

        tracing::info!(fetched = remote.len(), added = outcome.added, "merged quotes from server");

        let message = if outcome.added > 0 {
            format!(
                "{} new quote(s) fetched from server and added.",
                outcome.added
            )
        } else {
            "quotes reconciled with server.".to_string()
        };
        self.notifier.notify(NotificationKind::Info, message);

        CycleResult::Merged(outcome)
    }

    async fn fetch_remote(&self) -> Result<Vec<Quote>, RemoteFetchError> {
        tokio::time::timeout(self.timeout, self.source.fetch_quotes())
            .await
            .map_err(|_| RemoteFetchError::Timeout(self.timeout))?
    }

    async fn record_failure(&self, step: &str, err: &(dyn std::error::Error + Send + Sync)) {
        let mut stats = self.stats.lock().await;
        stats.cycles += 1;
        stats.failures += 1;
        stats.failure_streak += 1;

        tracing::warn!(err = %err, streak = stats.failure_streak, "sync cycle failed when {step}");

        if stats.failure_streak == FAILURE_STREAK_ERROR_THRESHOLD {
            tracing::error!(
                streak = stats.failure_streak,
                "quote sync keeps failing, will keep retrying every cycle"
            );
        }
    }
}

/// Handle to the periodic sync task.
pub struct SyncHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub async fn shutdown(self) {
        // the task may already be gone
        let _ = self.stop.send(());

        if let Err(e) = self.task.await {
            tracing::error!(err = ?e, "the sync task ended abnormally");
        }
    }
}

/// Runs `engine` every `period` until the returned handle is shut down.
pub fn spawn(engine: Arc<SyncEngine>, period: Duration) -> SyncHandle {
    let (stop, stopped) = oneshot::channel();

    let task = tokio::spawn(
        async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let task = futures::stream::unfold(interval, move |mut interval| {
                let engine = engine.clone();

                async move {
                    interval.tick().await;
                    let _ = engine.run_cycle().await;

                    Some(((), interval))
                }
            });

            task.take_until(stopped).for_each(|_| async {}).await;

            tracing::info!("stopped quote sync.");
        }
        .in_current_span(),
    );

    SyncHandle { stop, task }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;
    use crate::storage::{test_support::ReadOnlyStore, KeyValueStore, MemoryStore};

    fn quote(text: &str, category: &str) -> Quote {
        Quote::new(text, category).unwrap()
    }

    #[test]
    fn merge_keeps_one_copy_of_shared_key() {
        let local = vec![quote("A", "X")];
        let remote = vec![quote("A", "X")];

        let (merged, outcome) = merge(&remote, &local);

        assert_eq!(merged, vec![quote("A", "X")]);
        assert!(!outcome.changed);
        assert_eq!(outcome.added, 0);
    }

    #[test]
    fn merge_appends_new_remote_records() {
        let local = vec![quote("A", "X")];
        let remote = vec![quote("B", "Server")];

        let (merged, outcome) = merge(&remote, &local);

        assert_eq!(merged, vec![quote("A", "X"), quote("B", "Server")]);
        assert!(outcome.changed);
        assert_eq!(outcome.added, 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let local = vec![quote("A", "X"), quote("C", "Y")];
        let remote = vec![quote("B", "Server"), quote("A", "X"), quote("D", "Server")];

        let (first, outcome) = merge(&remote, &local);
        assert!(outcome.changed);
        assert_eq!(outcome.added, 2);

        let (second, outcome) = merge(&remote, &first);
        assert!(!outcome.changed);
        assert_eq!(outcome.added, 0);
        assert_eq!(second, first);
    }

    #[test]
    fn merge_key_includes_category() {
        let local = vec![quote("A", "X")];
        let remote = vec![quote("A", "Server")];

        let (merged, outcome) = merge(&remote, &local);

        assert_eq!(merged.len(), 2);
        assert_eq!(outcome.added, 1);
    }

    #[test]
    fn merge_collapses_local_duplicates_of_remote_keys() {
        let local = vec![quote("A", "X"), quote("B", "Y"), quote("A", "X")];
        let remote = vec![quote("A", "X")];

        let (merged, outcome) = merge(&remote, &local);

        assert_eq!(merged, vec![quote("A", "X"), quote("B", "Y")]);
        assert!(outcome.changed);
        assert_eq!(outcome.added, 0);
    }

    #[test]
    fn merge_collapses_duplicates_within_batch() {
        let remote = vec![quote("B", "Server"), quote("B", "Server")];

        let (merged, outcome) = merge(&remote, &[]);

        assert_eq!(merged, vec![quote("B", "Server")]);
        assert_eq!(outcome.added, 1);
    }

    #[test]
    fn merge_of_empty_batch_is_a_no_op() {
        let local = vec![quote("A", "X"), quote("A", "X")];

        let (merged, outcome) = merge(&[], &local);

        assert_eq!(merged, local);
        assert!(!outcome.changed);
    }

    struct FakeSource {
        responses: Mutex<VecDeque<Result<Vec<Quote>, RemoteFetchError>>>,
        delay: Duration,
    }

    impl FakeSource {
        fn new(responses: Vec<Result<Vec<Quote>, RemoteFetchError>>) -> Self {
            FakeSource {
                responses: Mutex::new(responses.into()),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        async fn fetch_quotes(&self) -> Result<Vec<Quote>, RemoteFetchError> {
            tokio::time::sleep(self.delay).await;

            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(vec![]))
        }
    }

    fn server_error() -> RemoteFetchError {
        RemoteFetchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
    }

    async fn engine_with(source: FakeSource) -> (Arc<SyncEngine>, Arc<QuoteStore>, Notifier) {
        engine_over(source, Arc::new(MemoryStore::new())).await
    }

    async fn engine_over(
        source: FakeSource,
        backend: Arc<dyn KeyValueStore>,
    ) -> (Arc<SyncEngine>, Arc<QuoteStore>, Notifier) {
        let store = Arc::new(QuoteStore::load(backend).await);
        let notifier = Notifier::new();
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            Arc::new(source),
            notifier.clone(),
            Duration::from_secs(5),
        ));

        (engine, store, notifier)
    }

    #[tokio::test]
    async fn cycle_merges_and_notifies() {
        let source = FakeSource::new(vec![Ok(vec![quote("sunt aut facere", "Server")])]);
        let (engine, store, notifier) = engine_with(source).await;
        let mut notifications = notifier.subscribe();
        let before = store.len().await;

        let result = engine.run_cycle().await;

        assert_eq!(
            result,
            CycleResult::Merged(MergeOutcome {
                changed: true,
                added: 1
            })
        );
        assert_eq!(store.len().await, before + 1);

        let notification = notifications.try_recv().unwrap();
        assert_eq!(notification.kind, NotificationKind::Info);
        assert!(notification.message.starts_with("1 new quote(s)"));

        let stats = engine.stats().await;
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.added, 1);
        assert!(stats.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn unchanged_cycle_is_silent() {
        let batch = vec![quote("sunt aut facere", "Server")];
        let source = FakeSource::new(vec![Ok(batch.clone()), Ok(batch)]);
        let (engine, _, notifier) = engine_with(source).await;

        engine.run_cycle().await;
        let mut notifications = notifier.subscribe();

        assert_eq!(engine.run_cycle().await, CycleResult::Unchanged);
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn failures_are_counted_and_reset() {
        let source = FakeSource::new(vec![
            Err(server_error()),
            Err(server_error()),
            Ok(vec![]),
        ]);
        let (engine, store, _) = engine_with(source).await;
        let before = store.snapshot().await;

        assert_eq!(engine.run_cycle().await, CycleResult::Failed);
        assert_eq!(engine.run_cycle().await, CycleResult::Failed);

        let stats = engine.stats().await;
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.failure_streak, 2);
        assert_eq!(store.snapshot().await, before);

        assert_eq!(engine.run_cycle().await, CycleResult::Unchanged);

        let stats = engine.stats().await;
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.failure_streak, 0);
    }

    #[tokio::test]
    async fn persist_failures_extend_the_streak() {
        let batch = vec![quote("sunt aut facere", "Server")];
        let source = FakeSource::new(vec![Ok(batch.clone()), Ok(batch)]);
        let (engine, store, notifier) =
            engine_over(source, Arc::new(ReadOnlyStore::default())).await;
        let mut notifications = notifier.subscribe();
        let before = store.snapshot().await;

        assert_eq!(engine.run_cycle().await, CycleResult::Failed);
        assert_eq!(engine.run_cycle().await, CycleResult::Failed);

        let stats = engine.stats().await;
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.failure_streak, 2);
        assert!(stats.last_synced_at.is_none());
        assert_eq!(store.snapshot().await, before);
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let mut source = FakeSource::new(vec![Ok(vec![quote("late", "Server")])]);
        source.delay = Duration::from_secs(60);
        let (engine, _, _) = engine_with(source).await;

        assert_eq!(engine.run_cycle().await, CycleResult::Failed);
        assert_eq!(engine.stats().await.failure_streak, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycles_are_skipped() {
        let mut source = FakeSource::new(vec![Ok(vec![quote("slow", "Server")])]);
        source.delay = Duration::from_secs(1);
        let (engine, _, _) = engine_with(source).await;

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run_cycle().await }
        });

        tokio::task::yield_now().await;
        while engine.state() != SyncState::Syncing {
            tokio::task::yield_now().await;
        }

        assert_eq!(engine.run_cycle().await, CycleResult::Skipped);
        assert!(matches!(first.await.unwrap(), CycleResult::Merged(_)));
        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(engine.stats().await.skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_task_stops_on_shutdown() {
        let source = FakeSource::new(vec![Ok(vec![quote("tick", "Server")])]);
        let (engine, store, _) = engine_with(source).await;
        let before = store.len().await;

        let handle = spawn(engine.clone(), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.len().await, before + 1);

        handle.shutdown().await;

        let cycles = engine.stats().await.cycles;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(engine.stats().await.cycles, cycles);
    }
}
