//! Fetch-then-reconcile cycles against a remote source.

use crate::book::QuoteBook;
use crate::config::RemoteConfig;
use crate::models::{Record, RecordSet};
use crate::reconcile::ConflictPolicy;
use chrono::{DateTime, Utc};
use providers::fixed::StaticRemoteSource;
use providers::http::{HttpRemoteSource, HttpSourceConfig};
use providers::noop::NoopRemoteSource;
use providers::{ProviderError, RemoteRecord, RemoteSource};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const SYNC_NOTIFICATION: &str = "Quotes synced and conflicts resolved with server.";
pub const MANUAL_SYNC_NOTIFICATION: &str = "Manual sync complete.";

/// What one fetch produced. A failure carries its reason instead of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(RecordSet),
    Failed(String),
}

impl FetchOutcome {
    /// Candidate records for reconciliation; a failed fetch has none.
    pub fn into_candidates(self) -> RecordSet {
        match self {
            FetchOutcome::Fetched(records) => records,
            FetchOutcome::Failed(_) => RecordSet::new(),
        }
    }
}

pub async fn fetch_candidates(source: &dyn RemoteSource) -> FetchOutcome {
    match source.fetch().await {
        Ok(remote) => FetchOutcome::Fetched(
            remote
                .into_iter()
                .map(Record::from)
                .filter(Record::is_valid)
                .collect(),
        ),
        Err(e) => FetchOutcome::Failed(e.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub appended: usize,
    pub replaced: usize,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied(SyncReport),
    Unchanged { fetched: usize },
    FetchFailed(String),
    PersistFailed(String),
    /// Another cycle was still in flight.
    Skipped,
    /// Stopped before the fetch completed; nothing was applied.
    Cancelled,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, SyncOutcome::Applied(_))
    }

    /// Message to surface after a periodic cycle, if any.
    pub fn notification(&self) -> Option<&'static str> {
        self.changed().then_some(SYNC_NOTIFICATION)
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncService {
    book: Arc<QuoteBook>,
    source: Arc<dyn RemoteSource>,
    policy: ConflictPolicy,
    in_flight: AtomicBool,
}

impl SyncService {
    pub fn new(
        book: Arc<QuoteBook>,
        source: Arc<dyn RemoteSource>,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            book,
            source,
            policy,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn book(&self) -> &Arc<QuoteBook> {
        &self.book
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn sync_once(&self) -> SyncOutcome {
        self.run_cycle(std::future::pending::<()>()).await
    }

    /// One cycle. `cancel` can only interrupt the fetch; once candidates are
    /// in hand the merge and write run to completion.
    async fn run_cycle<F>(&self, cancel: F) -> SyncOutcome
    where
        F: Future<Output = ()>,
    {
        let Some(_guard) = InFlight::try_acquire(&self.in_flight) else {
            debug!("sync already in flight; skipping");
            return SyncOutcome::Skipped;
        };

        let fetched = tokio::select! {
            _ = cancel => {
                info!("sync stopped before fetch completed");
                return SyncOutcome::Cancelled;
            }
            outcome = fetch_candidates(self.source.as_ref()) => outcome,
        };

        let candidates = match fetched {
            FetchOutcome::Fetched(records) => records,
            FetchOutcome::Failed(reason) => {
                warn!(%reason, "fetch from remote failed; treating as no remote quotes");
                return SyncOutcome::FetchFailed(reason);
            }
        };

        let fetched = candidates.len();
        match self.book.reconcile_with(&candidates, self.policy).await {
            Ok(result) if result.changed => {
                info!(
                    fetched,
                    appended = result.appended,
                    replaced = result.replaced,
                    policy = %self.policy,
                    "quotes synced with remote"
                );
                SyncOutcome::Applied(SyncReport {
                    fetched,
                    appended: result.appended,
                    replaced: result.replaced,
                    finished_at: Utc::now(),
                })
            }
            Ok(_) => {
                debug!(fetched, "remote had nothing new");
                SyncOutcome::Unchanged { fetched }
            }
            Err(e) => {
                warn!(error = %e, "could not persist synced quotes");
                SyncOutcome::PersistFailed(e.to_string())
            }
        }
    }

    /// Fire-and-forget style notification to the remote. Failures are only
    /// logged; local state never depends on the result.
    pub async fn notify_remote(&self, records: &[Record]) -> Result<(), ProviderError> {
        let payload = match records {
            [single] => serde_json::to_value(RemoteRecord::from(single)),
            many => serde_json::to_value(many.iter().map(RemoteRecord::from).collect::<Vec<_>>()),
        }
        .map_err(|e| ProviderError::Decode(e.to_string()))?;
        match self.source.notify(&payload).await {
            Ok(()) => {
                debug!(count = records.len(), "posted quotes to remote");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "posting to remote failed");
                Err(e)
            }
        }
    }

    /// Runs a cycle every `interval` until the handle is stopped or dropped.
    /// The first cycle fires one interval after the call.
    pub fn spawn_periodic<F>(self: &Arc<Self>, interval: Duration, on_outcome: F) -> SyncHandle
    where
        F: Fn(&SyncOutcome) + Send + Sync + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let service = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                let outcome = service.run_cycle(stopped(&mut stop_rx)).await;
                if outcome == SyncOutcome::Cancelled {
                    break;
                }
                on_outcome(&outcome);
            }
            debug!("periodic sync stopped");
        });
        SyncHandle { stop_tx, task }
    }
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    // An error means the sender is gone, which also counts as a stop.
    let _ = rx.changed().await;
}

pub struct SyncHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "periodic sync task ended abnormally");
        }
    }
}

pub fn build_remote(cfg: &RemoteConfig) -> Result<Arc<dyn RemoteSource>, ProviderError> {
    match cfg.provider.as_str() {
        "http" => {
            let source = HttpRemoteSource::new(HttpSourceConfig {
                url: cfg.url.clone(),
                limit: cfg.limit,
                text_field: cfg.text_field.clone(),
                category: cfg.category.clone(),
                timeout: Duration::from_secs(cfg.timeout_secs),
            })?;
            Ok(Arc::new(source))
        }
        "noop" => Ok(Arc::new(NoopRemoteSource)),
        "offline" => Ok(Arc::new(StaticRemoteSource::failing("remote sync disabled"))),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::StoreKeys;
    use storage::{KeyValueStore, MemoryStore};

    fn remote(pairs: &[(&str, &str)]) -> Vec<RemoteRecord> {
        pairs
            .iter()
            .map(|(t, c)| RemoteRecord {
                text: t.to_string(),
                category: c.to_string(),
            })
            .collect()
    }

    async fn service_with(
        source: Arc<dyn RemoteSource>,
    ) -> (Arc<SyncService>, Arc<MemoryStore>) {
        let local = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());
        let book = QuoteBook::open(local.clone(), session, StoreKeys::default()).await;
        let service = SyncService::new(Arc::new(book), source, ConflictPolicy::RemoteWins);
        (Arc::new(service), local)
    }

    #[tokio::test]
    async fn fetched_records_are_applied_and_persisted() {
        let source = Arc::new(StaticRemoteSource::new(remote(&[
            ("Stay hungry, stay foolish.", "Server"),
            ("brand new", "Server"),
        ])));
        let (service, local) = service_with(source).await;

        let outcome = service.sync_once().await;
        let SyncOutcome::Applied(report) = &outcome else {
            panic!("expected applied, got {outcome:?}");
        };
        assert_eq!((report.fetched, report.appended, report.replaced), (2, 1, 1));
        assert_eq!(outcome.notification(), Some(SYNC_NOTIFICATION));

        let stored: RecordSet =
            serde_json::from_str(&local.get("quotes").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, service.book().snapshot().await);
        assert!(stored.contains(&Record::new("Stay hungry, stay foolish.", "Server")));

        assert_eq!(
            service.sync_once().await,
            SyncOutcome::Unchanged { fetched: 2 }
        );
    }

    #[tokio::test]
    async fn failed_fetch_leaves_storage_byte_identical() {
        let (service, local) =
            service_with(Arc::new(StaticRemoteSource::failing("offline"))).await;
        let before = local.get("quotes").await.unwrap();
        let outcome = service.sync_once().await;
        assert!(matches!(outcome, SyncOutcome::FetchFailed(_)));
        assert_eq!(outcome.notification(), None);
        assert_eq!(local.get("quotes").await.unwrap(), before);
    }

    #[tokio::test]
    async fn invalid_remote_records_are_ignored() {
        let source = Arc::new(StaticRemoteSource::new(remote(&[("", "Server"), ("ok", " ")])));
        let outcome = fetch_candidates(source.as_ref()).await;
        assert_eq!(outcome.into_candidates(), RecordSet::new());
    }

    #[tokio::test]
    async fn overlapping_cycle_is_skipped() {
        let source = Arc::new(
            StaticRemoteSource::new(remote(&[("slow", "Server")]))
                .with_delay(Duration::from_millis(200)),
        );
        let (service, _) = service_with(source.clone()).await;

        let (first, second) = tokio::join!(service.sync_once(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            service.sync_once().await
        });
        assert!(first.changed());
        assert_eq!(second, SyncOutcome::Skipped);
        assert_eq!(source.fetch_count(), 1);
        assert!(!service.is_in_flight());
    }

    #[tokio::test]
    async fn stopping_abandons_in_flight_fetch() {
        let source = Arc::new(
            StaticRemoteSource::new(remote(&[("late", "Server")]))
                .with_delay(Duration::from_secs(5)),
        );
        let (service, local) = service_with(source.clone()).await;
        let before = local.get("quotes").await.unwrap();

        let handle = service.spawn_periodic(Duration::from_millis(20), |_| {});
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(service.is_in_flight());
        handle.stop().await;

        assert!(!service.is_in_flight());
        assert_eq!(local.get("quotes").await.unwrap(), before);
    }

    #[tokio::test]
    async fn periodic_sync_reports_outcomes() {
        let source = Arc::new(StaticRemoteSource::new(remote(&[("tick", "Server")])));
        let (service, _) = service_with(source.clone()).await;
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();

        let handle = service.spawn_periodic(Duration::from_millis(20), move |outcome| {
            sink.lock().unwrap().push(outcome.changed());
        });
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.stop().await;

        let seen = seen.lock().unwrap().clone();
        assert!(seen.len() >= 2, "expected several cycles, saw {seen:?}");
        assert!(seen[0]);
        assert!(seen[1..].iter().all(|changed| !changed));
    }

    #[tokio::test]
    async fn notify_posts_single_record_as_object() {
        let source = Arc::new(StaticRemoteSource::new(Vec::new()));
        let (service, _) = service_with(source.clone()).await;
        service
            .notify_remote(&[Record::new("one", "X")])
            .await
            .unwrap();
        service
            .notify_remote(&[Record::new("a", "X"), Record::new("b", "Y")])
            .await
            .unwrap();
        let notified = source.notified();
        assert!(notified[0].is_object());
        assert_eq!(notified[1].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cfg = RemoteConfig {
            provider: "carrier-pigeon".into(),
            ..RemoteConfig::default()
        };
        assert!(matches!(
            build_remote(&cfg),
            Err(ProviderError::UnknownProvider(_))
        ));
    }
}
