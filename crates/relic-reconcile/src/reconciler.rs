//! Reconciler: brings the server collections and the droplet fleet back
//! in line after an unclean stop.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use relic_compute::{ComputeError, ComputeProvider};
use relic_state::{Collection, Document, DocumentStore, DropletId, DropletRef};

use crate::config::ReconcileConfig;

/// Documents deleted per collection by one [`Reconciler::reconcile_all`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub deleted: Vec<(Collection, u32)>,
}

impl ReconcileReport {
    /// Deleted count for a collection, zero if it was not reconciled.
    pub fn get(&self, collection: Collection) -> u32 {
        self.deleted
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.deleted.iter().map(|(_, n)| n).sum()
    }
}

/// Cleans up orphaned server records and the droplets they reference.
///
/// Cheap to clone: the gateways are shared handles.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    compute: Arc<dyn ComputeProvider>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DocumentStore>, compute: Arc<dyn ComputeProvider>) -> Self {
        Self {
            store,
            compute,
            config: ReconcileConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile `servers`, then `server_ips`. A failure in one never skips
    /// the other.
    pub async fn reconcile_all(&self) -> ReconcileReport {
        info!("cleaning up server documents");
        let mut report = ReconcileReport::default();
        for collection in Collection::ALL {
            let deleted = self.reconcile_collection(collection).await;
            report.deleted.push((collection, deleted));
        }
        info!(total = report.total(), "server document cleanup finished");
        report
    }

    /// Destroy the droplet behind every document in `collection` and delete
    /// the documents. Returns the number of documents deleted.
    ///
    /// Errors are logged and absorbed here.
    pub async fn reconcile_collection(&self, collection: Collection) -> u32 {
        let documents = match self.store.fetch_all(collection).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(%collection, error = %e, "error fetching collection, skipping");
                return 0;
            }
        };

        if documents.is_empty() {
            debug!(%collection, "collection already clean");
            return 0;
        }

        let found = documents.len();
        let deleted = if self.config.concurrency <= 1 {
            let mut deleted = 0;
            for document in documents {
                if self.retire(collection, document).await {
                    deleted += 1;
                }
            }
            deleted
        } else {
            self.retire_concurrently(collection, documents).await
        };

        info!(%collection, found, deleted, "deleted document(s) from collection");
        deleted
    }

    /// Run [`Self::retire`] on a bounded pool. A failed or panicked task only
    /// loses its own document.
    async fn retire_concurrently(&self, collection: Collection, documents: Vec<Document>) -> u32 {
        let limit = self.config.concurrency.clamp(1, Semaphore::MAX_PERMITS);
        let permits = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();

        for document in documents {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let this = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                this.retire(collection, document).await
            });
        }

        let mut deleted = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!(%collection, error = %e, "document cleanup task failed"),
            }
        }
        deleted
    }

    /// Terminate the document's droplet (if any), then delete the document.
    /// Returns true when the document is gone from the store.
    async fn retire(&self, collection: Collection, document: Document) -> bool {
        match document.droplet_ref() {
            DropletRef::Id(droplet_id) => {
                self.terminate(collection, &document.id, droplet_id).await;
            }
            DropletRef::Invalid(value) => {
                warn!(%collection, document = %document.id, %value, "unusable droplet id, not destroying");
            }
            DropletRef::Absent => {}
        }

        match self.store.delete(collection, &document.id).await {
            Ok(existed) => {
                if !existed {
                    debug!(%collection, document = %document.id, "document was already gone");
                }
                true
            }
            Err(e) => {
                warn!(%collection, document = %document.id, error = %e, "error deleting document");
                false
            }
        }
    }

    async fn terminate(&self, collection: Collection, document_id: &str, droplet_id: DropletId) {
        let attempts = self.config.termination_attempts.max(1);
        let mut backoff = self.config.retry_backoff;

        info!(%collection, document = %document_id, droplet_id, "deleting droplet");
        for attempt in 1..=attempts {
            match self.compute.terminate_instance(droplet_id).await {
                Ok(()) => {
                    debug!(droplet_id, attempt, "droplet destroyed");
                    return;
                }
                Err(ComputeError::NotFound(_)) => {
                    info!(droplet_id, "droplet already destroyed");
                    return;
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    debug!(droplet_id, attempt, error = %e, ?backoff, "retrying droplet destroy");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => {
                    warn!(
                        %collection,
                        document = %document_id,
                        droplet_id,
                        attempt,
                        error = %e,
                        "error deleting droplet, deleting document anyway"
                    );
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use relic_compute::ComputeResult;
    use relic_state::{DROPLET_ID_FIELD, StateError, StateResult};

    // ── Fakes ──────────────────────────────────────────────────────

    /// In-memory document store that records deletes and can be told to fail.
    #[derive(Default)]
    struct FakeStore {
        collections: Mutex<HashMap<Collection, Vec<Document>>>,
        fail_fetch: HashSet<Collection>,
        fail_delete: HashSet<String>,
        deletes: Mutex<Vec<(Collection, String)>>,
        fetches: AtomicUsize,
    }

    impl FakeStore {
        fn with(mut self, collection: Collection, docs: Vec<Document>) -> Self {
            self.collections.get_mut().unwrap().insert(collection, docs);
            self
        }

        fn failing_fetch(mut self, collection: Collection) -> Self {
            self.fail_fetch.insert(collection);
            self
        }

        fn failing_delete(mut self, id: &str) -> Self {
            self.fail_delete.insert(id.to_string());
            self
        }

        fn remaining(&self, collection: Collection) -> Vec<String> {
            let collections = self.collections.lock().unwrap();
            collections
                .get(&collection)
                .map(|docs| docs.iter().map(|d| d.id.clone()).collect())
                .unwrap_or_default()
        }

        fn deleted_ids(&self, collection: Collection) -> Vec<String> {
            let deletes = self.deletes.lock().unwrap();
            deletes
                .iter()
                .filter(|(c, _)| *c == collection)
                .map(|(_, id)| id.clone())
                .collect()
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn fetch_all(&self, collection: Collection) -> StateResult<Vec<Document>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch.contains(&collection) {
                return Err(StateError::Read("connection reset".into()));
            }
            let collections = self.collections.lock().unwrap();
            Ok(collections.get(&collection).cloned().unwrap_or_default())
        }

        async fn delete(&self, collection: Collection, id: &str) -> StateResult<bool> {
            self.deletes
                .lock()
                .unwrap()
                .push((collection, id.to_string()));
            if self.fail_delete.contains(id) {
                return Err(StateError::Write("permission denied".into()));
            }
            let mut collections = self.collections.lock().unwrap();
            let docs = collections.entry(collection).or_default();
            let before = docs.len();
            docs.retain(|d| d.id != id);
            Ok(docs.len() != before)
        }

        async fn put(&self, collection: Collection, document: &Document) -> StateResult<()> {
            let mut collections = self.collections.lock().unwrap();
            collections
                .entry(collection)
                .or_default()
                .push(document.clone());
            Ok(())
        }
    }

    #[derive(Clone, Copy)]
    enum Failure {
        Permanent,
        NotFound,
        /// Fails transiently this many times, then succeeds.
        Transient(usize),
        Panic,
    }

    /// Compute provider recording every termination attempt.
    #[derive(Default)]
    struct FakeCompute {
        failures: HashMap<DropletId, Failure>,
        calls: Mutex<Vec<DropletId>>,
    }

    impl FakeCompute {
        fn failing(mut self, id: DropletId, failure: Failure) -> Self {
            self.failures.insert(id, failure);
            self
        }

        fn calls(&self) -> Vec<DropletId> {
            self.calls.lock().unwrap().clone()
        }

        fn attempts_for(&self, id: DropletId) -> usize {
            self.calls().iter().filter(|c| **c == id).count()
        }
    }

    #[async_trait]
    impl ComputeProvider for FakeCompute {
        async fn terminate_instance(&self, id: DropletId) -> ComputeResult<()> {
            let attempt = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(id);
                calls.iter().filter(|c| **c == id).count()
            };
            match self.failures.get(&id) {
                None => Ok(()),
                Some(Failure::Permanent) => Err(ComputeError::Api {
                    status: 422,
                    message: "droplet is locked".into(),
                    transient: false,
                }),
                Some(Failure::NotFound) => Err(ComputeError::NotFound(id)),
                Some(Failure::Transient(times)) if attempt <= *times => {
                    Err(ComputeError::Transport("connection refused".into()))
                }
                Some(Failure::Transient(_)) => Ok(()),
                Some(Failure::Panic) => panic!("provider blew up on {id}"),
            }
        }
    }

    fn doc(id: &str, droplet: Option<u64>) -> Document {
        let d = Document::new(id).with_field("name", id);
        match droplet {
            Some(n) => d.with_field(DROPLET_ID_FIELD, n),
            None => d,
        }
    }

    fn reconciler(store: &Arc<FakeStore>, compute: &Arc<FakeCompute>) -> Reconciler {
        let store: Arc<dyn DocumentStore> = store.clone();
        let compute: Arc<dyn ComputeProvider> = compute.clone();
        Reconciler::new(store, compute).with_config(
            ReconcileConfig::default().with_retry_backoff(Duration::from_millis(1)),
        )
    }

    // ── reconcile_collection ───────────────────────────────────────

    #[tokio::test]
    async fn documents_without_droplets_are_all_deleted() {
        let docs = (0..5).map(|i| doc(&format!("s{i}"), None)).collect();
        let store = Arc::new(FakeStore::default().with(Collection::Servers, docs));
        let compute = Arc::new(FakeCompute::default());

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 5);
        assert!(store.remaining(Collection::Servers).is_empty());
        assert!(compute.calls().is_empty());
    }

    #[tokio::test]
    async fn mixed_collection_with_failed_termination() {
        let store = Arc::new(FakeStore::default().with(
            Collection::Servers,
            vec![doc("a", Some(101)), doc("b", None), doc("c", Some(103))],
        ));
        let compute = Arc::new(FakeCompute::default().failing(103, Failure::Permanent));

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 3);
        assert_eq!(compute.calls(), vec![101, 103]);
        assert_eq!(store.deleted_ids(Collection::Servers), ["a", "b", "c"]);
        assert!(store.remaining(Collection::Servers).is_empty());
    }

    #[tokio::test]
    async fn empty_collection_is_a_noop() {
        let store = Arc::new(FakeStore::default());
        let compute = Arc::new(FakeCompute::default());

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::ServerIps)
            .await;

        assert_eq!(deleted, 0);
        assert!(compute.calls().is_empty());
        assert!(store.deleted_ids(Collection::ServerIps).is_empty());
    }

    #[tokio::test]
    async fn second_run_sees_empty_collection() {
        let store = Arc::new(
            FakeStore::default().with(Collection::Servers, vec![doc("a", Some(1)), doc("b", None)]),
        );
        let compute = Arc::new(FakeCompute::default());
        let r = reconciler(&store, &compute);

        assert_eq!(r.reconcile_collection(Collection::Servers).await, 2);
        assert_eq!(r.reconcile_collection(Collection::Servers).await, 0);
        assert_eq!(compute.calls(), vec![1]);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_failure_returns_zero() {
        let store = Arc::new(
            FakeStore::default()
                .with(Collection::Servers, vec![doc("a", Some(1))])
                .failing_fetch(Collection::Servers),
        );
        let compute = Arc::new(FakeCompute::default());

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 0);
        assert!(compute.calls().is_empty());
        assert_eq!(store.remaining(Collection::Servers), ["a"]);
    }

    #[tokio::test]
    async fn delete_failure_is_not_counted_and_loop_continues() {
        let store = Arc::new(
            FakeStore::default()
                .with(
                    Collection::Servers,
                    vec![doc("a", None), doc("b", None), doc("c", None)],
                )
                .failing_delete("b"),
        );
        let compute = Arc::new(FakeCompute::default());

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 2);
        assert_eq!(store.deleted_ids(Collection::Servers), ["a", "b", "c"]);
        assert_eq!(store.remaining(Collection::Servers), ["b"]);
    }

    #[tokio::test]
    async fn invalid_droplet_id_skips_termination_but_deletes() {
        let store = Arc::new(FakeStore::default().with(
            Collection::Servers,
            vec![doc("a", None).with_field(DROPLET_ID_FIELD, "not-a-number")],
        ));
        let compute = Arc::new(FakeCompute::default());

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 1);
        assert!(compute.calls().is_empty());
    }

    // ── Retry policy ───────────────────────────────────────────────

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = Arc::new(FakeStore::default().with(Collection::Servers, vec![doc("a", Some(9))]));
        let compute = Arc::new(FakeCompute::default().failing(9, Failure::Transient(2)));

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 1);
        assert_eq!(compute.attempts_for(9), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_attempt_limit() {
        let store = Arc::new(FakeStore::default().with(Collection::Servers, vec![doc("a", Some(9))]));
        let compute = Arc::new(FakeCompute::default().failing(9, Failure::Transient(10)));

        let deleted = reconciler(&store, &compute)
            .with_config(
                ReconcileConfig::default()
                    .with_termination_attempts(2)
                    .with_retry_backoff(Duration::from_millis(1)),
            )
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 1);
        assert_eq!(compute.attempts_for(9), 2);
    }

    #[tokio::test]
    async fn permanent_and_not_found_are_not_retried() {
        let store = Arc::new(
            FakeStore::default().with(Collection::Servers, vec![doc("a", Some(1)), doc("b", Some(2))]),
        );
        let compute = Arc::new(
            FakeCompute::default()
                .failing(1, Failure::Permanent)
                .failing(2, Failure::NotFound),
        );

        let deleted = reconciler(&store, &compute)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 2);
        assert_eq!(compute.calls(), vec![1, 2]);
    }

    // ── reconcile_all ──────────────────────────────────────────────

    #[tokio::test]
    async fn reconcile_all_covers_both_collections() {
        let store = Arc::new(
            FakeStore::default()
                .with(Collection::Servers, vec![doc("a", Some(1)), doc("b", None)])
                .with(Collection::ServerIps, vec![doc("10.0.0.1", Some(1))]),
        );
        let compute = Arc::new(FakeCompute::default());

        let report = reconciler(&store, &compute).reconcile_all().await;

        assert_eq!(report.get(Collection::Servers), 2);
        assert_eq!(report.get(Collection::ServerIps), 1);
        assert_eq!(report.total(), 3);
        assert_eq!(
            report.deleted.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            Collection::ALL
        );
    }

    #[tokio::test]
    async fn reconcile_all_continues_after_fetch_failure() {
        let store = Arc::new(
            FakeStore::default()
                .with(Collection::Servers, vec![doc("a", None)])
                .with(Collection::ServerIps, vec![doc("10.0.0.1", Some(5))])
                .failing_fetch(Collection::Servers),
        );
        let compute = Arc::new(FakeCompute::default());

        let report = reconciler(&store, &compute).reconcile_all().await;

        assert_eq!(report.get(Collection::Servers), 0);
        assert_eq!(report.get(Collection::ServerIps), 1);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(compute.calls(), vec![5]);
    }

    // ── Worker pool ────────────────────────────────────────────────

    #[tokio::test]
    async fn concurrent_pool_counts_exactly_the_successful_deletes() {
        let docs = (0..20u64)
            .map(|i| doc(&format!("s{i}"), (i % 2 == 0).then_some(100 + i)))
            .collect();
        let store = Arc::new(
            FakeStore::default()
                .with(Collection::Servers, docs)
                .failing_delete("s3")
                .failing_delete("s7"),
        );
        let compute = Arc::new(FakeCompute::default().failing(104, Failure::Permanent));

        let deleted = reconciler(&store, &compute)
            .with_config(
                ReconcileConfig::default()
                    .with_concurrency(4)
                    .with_retry_backoff(Duration::from_millis(1)),
            )
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 18);
        assert_eq!(compute.calls().len(), 10);
        let mut remaining = store.remaining(Collection::Servers);
        remaining.sort();
        assert_eq!(remaining, ["s3", "s7"]);
    }

    #[tokio::test]
    async fn panicked_task_does_not_cancel_siblings() {
        let store = Arc::new(FakeStore::default().with(
            Collection::Servers,
            vec![doc("a", Some(1)), doc("b", Some(2)), doc("c", Some(3))],
        ));
        let compute = Arc::new(FakeCompute::default().failing(2, Failure::Panic));

        let deleted = reconciler(&store, &compute)
            .with_config(ReconcileConfig::default().with_concurrency(3))
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 2);
        assert_eq!(store.remaining(Collection::Servers), ["b"]);
    }

    #[tokio::test]
    async fn oversized_concurrency_does_not_panic() {
        let store = Arc::new(FakeStore::default().with(
            Collection::Servers,
            vec![doc("a", Some(1)), doc("b", None)],
        ));
        let compute = Arc::new(FakeCompute::default());
        let config = ReconcileConfig {
            concurrency: usize::MAX,
            ..ReconcileConfig::default()
        };

        let deleted = reconciler(&store, &compute)
            .with_config(config)
            .reconcile_collection(Collection::Servers)
            .await;

        assert_eq!(deleted, 2);
    }

    #[test]
    fn report_serializes() {
        let report = ReconcileReport {
            deleted: vec![(Collection::Servers, 2), (Collection::ServerIps, 0)],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["deleted"][0][0], "servers");
        assert_eq!(json["deleted"][0][1], 2);
    }
}
