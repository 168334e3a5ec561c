//! Worker pool: one concurrent worker per item task, joined as a group.
//!
//! All workers live in a `JoinSet`, so dropping the pool aborts anything
//! still running and `join_all` / `run_until` return only after every
//! launched worker has produced its outcome.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use restock_core::{ItemTask, WorkerOutcome};
use restock_telemetry::Metrics;

use crate::error::{EngineError, EngineResult};
use crate::worker::{ItemWorker, WorkerContext};

/// Identity of a launched worker within its pool.
pub type WorkerId = usize;

/// A running worker as seen by the pool.
#[derive(Debug)]
pub struct WorkerHandle {
    id: WorkerId,
    task: ItemTask,
    cancel: CancellationToken,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn task(&self) -> &ItemTask {
        &self.task
    }

    /// Cancel this worker only.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Terminal report for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: WorkerId,
    pub task: ItemTask,
    pub outcome: WorkerOutcome,
}

/// Outcomes of every worker a pool launched, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub workers: Vec<WorkerReport>,
}

impl PoolReport {
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn purchased(&self) -> usize {
        self.count(|o| matches!(o, WorkerOutcome::Purchased))
    }

    pub fn exhausted(&self) -> usize {
        self.count(|o| matches!(o, WorkerOutcome::Exhausted))
    }

    pub fn aborted(&self) -> usize {
        self.count(|o| matches!(o, WorkerOutcome::Aborted(_)))
    }

    /// Outcome of the worker whose task key (`sku@area`) matches.
    pub fn outcome_for(&self, key: &str) -> Option<&WorkerOutcome> {
        self.workers
            .iter()
            .find(|w| w.task.key() == key)
            .map(|w| &w.outcome)
    }

    fn count(&self, pred: impl Fn(&WorkerOutcome) -> bool) -> usize {
        self.workers.iter().filter(|w| pred(&w.outcome)).count()
    }
}

/// Launches and joins item workers.
pub struct WorkerPool {
    ctx: WorkerContext,
    root: CancellationToken,
    join_set: JoinSet<(WorkerId, WorkerOutcome)>,
    handles: HashMap<WorkerId, WorkerHandle>,
    next_id: WorkerId,
}

impl WorkerPool {
    pub fn new(ctx: WorkerContext) -> Self {
        Self::with_cancellation(ctx, CancellationToken::new())
    }

    /// Pool whose workers are cancelled when `root` is.
    pub fn with_cancellation(ctx: WorkerContext, root: CancellationToken) -> Self {
        Self {
            ctx,
            root,
            join_set: JoinSet::new(),
            handles: HashMap::new(),
            next_id: 0,
        }
    }

    /// Root cancellation token; cancelling it shuts the pool down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Fail unless the shared session is authenticated.
    ///
    /// Call once before launching; workers assume a valid session.
    pub async fn ensure_authenticated(&self) -> EngineResult<()> {
        if self.ctx.storefront.is_authenticated().await {
            Ok(())
        } else {
            Err(EngineError::NotAuthenticated)
        }
    }

    /// Launch one worker per task.
    ///
    /// The whole batch is validated first; on error nothing is launched.
    ///
    /// # Errors
    /// - `EngineError::NoTasks` if `tasks` is empty
    /// - `EngineError::DuplicateTask` if a `(sku, area)` pair repeats, within
    ///   the batch or against already launched workers
    /// - `EngineError::ShutDown` if the pool has been shut down
    pub fn launch_all(&mut self, tasks: Vec<ItemTask>) -> EngineResult<Vec<WorkerId>> {
        if self.root.is_cancelled() {
            return Err(EngineError::ShutDown);
        }
        if tasks.is_empty() {
            return Err(EngineError::NoTasks);
        }

        let mut seen: HashSet<String> = self.handles.values().map(|h| h.task.key()).collect();
        for task in &tasks {
            if !seen.insert(task.key()) {
                return Err(EngineError::DuplicateTask(task.key()));
            }
        }

        Ok(tasks.into_iter().map(|task| self.spawn(task)).collect())
    }

    fn spawn(&mut self, task: ItemTask) -> WorkerId {
        let id = self.next_id;
        self.next_id += 1;

        let cancel = self.root.child_token();
        let worker = ItemWorker::new(task.clone(), &self.ctx, cancel.clone());
        let sku = task.sku.clone();

        self.join_set.spawn(async move {
            let outcome = match AssertUnwindSafe(worker.run()).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(%sku, %reason, "Worker panicked");
                    Metrics::worker_outcome("aborted");
                    WorkerOutcome::Aborted(format!("worker panicked: {reason}"))
                }
            };
            (id, outcome)
        });

        info!(worker_id = id, sku = %task.sku, area = %task.area, "Item monitor started");
        self.handles.insert(id, WorkerHandle { id, task, cancel });
        id
    }

    /// Number of workers that have not reported yet.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Workers that have not reported yet.
    pub fn handles(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.handles.values()
    }

    /// Cancel every worker. Each stops at its next suspension point.
    pub fn shutdown(&self) {
        if !self.root.is_cancelled() {
            info!(active = self.handles.len(), "Worker pool shutdown requested");
            self.root.cancel();
        }
    }

    /// Wait for the next worker to finish.
    ///
    /// Returns `None` once every launched worker has reported.
    pub async fn next_outcome(&mut self) -> Option<WorkerReport> {
        while let Some(joined) = self.join_set.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Some(handle) = self.handles.remove(&id) {
                        info!(worker_id = id, sku = %handle.task.sku, %outcome, "Worker finished");
                        return Some(WorkerReport {
                            id,
                            task: handle.task,
                            outcome,
                        });
                    }
                }
                // Panics are caught inside the task; this is an external abort.
                Err(e) => warn!(error = %e, "Worker task join error"),
            }
        }

        // Any handle left here lost its task to an abort.
        let id = self.handles.keys().copied().min()?;
        let handle = self.handles.remove(&id)?;
        Metrics::worker_outcome("aborted");
        Some(WorkerReport {
            id,
            task: handle.task,
            outcome: WorkerOutcome::Aborted("worker task was aborted".to_string()),
        })
    }

    /// Wait for every worker to finish.
    pub async fn join_all(self) -> PoolReport {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Wait for every worker, shutting the pool down when `signal` completes.
    pub async fn run_until<F>(mut self, signal: F) -> PoolReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(signal);
        let mut report = PoolReport::default();

        loop {
            tokio::select! {
                next = self.next_outcome() => match next {
                    Some(worker) => report.workers.push(worker),
                    None => break,
                },
                () = &mut signal, if !self.root.is_cancelled() => {
                    info!("Shutdown signal received");
                    self.shutdown();
                }
            }
        }

        info!(
            workers = report.len(),
            purchased = report.purchased(),
            exhausted = report.exhausted(),
            aborted = report.aborted(),
            "Worker pool finished"
        );
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PausedClock;
    use chrono::{TimeZone, Utc};
    use restock_core::{AreaId, RetryPolicy, SkuId};
    use restock_session::{MockNotifier, MockStorefront};
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx(store: Arc<MockStorefront>) -> WorkerContext {
        let origin = Utc.with_ymd_and_hms(2022, 8, 6, 0, 0, 0).unwrap();
        WorkerContext::new(store, Arc::new(MockNotifier::new()))
            .with_clock(Arc::new(PausedClock::starting_at(origin)))
    }

    fn task(sku: &str, area: &str) -> ItemTask {
        ItemTask::new(
            SkuId::new(sku).unwrap(),
            AreaId::new(area).unwrap(),
            1,
            Duration::from_secs(1),
            RetryPolicy::new(1, Duration::from_secs(1)).unwrap(),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let mut pool = WorkerPool::new(ctx(Arc::new(MockStorefront::new())));
        assert_eq!(pool.launch_all(Vec::new()), Err(EngineError::NoTasks));
    }

    #[tokio::test]
    async fn test_duplicate_rejected_before_any_launch() {
        let mut pool = WorkerPool::new(ctx(Arc::new(MockStorefront::new())));
        let result = pool.launch_all(vec![task("1", "a"), task("2", "a"), task("1", "a")]);
        assert_eq!(result, Err(EngineError::DuplicateTask("1@a".into())));
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_same_sku_different_area_allowed() {
        let store = Arc::new(MockStorefront::new());
        let mut pool = WorkerPool::new(ctx(store));
        let ids = pool.launch_all(vec![task("1", "a"), task("1", "b")]).unwrap();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(pool.len(), 2);
        pool.shutdown();
        assert_eq!(pool.join_all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_launch_after_shutdown_rejected() {
        let mut pool = WorkerPool::new(ctx(Arc::new(MockStorefront::new())));
        pool.shutdown();
        assert_eq!(
            pool.launch_all(vec![task("1", "a")]),
            Err(EngineError::ShutDown)
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_session_rejected() {
        let store = Arc::new(MockStorefront::new());
        store.set_authenticated(false);
        let pool = WorkerPool::new(ctx(store));
        assert_eq!(
            pool.ensure_authenticated().await,
            Err(EngineError::NotAuthenticated)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_worker_cancel_leaves_others_running() {
        let store = Arc::new(MockStorefront::new());
        let mut pool = WorkerPool::new(ctx(store.clone()));
        pool.launch_all(vec![task("1", "a"), task("2", "a")]).unwrap();

        let first = pool.handles().find(|h| h.task().sku.as_str() == "1").unwrap();
        first.cancel();

        let report = pool.next_outcome().await.unwrap();
        assert_eq!(report.task.sku.as_str(), "1");
        assert_eq!(report.outcome, WorkerOutcome::Exhausted);
        assert_eq!(pool.len(), 1);

        pool.shutdown();
        let rest = pool.join_all().await;
        assert_eq!(rest.exhausted(), 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
