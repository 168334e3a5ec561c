//! Item worker: drives one item task through its state machine.
//!
//! ```text
//! Scheduled -> Polling -> Submitting -> Purchased
//!                 ^           |
//!                 +-----------+  (batch exhausted)
//! ```
//!
//! Cancellation at any suspension point ends the run as `Exhausted`; a
//! failed item preparation ends it as `Aborted`. The purchase notification
//! is sent exactly once, on entering `Purchased`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use restock_core::{ItemTask, WorkerOutcome, WorkerPhase};
use restock_session::{Notifier, Storefront};
use restock_telemetry::Metrics;

use crate::clock::{nap, Clock, SystemClock, Wake};
use crate::gate::{GateResult, ScheduleGate, DEFAULT_MAX_NAP};
use crate::poller::{AvailabilityPoller, PollOutcome};
use crate::submit::{SubmissionAttempt, SubmitOutcome};

/// Default notification title.
pub const DEFAULT_NOTIFY_TITLE: &str = "restock";

/// Run-wide worker settings.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Stop as `Exhausted` after this many exhausted submission batches.
    /// `None` keeps polling until purchase or cancellation.
    pub max_rounds: Option<u32>,
    /// Longest single sleep of the schedule gate.
    pub gate_max_nap: Duration,
    /// Title of the purchase notification.
    pub notify_title: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_rounds: None,
            gate_max_nap: DEFAULT_MAX_NAP,
            notify_title: DEFAULT_NOTIFY_TITLE.to_string(),
        }
    }
}

/// Collaborators shared by every worker of a run.
#[derive(Clone)]
pub struct WorkerContext {
    pub storefront: Arc<dyn Storefront>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub settings: WorkerSettings,
}

impl WorkerContext {
    /// Context with the system clock and default settings.
    pub fn new(storefront: Arc<dyn Storefront>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storefront,
            notifier,
            clock: Arc::new(SystemClock),
            settings: WorkerSettings::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Purchase notification body for `task`.
pub fn purchase_message(task: &ItemTask) -> String {
    format!(
        "Item {} has been ordered, please pay for it promptly",
        task.sku
    )
}

/// Holds one slot of the active-worker gauge until dropped.
///
/// Dropped on normal return, on panic unwind and when the task is aborted.
struct ActiveGuard;

impl ActiveGuard {
    fn new() -> Self {
        Metrics::worker_started();
        Self
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        Metrics::worker_finished();
    }
}

/// Drives one `ItemTask` from `Scheduled` to a terminal outcome.
pub struct ItemWorker {
    task: ItemTask,
    storefront: Arc<dyn Storefront>,
    notifier: Arc<dyn Notifier>,
    gate: ScheduleGate,
    settings: WorkerSettings,
    cancel: CancellationToken,
    phase: WorkerPhase,
}

impl ItemWorker {
    pub fn new(task: ItemTask, ctx: &WorkerContext, cancel: CancellationToken) -> Self {
        Self {
            task,
            storefront: ctx.storefront.clone(),
            notifier: ctx.notifier.clone(),
            gate: ScheduleGate::with_max_nap(ctx.clock.clone(), ctx.settings.gate_max_nap),
            settings: ctx.settings.clone(),
            cancel,
            phase: WorkerPhase::Scheduled,
        }
    }

    pub fn task(&self) -> &ItemTask {
        &self.task
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Run to completion and return the terminal outcome.
    pub async fn run(mut self) -> WorkerOutcome {
        let span = info_span!("worker", sku = %self.task.sku, area = %self.task.area);
        async move {
            let _active = ActiveGuard::new();
            info!(
                quantity = self.task.quantity,
                buy_time = %self.task.buy_time,
                "Worker scheduled"
            );

            let outcome = self.drive().await;
            self.transition(outcome.phase());

            match &outcome {
                WorkerOutcome::Purchased => self.notify_purchase().await,
                WorkerOutcome::Exhausted => info!("Worker stopped without purchase"),
                WorkerOutcome::Aborted(reason) => error!(%reason, "Worker aborted"),
            }

            Metrics::worker_outcome(outcome.phase().as_str());
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> WorkerOutcome {
        if let Err(e) = self.storefront.prepare_item(&self.task.sku).await {
            return WorkerOutcome::Aborted(format!("failed to prepare item: {e}"));
        }

        if self.gate.wait_until(self.task.buy_time, &self.cancel).await == GateResult::Cancelled {
            return WorkerOutcome::Exhausted;
        }

        let poller = AvailabilityPoller::new(self.task.stock_interval);
        let submitter = SubmissionAttempt::new(self.task.retry);
        let mut rounds = 0u32;

        loop {
            self.transition(WorkerPhase::Polling);
            let poll = poller
                .poll_until_available(self.storefront.as_ref(), &self.task, &self.cancel)
                .await;
            if let PollOutcome::Cancelled { .. } = poll {
                return WorkerOutcome::Exhausted;
            }

            self.transition(WorkerPhase::Submitting);
            match submitter
                .run(self.storefront.as_ref(), &self.task, &self.cancel)
                .await
            {
                SubmitOutcome::Placed { .. } => return WorkerOutcome::Purchased,
                SubmitOutcome::Cancelled { .. } => return WorkerOutcome::Exhausted,
                SubmitOutcome::Exhausted { attempts } => {
                    rounds += 1;
                    if self.settings.max_rounds.is_some_and(|max| rounds >= max) {
                        warn!(rounds, "Submission round limit reached");
                        return WorkerOutcome::Exhausted;
                    }
                    info!(
                        attempts,
                        rounds, "Submission batch exhausted, resuming stock polling"
                    );
                }
            }

            if nap(self.task.stock_interval, &self.cancel).await == Wake::Cancelled {
                return WorkerOutcome::Exhausted;
            }
        }
    }

    fn transition(&mut self, next: WorkerPhase) {
        if self.phase != next {
            info!(from = %self.phase, to = %next, "Worker phase transition");
            self.phase = next;
        }
    }

    async fn notify_purchase(&self) {
        let message = purchase_message(&self.task);
        match self
            .notifier
            .notify(&self.settings.notify_title, &message)
            .await
        {
            Ok(()) => {
                Metrics::notification("sent");
                info!("Purchase notification sent");
            }
            Err(e) => {
                Metrics::notification("failed");
                warn!(error = %e, "Purchase notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PausedClock;
    use chrono::{TimeZone, Utc};
    use restock_core::{AreaId, RetryPolicy, SkuId};
    use restock_session::{CallKind, MockNotifier, MockStorefront, SessionError};

    struct Harness {
        store: Arc<MockStorefront>,
        notifier: Arc<MockNotifier>,
        ctx: WorkerContext,
    }

    fn origin() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, 6, 0, 0, 0).unwrap()
    }

    fn harness(settings: WorkerSettings) -> Harness {
        let store = Arc::new(MockStorefront::new());
        let notifier = Arc::new(MockNotifier::new());
        let ctx = WorkerContext::new(store.clone(), notifier.clone())
            .with_clock(Arc::new(PausedClock::starting_at(origin())))
            .with_settings(settings);
        Harness {
            store,
            notifier,
            ctx,
        }
    }

    fn task(sku: &str) -> ItemTask {
        ItemTask::new(
            SkuId::new(sku).unwrap(),
            AreaId::new("1_72_2799_0").unwrap(),
            1,
            Duration::from_secs(3),
            RetryPolicy::new(2, Duration::from_secs(1)).unwrap(),
            origin(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_purchase_notifies_once() {
        let h = harness(WorkerSettings::default());
        let task = task("300");
        h.store.script_stock(&task.sku, [Ok(false)], Ok(true));
        h.store.script_submit(&task.sku, [], Ok(true));

        let worker = ItemWorker::new(task.clone(), &h.ctx, CancellationToken::new());
        assert_eq!(worker.phase(), WorkerPhase::Scheduled);
        assert_eq!(worker.run().await, WorkerOutcome::Purchased);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, DEFAULT_NOTIFY_TITLE);
        assert!(sent[0].message.contains("300"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_failure_aborts_without_polling() {
        let h = harness(WorkerSettings::default());
        let task = task("301");
        h.store
            .fail_prepare(&task.sku, SessionError::ItemNotFound("301".into()));

        let outcome = ItemWorker::new(task.clone(), &h.ctx, CancellationToken::new())
            .run()
            .await;
        assert!(matches!(outcome, WorkerOutcome::Aborted(ref r) if r.contains("301")));
        assert_eq!(h.store.count(&task.sku, CallKind::CheckStock), 0);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_failure_is_not_fatal() {
        let h = harness(WorkerSettings::default());
        h.notifier.set_failing(true);
        let task = task("302");
        h.store.script_stock(&task.sku, [], Ok(true));
        h.store.script_submit(&task.sku, [], Ok(true));

        let outcome = ItemWorker::new(task, &h.ctx, CancellationToken::new())
            .run()
            .await;
        assert_eq!(outcome, WorkerOutcome::Purchased);
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_limit_exhausts() {
        let h = harness(WorkerSettings {
            max_rounds: Some(2),
            ..WorkerSettings::default()
        });
        let task = task("303");
        h.store.script_stock(&task.sku, [], Ok(true));

        let outcome = ItemWorker::new(task.clone(), &h.ctx, CancellationToken::new())
            .run()
            .await;
        assert_eq!(outcome, WorkerOutcome::Exhausted);
        assert_eq!(h.store.count(&task.sku, CallKind::CheckStock), 2);
        assert_eq!(h.store.count(&task.sku, CallKind::Submit), 4);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_while_scheduled_is_exhausted() {
        let h = harness(WorkerSettings::default());
        let mut task = task("304");
        task.buy_time = origin() + chrono::Duration::hours(1);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ItemWorker::new(task.clone(), &h.ctx, cancel.clone()).run());
        tokio::time::sleep(Duration::from_secs(30)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), WorkerOutcome::Exhausted);
        assert_eq!(h.store.count(&task.sku, CallKind::CheckStock), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_between_submit_attempts_is_exhausted() {
        let h = harness(WorkerSettings::default());
        let mut task = task("305");
        task.retry = RetryPolicy::new(5, Duration::from_secs(5)).unwrap();
        h.store.script_stock(&task.sku, [], Ok(true));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ItemWorker::new(task.clone(), &h.ctx, cancel.clone()).run());
        // Attempts land at t=0s and t=5s; t=7s is inside the second delay.
        tokio::time::sleep(Duration::from_secs(7)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), WorkerOutcome::Exhausted);
        assert_eq!(h.store.count(&task.sku, CallKind::Submit), 2);
        assert!(h.notifier.sent().is_empty());
    }
}
