//! End-to-end worker pool behavior against scripted collaborators.
//!
//! All tests run on paused tokio time with a `PausedClock`, so schedules,
//! polling intervals and retry delays are exact and instantaneous.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

use restock_core::{AreaId, ItemTask, RetryPolicy, SkuId, WorkerOutcome};
use restock_engine::{
    PausedClock, SubmissionAttempt, SubmitOutcome, WorkerContext, WorkerPool,
};
use restock_session::{
    BoxFuture, CallKind, MockNotifier, MockStorefront, SessionError, SessionResult, Storefront,
};
use tokio_util::sync::CancellationToken;

const AREA: &str = "1_72_2799_0";

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 8, 6, 12, 0, 0).unwrap()
}

fn sku(id: &str) -> SkuId {
    SkuId::new(id).unwrap()
}

fn task_at(id: &str, buy_time: DateTime<Utc>, attempts: u32) -> ItemTask {
    ItemTask::new(
        sku(id),
        AreaId::new(AREA).unwrap(),
        1,
        Duration::from_secs(3),
        RetryPolicy::new(attempts, Duration::from_secs(5)).unwrap(),
        buy_time,
    )
    .unwrap()
}

fn task(id: &str) -> ItemTask {
    task_at(id, origin() - chrono::Duration::minutes(1), 3)
}

struct Harness {
    store: Arc<MockStorefront>,
    notifier: Arc<MockNotifier>,
    pool: WorkerPool,
}

/// Must be called inside a paused runtime so the clock starts at `origin()`.
fn harness() -> Harness {
    let store = Arc::new(MockStorefront::new());
    let notifier = Arc::new(MockNotifier::new());
    let ctx = WorkerContext::new(store.clone(), notifier.clone())
        .with_clock(Arc::new(PausedClock::starting_at(origin())));
    Harness {
        store,
        notifier,
        pool: WorkerPool::new(ctx),
    }
}

// --- Isolation ---

#[tokio::test(start_paused = true)]
async fn failing_item_does_not_block_others() {
    let mut h = harness();
    let ids: Vec<String> = (0..5).map(|i| format!("10{i}")).collect();
    let broken = sku("102");

    for id in &ids {
        let s = sku(id);
        if s == broken {
            h.store.script_stock(
                &s,
                [],
                Err(SessionError::HttpClient("connection reset".into())),
            );
        } else {
            h.store.script_stock(&s, [], Ok(true));
            h.store.script_submit(&s, [], Ok(true));
        }
    }
    h.pool
        .launch_all(ids.iter().map(|id| task(id)).collect())
        .unwrap();

    for _ in 0..ids.len() - 1 {
        let report = h.pool.next_outcome().await.unwrap();
        assert_ne!(report.task.sku, broken);
        assert_eq!(report.outcome, WorkerOutcome::Purchased);
    }

    // The broken worker keeps polling on its own.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.pool.len(), 1);
    assert!(h.store.count(&broken, CallKind::CheckStock) >= 10);
    assert_eq!(h.store.count(&broken, CallKind::Submit), 0);

    h.pool.shutdown();
    let rest = h.pool.join_all().await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest.outcome_for(&format!("102@{AREA}")), Some(&WorkerOutcome::Exhausted));
    assert_eq!(h.notifier.sent().len(), ids.len() - 1);
}

#[tokio::test(start_paused = true)]
async fn panicking_item_is_aborted_alone() {
    let mut h = harness();
    let panicky = sku("200");
    h.store.panic_on_stock_check(&panicky);
    for id in ["201", "202"] {
        h.store.script_stock(&sku(id), [], Ok(true));
        h.store.script_submit(&sku(id), [], Ok(true));
    }

    h.pool
        .launch_all(vec![task("200"), task("201"), task("202")])
        .unwrap();
    let report = h.pool.join_all().await;

    assert_eq!(report.len(), 3);
    assert_eq!(report.purchased(), 2);
    assert_eq!(report.aborted(), 1);
    assert!(matches!(
        report.outcome_for(&format!("200@{AREA}")),
        Some(WorkerOutcome::Aborted(reason)) if reason.contains("panicked")
    ));
}

// --- Scheduling ---

#[tokio::test(start_paused = true)]
async fn future_buy_time_delays_first_stock_check() {
    let mut h = harness();
    let start = Instant::now();
    let buy_time = origin() + chrono::Duration::minutes(10);
    let s = sku("300");
    h.store.script_stock(&s, [], Ok(true));
    h.store.script_submit(&s, [], Ok(true));

    h.pool.launch_all(vec![task_at("300", buy_time, 3)]).unwrap();
    let report = h.pool.join_all().await;
    assert_eq!(report.purchased(), 1);

    let first = h.store.call_times(&s, CallKind::CheckStock)[0];
    let waited = first - start;
    assert!(waited >= Duration::from_secs(600));
    assert!(waited < Duration::from_secs(601));
}

#[tokio::test(start_paused = true)]
async fn past_buy_time_checks_stock_immediately() {
    let mut h = harness();
    let start = Instant::now();
    let s = sku("301");
    h.store.script_stock(&s, [], Ok(true));
    h.store.script_submit(&s, [], Ok(true));

    let stale = origin() - chrono::Duration::days(365 * 50);
    h.pool.launch_all(vec![task_at("301", stale, 3)]).unwrap();
    h.pool.join_all().await;

    let first = h.store.call_times(&s, CallKind::CheckStock)[0];
    assert!(first - start < Duration::from_secs(3));
}

// --- Retry bound ---

#[tokio::test(start_paused = true)]
async fn submission_makes_exactly_retry_count_calls() {
    let store = MockStorefront::new();
    let t = task_at("400", origin(), 4);

    let start = Instant::now();
    let outcome = SubmissionAttempt::new(t.retry)
        .run(&store, &t, &CancellationToken::new())
        .await;
    assert_eq!(outcome, SubmitOutcome::Exhausted { attempts: 4 });

    let times = store.call_times(&t.sku, CallKind::Submit);
    assert_eq!(times.len(), 4);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= t.retry.interval);
    }
    assert_eq!(start.elapsed(), t.retry.interval * 3);
}

// --- Resume after exhaustion ---

#[tokio::test(start_paused = true)]
async fn exhausted_batch_resumes_polling() {
    let mut h = harness();
    let s = sku("500");
    let retry = 3;
    h.store.script_stock(&s, [Ok(true), Ok(true)], Ok(false));
    h.store
        .script_submit(&s, std::iter::repeat(Ok(false)).take(retry), Ok(true));

    h.pool.launch_all(vec![task_at("500", origin(), retry as u32)]).unwrap();
    let report = h.pool.join_all().await;
    assert_eq!(report.purchased(), 1);

    let mut expected = vec![CallKind::Prepare, CallKind::CheckStock];
    expected.extend(std::iter::repeat(CallKind::Submit).take(retry));
    expected.extend([CallKind::CheckStock, CallKind::Submit]);
    assert_eq!(h.store.kinds_for(&s), expected);
}

// --- Notification once ---

#[tokio::test(start_paused = true)]
async fn each_purchase_notifies_exactly_once() {
    let mut h = harness();
    // 600 buys straight away; 601 needs two exhausted batches first.
    h.store.script_stock(&sku("600"), [], Ok(true));
    h.store.script_submit(&sku("600"), [], Ok(true));
    h.store.script_stock(&sku("601"), [], Ok(true));
    h.store.script_submit(
        &sku("601"),
        std::iter::repeat(Ok(false)).take(6),
        Ok(true),
    );
    // 602 never comes back in stock.
    h.store.script_stock(&sku("602"), [], Ok(false));

    h.pool
        .launch_all(vec![task("600"), task("601"), task("602")])
        .unwrap();

    let mut purchased = 0;
    while purchased < 2 {
        let report = h.pool.next_outcome().await.unwrap();
        assert_eq!(report.outcome, WorkerOutcome::Purchased);
        purchased += 1;
    }
    h.pool.shutdown();
    h.pool.join_all().await;

    assert_eq!(h.notifier.count_mentioning("600"), 1);
    assert_eq!(h.notifier.count_mentioning("601"), 1);
    assert_eq!(h.notifier.count_mentioning("602"), 0);
    assert_eq!(h.notifier.sent().len(), 2);
}

// --- Concurrency ---

/// Storefront whose calls each take a fixed latency before succeeding.
struct SlowStorefront {
    latency: Duration,
}

impl Storefront for SlowStorefront {
    fn is_authenticated(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }

    fn prepare_item<'a>(&'a self, _sku: &'a SkuId) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn check_stock<'a>(
        &'a self,
        _sku: &'a SkuId,
        _quantity: u32,
        _area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>> {
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            Ok(true)
        })
    }

    fn submit_order<'a>(
        &'a self,
        _sku: &'a SkuId,
        _quantity: u32,
        _area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>> {
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            Ok(true)
        })
    }
}

#[tokio::test(start_paused = true)]
async fn fifty_items_run_in_parallel() {
    let latency = Duration::from_millis(200);
    let notifier = Arc::new(MockNotifier::new());
    let ctx = WorkerContext::new(Arc::new(SlowStorefront { latency }), notifier.clone())
        .with_clock(Arc::new(PausedClock::starting_at(origin())));
    let mut pool = WorkerPool::new(ctx);

    let tasks: Vec<ItemTask> = (0..50).map(|i| task(&format!("7{i:02}"))).collect();
    pool.launch_all(tasks).unwrap();

    let start = Instant::now();
    let report = pool.join_all().await;
    let elapsed = start.elapsed();

    assert_eq!(report.len(), 50);
    assert_eq!(report.purchased(), 50);
    assert_eq!(notifier.sent().len(), 50);
    // One item's loop is a stock check plus a submit.
    assert!(elapsed >= latency * 2);
    assert!(elapsed < latency * 4);
}
