//! Scripted collaborators for testing.
//!
//! `MockStorefront` replays per-item reply scripts and records every call
//! with its (tokio) timestamp, so tests running on a paused clock can assert
//! on call counts and spacing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;

use restock_core::{AreaId, SkuId};

use crate::error::{SessionError, SessionResult};
use crate::notifier::Notifier;
use crate::storefront::{BoxFuture, Storefront};

/// Kind of storefront call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Prepare,
    CheckStock,
    Submit,
}

/// One recorded storefront call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub sku: SkuId,
    pub kind: CallKind,
    pub at: Instant,
}

/// Queued replies followed by a fallback repeated forever.
#[derive(Debug, Clone)]
struct Script {
    queued: VecDeque<SessionResult<bool>>,
    fallback: SessionResult<bool>,
}

impl Script {
    fn constant(reply: SessionResult<bool>) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: reply,
        }
    }

    fn next(&mut self) -> SessionResult<bool> {
        self.queued
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Mock storefront for testing.
///
/// Unscripted items are out of stock and every submit is rejected.
#[derive(Debug)]
pub struct MockStorefront {
    authenticated: AtomicBool,
    stock: Mutex<HashMap<SkuId, Script>>,
    submit: Mutex<HashMap<SkuId, Script>>,
    prepare_failures: Mutex<HashMap<SkuId, SessionError>>,
    panic_on_check: Mutex<HashSet<SkuId>>,
    calls: Mutex<Vec<CallRecord>>,
}

impl Default for MockStorefront {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorefront {
    /// Create an authenticated mock with empty scripts.
    pub fn new() -> Self {
        Self {
            authenticated: AtomicBool::new(true),
            stock: Mutex::new(HashMap::new()),
            submit: Mutex::new(HashMap::new()),
            prepare_failures: Mutex::new(HashMap::new()),
            panic_on_check: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    /// Script stock replies for `sku`: `replies` in order, then `fallback`.
    pub fn script_stock(
        &self,
        sku: &SkuId,
        replies: impl IntoIterator<Item = SessionResult<bool>>,
        fallback: SessionResult<bool>,
    ) {
        self.stock.lock().insert(
            sku.clone(),
            Script {
                queued: replies.into_iter().collect(),
                fallback,
            },
        );
    }

    /// Script submit replies for `sku`: `replies` in order, then `fallback`.
    pub fn script_submit(
        &self,
        sku: &SkuId,
        replies: impl IntoIterator<Item = SessionResult<bool>>,
        fallback: SessionResult<bool>,
    ) {
        self.submit.lock().insert(
            sku.clone(),
            Script {
                queued: replies.into_iter().collect(),
                fallback,
            },
        );
    }

    /// Make `prepare_item` fail for `sku`.
    pub fn fail_prepare(&self, sku: &SkuId, error: SessionError) {
        self.prepare_failures.lock().insert(sku.clone(), error);
    }

    /// Make `check_stock` panic for `sku`.
    pub fn panic_on_stock_check(&self, sku: &SkuId) {
        self.panic_on_check.lock().insert(sku.clone());
    }

    /// All recorded calls in call order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().clone()
    }

    /// Timestamps of calls of `kind` for `sku`.
    pub fn call_times(&self, sku: &SkuId, kind: CallKind) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|c| &c.sku == sku && c.kind == kind)
            .map(|c| c.at)
            .collect()
    }

    /// Number of calls of `kind` for `sku`.
    pub fn count(&self, sku: &SkuId, kind: CallKind) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| &c.sku == sku && c.kind == kind)
            .count()
    }

    /// Sequence of call kinds for `sku`.
    pub fn kinds_for(&self, sku: &SkuId) -> Vec<CallKind> {
        self.calls
            .lock()
            .iter()
            .filter(|c| &c.sku == sku)
            .map(|c| c.kind)
            .collect()
    }

    fn record(&self, sku: &SkuId, kind: CallKind) {
        self.calls.lock().push(CallRecord {
            sku: sku.clone(),
            kind,
            at: Instant::now(),
        });
    }
}

impl Storefront for MockStorefront {
    fn is_authenticated(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.authenticated.load(Ordering::SeqCst) })
    }

    fn prepare_item<'a>(&'a self, sku: &'a SkuId) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            self.record(sku, CallKind::Prepare);
            match self.prepare_failures.lock().get(sku) {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        })
    }

    fn check_stock<'a>(
        &'a self,
        sku: &'a SkuId,
        _quantity: u32,
        _area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>> {
        Box::pin(async move {
            self.record(sku, CallKind::CheckStock);
            if self.panic_on_check.lock().contains(sku) {
                panic!("scripted panic in check_stock for {sku}");
            }
            self.stock
                .lock()
                .entry(sku.clone())
                .or_insert_with(|| Script::constant(Ok(false)))
                .next()
        })
    }

    fn submit_order<'a>(
        &'a self,
        sku: &'a SkuId,
        _quantity: u32,
        _area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>> {
        Box::pin(async move {
            self.record(sku, CallKind::Submit);
            self.submit
                .lock()
                .entry(sku.clone())
                .or_insert_with(|| Script::constant(Ok(false)))
                .next()
        })
    }
}

/// Recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub title: String,
    pub message: String,
}

/// Mock notifier recording every delivery attempt.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentNotification>>,
    fail: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery attempt fail (attempts are still recorded).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }

    /// Number of attempts whose message mentions `needle`.
    pub fn count_mentioning(&self, needle: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.message.contains(needle))
            .count()
    }
}

impl Notifier for MockNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            self.sent.lock().push(SentNotification {
                title: title.to_string(),
                message: message.to_string(),
            });
            if self.fail.load(Ordering::SeqCst) {
                Err(SessionError::Notify("scripted failure".to_string()))
            } else {
                Ok(())
            }
        })
    }
}
