//! Storefront session trait.
//!
//! The engine never talks to the storefront directly; it calls an injected
//! `Storefront`. Implementations must be safe to call from many workers at
//! once: every worker shares one authenticated session.

use std::future::Future;
use std::pin::Pin;

use restock_core::{AreaId, SkuId};

use crate::error::SessionResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Authenticated storefront session.
///
/// Shared as `Arc<dyn Storefront>` by every worker for the whole run.
pub trait Storefront: Send + Sync {
    /// Whether the session holds valid credentials.
    ///
    /// Queried once before any worker starts.
    fn is_authenticated(&self) -> BoxFuture<'_, bool>;

    /// Fetch item details needed before ordering.
    ///
    /// Called once per worker before it waits for the buy time.
    fn prepare_item<'a>(&'a self, sku: &'a SkuId) -> BoxFuture<'a, SessionResult<()>>;

    /// Check whether `quantity` units of `sku` can be bought for `area` now.
    fn check_stock<'a>(
        &'a self,
        sku: &'a SkuId,
        quantity: u32,
        area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>>;

    /// Submit one order. Returns `Ok(true)` iff an order was placed.
    ///
    /// Single attempt; bounded retry is the caller's concern.
    fn submit_order<'a>(
        &'a self,
        sku: &'a SkuId,
        quantity: u32,
        area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>>;
}
