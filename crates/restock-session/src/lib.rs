//! Storefront session and notification collaborators for restock.
//!
//! The scheduling engine consumes these capabilities only through traits,
//! so every implementation here can be swapped for a test double.
//!
//! # Key Components
//!
//! - [`Storefront`]: Authenticated session (auth check, item prep, stock check, order submit)
//! - [`Notifier`]: Best-effort push notification sink
//! - [`HttpStorefront`]: JSON gateway adapter over reqwest
//! - [`ServerChanNotifier`]: WeChat push via ServerChan
//! - [`LogNotifier`]: Writes notifications to the log when push is disabled
//! - [`MockStorefront`], [`MockNotifier`]: Scripted doubles for tests

pub mod error;
pub mod http;
pub mod mock;
pub mod notifier;
pub mod storefront;

pub use error::{SessionError, SessionResult};
pub use http::{HttpStorefront, HttpStorefrontConfig};
pub use mock::{CallKind, CallRecord, MockNotifier, MockStorefront, SentNotification};
pub use notifier::{LogNotifier, Notifier, ServerChanNotifier};
pub use storefront::{BoxFuture, Storefront};
