//! Restock purchasing bot.
//!
//! Main application wiring the engine to real collaborators:
//! - Settings (TOML + `RESTOCK__` environment overrides)
//! - Shopping cart JSON to validated item tasks
//! - Storefront session and push notifier selection
//! - Worker pool launch and ctrl-c shutdown

pub mod app;
pub mod cart;
pub mod config;
pub mod error;

pub use app::Application;
pub use cart::{CartConfig, GoodEntry, IdValue, DEFAULT_CART_PATH};
pub use config::{AppConfig, DEFAULT_SETTINGS_PATH};
pub use error::{AppError, AppResult};
