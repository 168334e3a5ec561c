//! Main application orchestration.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use restock_core::ItemTask;
use restock_engine::{
    Clock, EngineError, PoolReport, SystemClock, WorkerContext, WorkerPool, WorkerSettings,
};
use restock_session::{
    HttpStorefront, LogNotifier, Notifier, ServerChanNotifier, Storefront,
};
use restock_telemetry::Metrics;

use crate::cart::CartConfig;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Main application state.
pub struct Application {
    config: AppConfig,
    tasks: Vec<ItemTask>,
    storefront: Arc<dyn Storefront>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl Application {
    /// Create the application with the HTTP storefront and the configured
    /// notifier.
    ///
    /// Every cart entry is validated here; nothing has been launched yet if
    /// this fails.
    pub fn new(config: AppConfig, cart: &CartConfig) -> AppResult<Self> {
        let storefront = Arc::new(HttpStorefront::new(config.storefront.to_http_config())?);

        let notifier: Arc<dyn Notifier> = match config.sckey().filter(|_| config.messenger.enable)
        {
            Some(key) => {
                info!("ServerChan push enabled");
                Arc::new(ServerChanNotifier::new(key)?)
            }
            None => {
                info!("Push disabled, notifications go to the log");
                Arc::new(LogNotifier)
            }
        };

        Self::with_collaborators(config, cart, storefront, notifier)
    }

    /// Create the application around existing collaborators.
    pub fn with_collaborators(
        config: AppConfig,
        cart: &CartConfig,
        storefront: Arc<dyn Storefront>,
        notifier: Arc<dyn Notifier>,
    ) -> AppResult<Self> {
        config.validate()?;
        let tasks = cart.to_tasks(&config.buyer)?;

        Ok(Self {
            config,
            tasks,
            storefront,
            notifier,
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validated item tasks, in cart order.
    pub fn tasks(&self) -> &[ItemTask] {
        &self.tasks
    }

    /// Run until every item finishes or ctrl-c is received.
    pub async fn run(self) -> AppResult<PoolReport> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until every item finishes or `signal` completes.
    ///
    /// # Errors
    /// - `AppError::NotAuthenticated` if the storefront session is not logged
    ///   in; no worker is started
    /// - `AppError::Engine` if the item batch cannot be launched
    pub async fn run_until<F>(self, signal: F) -> AppResult<PoolReport>
    where
        F: Future<Output = ()>,
    {
        let settings = WorkerSettings {
            max_rounds: self.config.buyer.max_rounds,
            ..WorkerSettings::default()
        };
        let ctx = WorkerContext::new(self.storefront.clone(), self.notifier.clone())
            .with_clock(self.clock.clone())
            .with_settings(settings);
        let mut pool = WorkerPool::new(ctx);

        pool.ensure_authenticated().await.map_err(|e| match e {
            EngineError::NotAuthenticated => AppError::NotAuthenticated,
            other => AppError::Engine(other),
        })?;
        info!("Storefront session authenticated");

        info!(
            items = self.tasks.len(),
            stock_interval_secs = self.config.buyer.stock_interval_secs,
            submit_retry = self.config.buyer.submit_retry,
            submit_interval_secs = self.config.buyer.submit_interval_secs,
            max_rounds = ?self.config.buyer.max_rounds,
            "Starting item monitors"
        );
        pool.launch_all(self.tasks)?;

        let report = pool.run_until(signal).await;

        for worker in &report.workers {
            info!(sku = %worker.task.sku, area = %worker.task.area, outcome = %worker.outcome, "Item result");
        }
        info!(
            purchased = report.purchased(),
            exhausted = report.exhausted(),
            aborted = report.aborted(),
            "Run complete"
        );
        match Metrics::gather_text() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to render metrics"),
        }

        Ok(report)
    }
}

/// Completes on ctrl-c. Never completes if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c, running until items finish");
        std::future::pending::<()>().await;
    }
}
