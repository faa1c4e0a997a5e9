use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::alerts::actions::ActionDispatcher;
use crate::alerts::condition::{ConditionEvaluator, Evaluation};
use crate::alerts::event::Event;
use crate::alerts::registry::EventRegistry;
use crate::constants::{
    DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_FAILURE_WARN_THRESHOLD, DEFAULT_FETCH_TIMEOUT_MS,
    DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_POLL_INTERVAL_MS,
};
use crate::errors::{EngineError, Result};
use crate::market::{PriceOracle, Ticker};
use crate::monitoring::EngineMetrics;
use crate::utils::{with_timeout, EngineConfig};

/// What happens to a triggered event whose action reports failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFailurePolicy {
    /// Executed before the action runs; the action is attempted once
    #[default]
    MarkExecuted,
    /// Executed only after the action succeeds; re-evaluated next tick otherwise
    RetryNextTick,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    /// Deadline for one action invocation
    pub action_timeout: Duration,
    pub max_concurrent_fetches: usize,
    pub failure_policy: ActionFailurePolicy,
    /// Consecutive failed fetches before an event is reported; `None` disables it
    pub failure_warn_threshold: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            failure_policy: ActionFailurePolicy::default(),
            failure_warn_threshold: Some(DEFAULT_FAILURE_WARN_THRESHOLD),
        }
    }
}

impl From<&EngineConfig> for SchedulerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            fetch_timeout: config.fetch_timeout(),
            action_timeout: config.action_timeout(),
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            failure_policy: config.action_failure_policy,
            failure_warn_threshold: config.failure_warn_threshold,
        }
    }
}

/// Outcome of a single polling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Nothing pending, no fetch was made
    pub skipped: bool,
    pub evaluated: usize,
    pub triggered: usize,
    pub fetch_failures: usize,
    pub no_data: usize,
    pub actions_failed: usize,
    /// Events whose failure streak reached the warning threshold this pass
    pub failure_warnings: usize,
}

/// Periodically evaluates every pending event against fresh prices
#[derive(Clone)]
pub struct PollingScheduler {
    config: SchedulerConfig,
    registry: EventRegistry,
    oracle: Arc<dyn PriceOracle>,
    dispatcher: ActionDispatcher,
    metrics: Option<EngineMetrics>,
}

impl PollingScheduler {
    pub fn new(
        config: SchedulerConfig,
        registry: EventRegistry,
        oracle: Arc<dyn PriceOracle>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        let dispatcher = dispatcher.with_action_timeout(config.action_timeout);
        Self {
            config,
            registry,
            oracle,
            dispatcher,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Run one polling pass.
    ///
    /// Prices are fetched concurrently, bounded by `max_concurrent_fetches`,
    /// each under its own deadline. Results are then processed in registry
    /// order, so actions fire in the order their events were added.
    pub async fn tick(&self) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();

        let pending = self.registry.pending_snapshot().await;
        if pending.is_empty() {
            report.skipped = true;
            self.observe_tick(&report, started).await;
            return report;
        }

        let fetches = stream::iter(pending)
            .map(|event| async move {
                let price = self.fetch(&event).await;
                (event, price)
            })
            .buffered(self.config.max_concurrent_fetches.max(1))
            .collect::<Vec<_>>()
            .await;

        for (event, price) in fetches {
            report.evaluated += 1;

            let ticker = match price {
                Ok(ticker) => {
                    self.registry.record_fetch_success(event.id).await;
                    ticker
                }
                Err(e) => {
                    report.fetch_failures += 1;
                    if self.on_fetch_failure(&event, &e.to_string(), e.reason()).await {
                        report.failure_warnings += 1;
                    }
                    continue;
                }
            };

            match ConditionEvaluator::evaluate(&event.condition, &ticker) {
                Evaluation::NoData => {
                    report.no_data += 1;
                    debug!(event_id = event.id, pair = %event.pair, "No trade data yet, skipping");
                }
                Evaluation::NotMet => {}
                Evaluation::Triggered => match self.fire(&event, &ticker).await {
                    Some(true) => report.triggered += 1,
                    Some(false) => report.actions_failed += 1,
                    None => debug!(event_id = event.id, "Event already claimed, skipping"),
                },
            }
        }

        self.observe_tick(&report, started).await;
        report
    }

    async fn fetch(&self, event: &Event) -> Result<Ticker> {
        with_timeout(
            self.oracle.latest_price(&event.exchange, &event.pair),
            self.config.fetch_timeout,
            "latest_price",
        )
        .await
    }

    /// Returns true when this failure is the one that reaches the warning threshold
    async fn on_fetch_failure(&self, event: &Event, error: &str, reason: &str) -> bool {
        debug!(event_id = event.id, exchange = %event.exchange, "Price fetch failed: {}", error);

        if let Some(metrics) = &self.metrics {
            metrics.record_fetch_failure(&event.exchange, reason);
        }

        let Some(failures) = self.registry.record_fetch_failure(event.id).await else {
            return false;
        };

        if self.config.failure_warn_threshold != Some(failures) {
            return false;
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_failure_warning(&event.exchange);
        }

        warn!(
            event_id = event.id,
            exchange = %event.exchange,
            pair = %event.pair,
            failures,
            "📈 Price unavailable for {} consecutive polls: {}",
            failures,
            error
        );
        true
    }

    /// Claim, dispatch and settle a triggered event.
    ///
    /// `None` when another pass claimed the event first or it was removed.
    async fn fire(&self, event: &Event, ticker: &Ticker) -> Option<bool> {
        let policy = self.config.failure_policy;
        let claimed = self.registry.claim(event.id, ticker.last, policy).await?;

        let succeeded = self.dispatcher.dispatch(&claimed, ticker).await;
        self.registry
            .finish_dispatch(claimed.id, ticker.last, succeeded, policy)
            .await;

        if let Some(metrics) = &self.metrics {
            metrics.record_action(claimed.action.kind(), succeeded);
            if succeeded || policy == ActionFailurePolicy::MarkExecuted {
                metrics.record_trigger(&claimed.exchange);
            }
        }

        if succeeded {
            info!(
                event_id = claimed.id,
                "🔔 Event {} triggered on {} successfully",
                claimed.id,
                claimed.exchange
            );
        } else {
            warn!(
                event_id = claimed.id,
                action = claimed.action.kind(),
                "🔔 Event {} triggered on {} but its action failed",
                claimed.id,
                claimed.exchange
            );
        }

        Some(succeeded)
    }

    async fn observe_tick(&self, report: &TickReport, started: Instant) {
        let Some(metrics) = &self.metrics else {
            return;
        };

        let counter = self.registry.count().await;
        metrics.observe_tick(started.elapsed(), report.skipped, counter.pending());
    }

    /// Tick on the configured interval until `shutdown` flips to `true` or its
    /// sender goes away. A shutdown request also abandons a tick in progress.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            max_concurrent_fetches = self.config.max_concurrent_fetches,
            policy = ?self.config.failure_policy,
            "📈 Price polling started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.tick_until_shutdown(&mut shutdown).await {
                        Some(report) if !report.skipped => debug!(?report, "Tick complete"),
                        Some(_) => {}
                        None => {
                            let released = self.registry.release_in_flight().await;
                            warn!(released, "📈 Shutdown interrupted a polling pass");
                            break;
                        }
                    }
                }
            }
        }

        info!("📈 Price polling stopped");
    }

    /// Drive one tick, giving up as soon as shutdown is requested
    async fn tick_until_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> Option<TickReport> {
        let tick = self.tick();
        tokio::pin!(tick);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return None;
                    }
                }
                report = &mut tick => return Some(report),
            }
        }
    }

    /// Start the loop on its own task
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move { self.run(shutdown_rx).await });

        SchedulerHandle { shutdown_tx, join }
    }
}

/// Handle to a running scheduler task
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit
    pub async fn shutdown(self) -> Result<()> {
        // A closed channel means the loop is already gone.
        let _ = self.shutdown_tx.send(true);
        self.join
            .await
            .map_err(|e| EngineError::Task(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::EventAction;
    use crate::market::{
        ConfigExchangeDirectory, CurrencyPair, DefaultCurrencies, ExchangeConfig, TickerCache,
    };
    use crate::utils::ConditionValidator;
    use rust_decimal::Decimal;

    fn registry() -> EventRegistry {
        let exchanges = ConfigExchangeDirectory::new(vec![ExchangeConfig::enabled("BTCE")]);
        EventRegistry::new(ConditionValidator::new(
            Arc::new(exchanges),
            Arc::new(DefaultCurrencies::new()),
        ))
    }

    #[tokio::test]
    async fn test_empty_registry_skips_tick() {
        let scheduler = PollingScheduler::new(
            SchedulerConfig::default(),
            registry(),
            Arc::new(TickerCache::new()),
            ActionDispatcher::new(),
        );

        let report = scheduler.tick().await;
        assert!(report.skipped);
        assert_eq!(report.evaluated, 0);
    }

    #[tokio::test]
    async fn test_triggered_event_records_price() {
        let registry = registry();
        let id = registry
            .add("BTCE", "PRICE", ">=,1000", "BTC", "USD", EventAction::Test)
            .await
            .unwrap();

        let cache = TickerCache::new();
        let pair = CurrencyPair::new("BTC", "USD");
        cache.update(Ticker::with_last("BTCE", pair, Decimal::from(1000))).await;

        let scheduler = PollingScheduler::new(
            SchedulerConfig::default(),
            registry.clone(),
            Arc::new(cache),
            ActionDispatcher::new(),
        );

        let report = scheduler.tick().await;
        assert_eq!(report.triggered, 1);

        let event = registry.get(id).await.unwrap();
        assert!(event.is_executed());
        assert_eq!(event.trigger_price(), Some(Decimal::from(1000)));
        assert_eq!(event.last_action_succeeded(), Some(true));

        assert!(scheduler.tick().await.skipped);
    }
}
