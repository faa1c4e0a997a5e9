use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use price_event_engine::observability::init_tracing;
use price_event_engine::{
    ActionDispatcher, ConditionValidator, ConfigExchangeDirectory, DefaultCurrencies,
    EngineConfig, EngineMetrics, EventRegistry, PollingScheduler, SchedulerConfig, TickerCache,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = EngineConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(config.log_format)?;

    info!("🚀 Starting price event engine");
    let exchanges = if config.enabled_exchanges.is_empty() {
        "none".to_string()
    } else {
        config.enabled_exchanges.join(", ")
    };
    info!("📡 Exchanges: {}", exchanges);
    info!("⏱️ Poll interval: {}ms, fetch timeout: {}ms", config.poll_interval_ms, config.fetch_timeout_ms);

    let exchange_configs = config.exchange_configs();
    let directory = ConfigExchangeDirectory::lazy(move || Ok(exchange_configs.clone()));

    // No SMS gateway ships with the binary.
    let dispatcher = ActionDispatcher::new();
    let sms_supported = config.sms_supported(&dispatcher);
    if config.sms_enabled && !sms_supported {
        warn!("📵 SMS_ENABLED is set but no notifier is configured; SMS events will be rejected");
    }

    let validator = ConditionValidator::new(Arc::new(directory), Arc::new(DefaultCurrencies::new()))
        .with_sms(sms_supported);
    let registry = EventRegistry::new(validator);

    let tickers = TickerCache::new();
    if let Some(path) = &config.ticker_snapshot_file {
        tickers
            .load_json_file(path)
            .await
            .with_context(|| format!("Failed to load tickers from {}", path.display()))?;
    }

    if let Some(path) = &config.events_file {
        registry
            .load_json_file(path)
            .await
            .with_context(|| format!("Failed to load events from {}", path.display()))?;
    }

    let mut scheduler = PollingScheduler::new(
        SchedulerConfig::from(&config),
        registry.clone(),
        Arc::new(tickers),
        dispatcher,
    );

    let metrics = if config.metrics_enabled {
        let metrics = EngineMetrics::new()?;
        scheduler = scheduler.with_metrics(metrics.clone());
        Some(metrics)
    } else {
        None
    };

    let handle = scheduler.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("🛑 Shutdown requested");

    handle.shutdown().await?;

    let counter = registry.count().await;
    info!(
        total = counter.total,
        executed = counter.executed,
        pending = counter.pending(),
        "✅ Price event engine stopped"
    );

    if let Some(metrics) = metrics {
        info!("📊 Final metrics:\n{}", metrics.render()?);
    }

    Ok(())
}
