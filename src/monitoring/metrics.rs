use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{EngineError, Result};

/// Prometheus metrics for the polling engine.
///
/// Each instance owns its registry, so several engines (or tests) can live in
/// one process without name clashes.
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<Registry>,

    // Scheduler
    pub ticks_total: IntCounter,
    pub ticks_skipped_total: IntCounter,
    pub tick_duration: Histogram,
    pub events_pending: Gauge,

    // Prices
    pub price_fetch_failures_total: CounterVec,
    pub fetch_failure_warnings_total: CounterVec,

    // Actions
    pub events_triggered_total: CounterVec,
    pub actions_total: CounterVec,
}

impl EngineMetrics {
    /// Create new metrics collector
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let ticks_total = IntCounter::new("price_engine_ticks_total", "Total polling passes run")?;

        let ticks_skipped_total = IntCounter::new(
            "price_engine_ticks_skipped_total",
            "Polling passes skipped because nothing was pending",
        )?;

        let tick_duration = Histogram::with_opts(
            HistogramOpts::new(
                "price_engine_tick_duration_seconds",
                "Wall time of one polling pass",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        let events_pending = Gauge::new(
            "price_engine_events_pending",
            "Events registered but not yet executed",
        )?;

        let price_fetch_failures_total = CounterVec::new(
            Opts::new(
                "price_engine_price_fetch_failures_total",
                "Price lookups that failed or timed out",
            ),
            &["exchange", "reason"],
        )?;

        let fetch_failure_warnings_total = CounterVec::new(
            Opts::new(
                "price_engine_fetch_failure_warnings_total",
                "Events whose consecutive fetch failures reached the warning threshold",
            ),
            &["exchange"],
        )?;

        let events_triggered_total = CounterVec::new(
            Opts::new(
                "price_engine_events_triggered_total",
                "Events whose condition fired and were marked executed",
            ),
            &["exchange"],
        )?;

        let actions_total = CounterVec::new(
            Opts::new("price_engine_actions_total", "Action invocations by outcome"),
            &["action", "status"],
        )?;

        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(ticks_skipped_total.clone()))?;
        registry.register(Box::new(tick_duration.clone()))?;
        registry.register(Box::new(events_pending.clone()))?;
        registry.register(Box::new(price_fetch_failures_total.clone()))?;
        registry.register(Box::new(fetch_failure_warnings_total.clone()))?;
        registry.register(Box::new(events_triggered_total.clone()))?;
        registry.register(Box::new(actions_total.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            ticks_skipped_total,
            tick_duration,
            events_pending,
            price_fetch_failures_total,
            fetch_failure_warnings_total,
            events_triggered_total,
            actions_total,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn observe_tick(&self, elapsed: Duration, skipped: bool, pending: usize) {
        self.ticks_total.inc();
        if skipped {
            self.ticks_skipped_total.inc();
        }
        self.tick_duration.observe(elapsed.as_secs_f64());
        self.events_pending.set(pending as f64);
    }

    pub fn record_fetch_failure(&self, exchange: &str, reason: &str) {
        self.price_fetch_failures_total
            .with_label_values(&[exchange, reason])
            .inc();
    }

    pub fn record_failure_warning(&self, exchange: &str) {
        self.fetch_failure_warnings_total
            .with_label_values(&[exchange])
            .inc();
    }

    pub fn record_trigger(&self, exchange: &str) {
        self.events_triggered_total.with_label_values(&[exchange]).inc();
    }

    pub fn record_action(&self, action: &str, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.actions_total.with_label_values(&[action, status]).inc();
    }

    /// Render every metric in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        exposition_text(buffer)
    }
}

fn exposition_text(buffer: Vec<u8>) -> Result<String> {
    String::from_utf8(buffer).map_err(|e| {
        EngineError::Metrics(prometheus::Error::Msg(format!(
            "Metrics output is not UTF-8: {}",
            e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_do_not_clash() {
        let first = EngineMetrics::new().unwrap();
        let second = EngineMetrics::new().unwrap();

        first.record_trigger("BTCE");
        assert_eq!(first.events_triggered_total.with_label_values(&["BTCE"]).get(), 1.0);
        assert_eq!(second.events_triggered_total.with_label_values(&["BTCE"]).get(), 0.0);
    }

    #[test]
    fn test_invalid_utf8_is_a_metrics_error() {
        let err = exposition_text(vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, EngineError::Metrics(_)));
        assert_eq!(err.reason(), "metrics");
    }

    #[test]
    fn test_render_includes_recorded_series() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.observe_tick(Duration::from_millis(12), false, 3);
        metrics.record_fetch_failure("GDAX", "timeout");
        metrics.record_action("SMS", false);

        let output = metrics.render().unwrap();
        assert!(output.contains("price_engine_ticks_total 1"));
        assert!(output.contains("price_engine_events_pending 3"));
        assert!(output.contains(r#"exchange="GDAX""#));
        assert!(output.contains(r#"status="failure""#));
    }
}
