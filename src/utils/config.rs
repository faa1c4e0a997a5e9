use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::alerts::{ActionDispatcher, ActionFailurePolicy};
use crate::constants::{
    DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_FAILURE_WARN_THRESHOLD, DEFAULT_FETCH_TIMEOUT_MS,
    DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_POLL_INTERVAL_MS,
};
use crate::errors::{EngineError, Result};
use crate::market::ExchangeConfig;
use crate::observability::LogFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // Scheduler
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    pub action_timeout_ms: u64,
    pub max_concurrent_fetches: usize,
    pub action_failure_policy: ActionFailurePolicy,
    pub failure_warn_threshold: Option<u32>,

    // Collaborators
    pub enabled_exchanges: Vec<String>,
    pub sms_enabled: bool,

    // Observability
    pub log_format: LogFormat,
    pub metrics_enabled: bool,

    // Start-up data
    pub events_file: Option<PathBuf>,
    pub ticker_snapshot_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            action_failure_policy: ActionFailurePolicy::default(),
            failure_warn_threshold: Some(DEFAULT_FAILURE_WARN_THRESHOLD),
            enabled_exchanges: Vec::new(),
            sms_enabled: false,
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            events_file: None,
            ticker_snapshot_file: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| DEFAULT_FETCH_TIMEOUT_MS.to_string())
                .parse()
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_MS),
            action_timeout_ms: env::var("ACTION_TIMEOUT_MS")
                .unwrap_or_else(|_| DEFAULT_ACTION_TIMEOUT_MS.to_string())
                .parse()
                .unwrap_or(DEFAULT_ACTION_TIMEOUT_MS),
            max_concurrent_fetches: env::var("MAX_CONCURRENT_FETCHES")
                .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT_FETCHES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_CONCURRENT_FETCHES),
            action_failure_policy: Self::parse_failure_policy(
                &env::var("ACTION_FAILURE_POLICY").unwrap_or_else(|_| "mark_executed".to_string()),
            )?,
            failure_warn_threshold: Self::parse_warn_threshold(
                &env::var("FAILURE_WARN_THRESHOLD")
                    .unwrap_or_else(|_| DEFAULT_FAILURE_WARN_THRESHOLD.to_string()),
            ),

            enabled_exchanges: Self::parse_list(&env::var("ENABLED_EXCHANGES").unwrap_or_default()),
            sms_enabled: env::var("SMS_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            log_format: Self::parse_log_format(&env::var("LOG_FORMAT").unwrap_or_default()),
            metrics_enabled: env::var("METRICS_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            events_file: env::var("EVENTS_FILE").ok().map(PathBuf::from),
            ticker_snapshot_file: env::var("TICKER_SNAPSHOT_FILE").ok().map(PathBuf::from),
        })
    }

    fn parse_failure_policy(policy: &str) -> Result<ActionFailurePolicy> {
        match policy.trim().to_lowercase().as_str() {
            "" | "mark_executed" | "mark-executed" => Ok(ActionFailurePolicy::MarkExecuted),
            "retry" | "retry_next_tick" | "retry-next-tick" => Ok(ActionFailurePolicy::RetryNextTick),
            other => Err(EngineError::config(format!("Unknown ACTION_FAILURE_POLICY '{}'", other))),
        }
    }

    fn parse_warn_threshold(raw: &str) -> Option<u32> {
        match raw.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(threshold) => Some(threshold),
            Err(_) => Some(DEFAULT_FAILURE_WARN_THRESHOLD),
        }
    }

    fn parse_log_format(format: &str) -> LogFormat {
        match format.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    fn parse_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
            .collect()
    }

    /// Exchange entries for the configured names, all enabled
    pub fn exchange_configs(&self) -> Vec<ExchangeConfig> {
        self.enabled_exchanges
            .iter()
            .map(|name| ExchangeConfig::enabled(name.clone()))
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    /// SMS actions are only accepted when enabled and something can deliver them
    pub fn sms_supported(&self, dispatcher: &ActionDispatcher) -> bool {
        self.sms_enabled && dispatcher.has_notifier()
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(EngineError::config("Poll interval must be greater than zero"));
        }

        if self.fetch_timeout_ms == 0 {
            return Err(EngineError::config("Fetch timeout must be greater than zero"));
        }

        if self.action_timeout_ms == 0 {
            return Err(EngineError::config("Action timeout must be greater than zero"));
        }

        if self.max_concurrent_fetches == 0 {
            return Err(EngineError::config("At least one concurrent price fetch is required"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.action_failure_policy, ActionFailurePolicy::MarkExecuted);
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let config = EngineConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let config = EngineConfig {
            max_concurrent_fetches: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_action_timeout_is_rejected() {
        let config = EngineConfig {
            action_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
        assert_eq!(EngineConfig::default().action_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_sms_requires_a_notifier() {
        use crate::alerts::{Notifier, SmsTarget};
        use async_trait::async_trait;
        use std::sync::Arc;

        struct Gateway;

        #[async_trait]
        impl Notifier for Gateway {
            async fn notify(&self, _message: &str, _target: &SmsTarget) -> Result<()> {
                Ok(())
            }
        }

        let enabled = EngineConfig {
            sms_enabled: true,
            ..Default::default()
        };
        let bare = ActionDispatcher::new();
        let wired = ActionDispatcher::new().with_notifier(Arc::new(Gateway));

        assert!(!enabled.sms_supported(&bare));
        assert!(enabled.sms_supported(&wired));
        assert!(!EngineConfig::default().sms_supported(&wired));
    }

    #[test]
    fn test_parse_failure_policy() {
        assert_eq!(
            EngineConfig::parse_failure_policy("retry").unwrap(),
            ActionFailurePolicy::RetryNextTick
        );
        assert_eq!(
            EngineConfig::parse_failure_policy("MARK_EXECUTED").unwrap(),
            ActionFailurePolicy::MarkExecuted
        );
        assert!(EngineConfig::parse_failure_policy("sometimes").is_err());
    }

    #[test]
    fn test_parse_exchange_list() {
        let list = EngineConfig::parse_list(" btce, gdax ,,kraken");
        assert_eq!(list, vec!["BTCE", "GDAX", "KRAKEN"]);

        let config = EngineConfig {
            enabled_exchanges: list,
            ..Default::default()
        };
        assert!(config.exchange_configs().iter().all(|e| e.enabled));
    }

    #[test]
    fn test_zero_warn_threshold_disables_warning() {
        assert_eq!(EngineConfig::parse_warn_threshold("0"), None);
        assert_eq!(EngineConfig::parse_warn_threshold("3"), Some(3));
        assert_eq!(
            EngineConfig::parse_warn_threshold("x"),
            Some(DEFAULT_FAILURE_WARN_THRESHOLD)
        );
    }
}
