use std::time::Duration;
use thiserror::Error;

/// Errors raised synchronously when an event definition is rejected.
///
/// Nothing is committed to the registry when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Invalid conditional option: {0}")]
    InvalidCondition(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Desired exchange is disabled: {0}")]
    ExchangeDisabled(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
}

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error("No ticker for {pair} on {exchange}")]
    PriceNotFound { exchange: String, pair: String },

    #[error("Exchange unavailable: {0}")]
    ExchangeUnavailable(String),

    #[error("Operation '{operation}' timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification(message.into())
    }

    pub fn exchange_unavailable(exchange: impl Into<String>) -> Self {
        Self::ExchangeUnavailable(exchange.into())
    }

    pub fn price_not_found(exchange: impl Into<String>, pair: impl ToString) -> Self {
        Self::PriceNotFound {
            exchange: exchange.into(),
            pair: pair.to_string(),
        }
    }

    /// Short label used for metric dimensions and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Event(_) => "invalid_event",
            Self::PriceNotFound { .. } => "not_found",
            Self::ExchangeUnavailable(_) => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Config(_) => "config",
            Self::Notification(_) => "notification",
            Self::Task(_) => "task",
            Self::Metrics(_) => "metrics",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_error_converts_into_engine_error() {
        let err: EngineError = EventError::InvalidItem("VOLUME".into()).into();
        assert!(matches!(err, EngineError::Event(EventError::InvalidItem(_))));
        assert_eq!(err.to_string(), "Invalid item: VOLUME");
        assert_eq!(err.reason(), "invalid_event");
    }

    #[test]
    fn test_price_not_found_message() {
        let err = EngineError::price_not_found("BTCE", "BTCUSD");
        assert_eq!(err.to_string(), "No ticker for BTCUSD on BTCE");
        assert_eq!(err.reason(), "not_found");
    }
}
