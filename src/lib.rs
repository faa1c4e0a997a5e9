//! Condition-triggered price events.
//!
//! Users register events of the form "if the BTCUSD price on BTCE is > 1000
//! then notify". A [`PollingScheduler`] periodically fetches the latest price
//! for every pending event, evaluates its condition and fires its action at
//! most once.

pub mod alerts;
pub mod constants;
pub mod errors;
pub mod market;
pub mod monitoring;
pub mod observability;
pub mod utils;

pub use alerts::{
    ActionDispatcher, ActionFailurePolicy, Condition, Event, EventAction, EventCounter,
    EventDefinition, EventId, EventRegistry, EventStatus, ItemKind, Notifier, Operator,
    PollingScheduler, SchedulerConfig, SchedulerHandle, SmsTarget, TickReport,
};
pub use errors::{EngineError, EventError, Result};
pub use market::{
    ConfigExchangeDirectory, CurrencyPair, CurrencyRegistry, DefaultCurrencies, ExchangeConfig,
    ExchangeDirectory, PriceOracle, Ticker, TickerCache,
};
pub use monitoring::EngineMetrics;
pub use utils::{ConditionValidator, EngineConfig};
