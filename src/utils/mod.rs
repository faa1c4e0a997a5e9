mod config;
mod validation;
pub mod formatting;
pub mod timeout;

pub use config::EngineConfig;
pub use validation::{ConditionValidator, ValidatedEvent};
pub use formatting::{describe_event, format_price, format_trigger_message};
pub use timeout::with_timeout;
