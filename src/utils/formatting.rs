//! Formatting helpers for event and price values

use rust_decimal::Decimal;

use crate::alerts::Event;
use crate::market::Ticker;

/// Human readable event description
pub fn describe_event(event: &Event) -> String {
    format!(
        "If the {} {} on {} is {} then {}.",
        event.pair, event.item, event.exchange, event.condition, event.action
    )
}

/// Message delivered by the event's action when it fires
pub fn format_trigger_message(event: &Event, ticker: &Ticker) -> String {
    format!(
        "Event triggered: {} Last price: {}",
        describe_event(event),
        format_price(ticker.last)
    )
}

/// Format a price without trailing zeros
pub fn format_price(price: Decimal) -> String {
    price.normalize().to_string()
}
