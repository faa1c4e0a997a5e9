use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::alerts::actions::EventAction;
use crate::alerts::condition::Condition;
use crate::constants::ITEM_PRICE;
use crate::errors::EventError;
use crate::market::CurrencyPair;
use crate::utils::formatting::describe_event;

pub type EventId = u64;

/// Quantity an event watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Price,
}

impl FromStr for ItemKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            ITEM_PRICE => Ok(ItemKind::Price),
            _ => Err(EventError::InvalidItem(s.to_string())),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Price => f.write_str(ITEM_PRICE),
        }
    }
}

/// Lifecycle of an event; `Executed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Pending,
    Executed,
}

/// Alert definition held by the registry
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: EventId,
    pub exchange: String,
    pub item: ItemKind,
    pub condition: Condition,
    pub pair: CurrencyPair,
    pub action: EventAction,
    pub created_at: DateTime<Utc>,
    pub(crate) executed: bool,
    pub(crate) executed_at: Option<DateTime<Utc>>,
    pub(crate) trigger_price: Option<Decimal>,
    pub(crate) last_action_succeeded: Option<bool>,
    pub(crate) consecutive_failures: u32,
    #[serde(skip)]
    pub(crate) dispatching: bool,
}

impl Event {
    pub(crate) fn new(
        id: EventId,
        exchange: String,
        item: ItemKind,
        condition: Condition,
        pair: CurrencyPair,
        action: EventAction,
    ) -> Self {
        Self {
            id,
            exchange,
            item,
            condition,
            pair,
            action,
            created_at: Utc::now(),
            executed: false,
            executed_at: None,
            trigger_price: None,
            last_action_succeeded: None,
            consecutive_failures: 0,
            dispatching: false,
        }
    }

    pub fn status(&self) -> EventStatus {
        if self.executed {
            EventStatus::Executed
        } else {
            EventStatus::Pending
        }
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    /// Last traded price that fired the event
    pub fn trigger_price(&self) -> Option<Decimal> {
        self.trigger_price
    }

    /// Result of the most recent action invocation, if any
    pub fn last_action_succeeded(&self) -> Option<bool> {
        self.last_action_succeeded
    }

    /// Price fetches that failed in a row since the last successful one
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn describe(&self) -> String {
        describe_event(self)
    }

    pub(crate) fn is_claimable(&self) -> bool {
        !self.executed && !self.dispatching
    }
}

/// String form of an event, as found in definition files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub exchange: String,
    #[serde(default = "default_item")]
    pub item: String,
    pub condition: String,
    pub first_currency: String,
    pub second_currency: String,
    pub action: String,
}

fn default_item() -> String {
    ITEM_PRICE.to_string()
}
