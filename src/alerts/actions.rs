use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::alerts::event::Event;
use crate::constants::{
    ACTION_CONSOLE_PRINT, ACTION_SMS_NOTIFY, ACTION_TEST, DEFAULT_ACTION_TIMEOUT_MS, SMS_TARGET_ALL,
};
use crate::errors::{EventError, Result};
use crate::market::Ticker;
use crate::utils::formatting::format_trigger_message;
use crate::utils::timeout::with_timeout;

/// Who receives an SMS-style notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmsTarget {
    All,
    Recipient(String),
}

impl fmt::Display for SmsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmsTarget::All => f.write_str(SMS_TARGET_ALL),
            SmsTarget::Recipient(name) => f.write_str(name),
        }
    }
}

/// What happens when an event's condition becomes true
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventAction {
    /// Log the trigger through the process logger
    ConsolePrint,
    /// Send the trigger message through the configured notifier
    Sms(SmsTarget),
    /// No side effect; always succeeds
    Test,
}

impl EventAction {
    pub fn sms_all() -> Self {
        EventAction::Sms(SmsTarget::All)
    }

    pub fn sms_to(recipient: impl Into<String>) -> Self {
        EventAction::Sms(SmsTarget::Recipient(recipient.into()))
    }

    /// Label used for logs and metric dimensions
    pub fn kind(&self) -> &'static str {
        match self {
            EventAction::ConsolePrint => ACTION_CONSOLE_PRINT,
            EventAction::Sms(_) => ACTION_SMS_NOTIFY,
            EventAction::Test => ACTION_TEST,
        }
    }
}

impl FromStr for EventAction {
    type Err = EventError;

    /// Accepts `CONSOLE_PRINT`, `ACTION_TEST`, `SMS,ALL` and `SMS,<recipient>`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let raw = s.trim();
        let (kind, target) = match raw.split_once(',') {
            Some((kind, target)) => (kind.trim(), Some(target.trim())),
            None => (raw, None),
        };

        match (kind.to_uppercase().as_str(), target) {
            (ACTION_CONSOLE_PRINT, None) => Ok(EventAction::ConsolePrint),
            (ACTION_TEST, None) => Ok(EventAction::Test),
            (ACTION_SMS_NOTIFY, Some(target)) if target.eq_ignore_ascii_case(SMS_TARGET_ALL) => {
                Ok(EventAction::Sms(SmsTarget::All))
            }
            (ACTION_SMS_NOTIFY, Some(target)) if !target.is_empty() => {
                Ok(EventAction::Sms(SmsTarget::Recipient(target.to_string())))
            }
            _ => Err(EventError::InvalidAction(raw.to_string())),
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventAction::Sms(target) => write!(f, "{},{}", ACTION_SMS_NOTIFY, target),
            other => f.write_str(other.kind()),
        }
    }
}

/// External notification channel (SMS gateway or similar)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str, target: &SmsTarget) -> Result<()>;
}

/// Runs an event's action once it has been claimed by the scheduler
#[derive(Clone)]
pub struct ActionDispatcher {
    notifier: Option<Arc<dyn Notifier>>,
    action_timeout: Duration,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self {
            notifier: None,
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
        }
    }
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Deadline for a single notifier call; an elapsed deadline counts as failure
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn action_timeout(&self) -> Duration {
        self.action_timeout
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Invoke the action; the return value is the action's own success signal.
    pub async fn dispatch(&self, event: &Event, ticker: &Ticker) -> bool {
        let message = format_trigger_message(event, ticker);

        match &event.action {
            EventAction::ConsolePrint => {
                info!(event_id = event.id, exchange = %event.exchange, "🔔 {}", message);
                true
            }
            EventAction::Sms(target) => {
                let Some(notifier) = &self.notifier else {
                    warn!(event_id = event.id, "🔔 No notifier configured, dropping SMS to {}", target);
                    return false;
                };

                let delivery = notifier.notify(&message, target);
                match with_timeout(delivery, self.action_timeout, "notify").await {
                    Ok(()) => {
                        debug!(event_id = event.id, target = %target, "🔔 Notification sent");
                        true
                    }
                    Err(e) => {
                        warn!(event_id = event.id, target = %target, "🔔 Notification failed: {}", e);
                        false
                    }
                }
            }
            EventAction::Test => {
                debug!(event_id = event.id, "🔔 Test action fired: {}", message);
                true
            }
        }
    }
}
