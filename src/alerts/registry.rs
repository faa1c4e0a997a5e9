use chrono::Utc;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::alerts::actions::EventAction;
use crate::alerts::event::{Event, EventDefinition, EventId};
use crate::alerts::scheduler::ActionFailurePolicy;
use crate::errors::EventError;
use crate::utils::ConditionValidator;

/// Registry totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounter {
    pub total: usize,
    pub executed: usize,
}

impl EventCounter {
    pub fn pending(&self) -> usize {
        self.total - self.executed
    }

    pub fn all_executed(&self) -> bool {
        self.executed == self.total
    }
}

struct RegistryState {
    events: IndexMap<EventId, Event>,
    next_id: EventId,
}

/// Ordered, shared store of event definitions.
///
/// Every read and write, including the scheduler's snapshot and the
/// Pending to Executed flip, goes through the same lock.
#[derive(Clone)]
pub struct EventRegistry {
    validator: Arc<ConditionValidator>,
    state: Arc<RwLock<RegistryState>>,
}

impl EventRegistry {
    pub fn new(validator: ConditionValidator) -> Self {
        Self {
            validator: Arc::new(validator),
            state: Arc::new(RwLock::new(RegistryState {
                events: IndexMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Validate and append a new pending event.
    ///
    /// IDs are handed out from a counter that never goes backwards, so an ID
    /// is never reused after a removal.
    pub async fn add(
        &self,
        exchange: &str,
        item: &str,
        condition: &str,
        first_currency: &str,
        second_currency: &str,
        action: EventAction,
    ) -> Result<EventId, EventError> {
        let validated = self
            .validator
            .validate(exchange, item, condition, first_currency, second_currency, action)
            .await
            .map_err(|e| {
                debug!("🔔 Rejected event definition: {}", e);
                e
            })?;

        let mut state = self.state.write().await;
        let id = state.next_id;
        state.next_id += 1;

        let event = Event::new(
            id,
            validated.exchange,
            validated.item,
            validated.condition,
            validated.pair,
            validated.action,
        );
        info!(event_id = id, "🔔 Registered event: {}", event.describe());
        state.events.insert(id, event);

        Ok(id)
    }

    /// Register an event from its string form
    pub async fn add_definition(&self, definition: &EventDefinition) -> Result<EventId, EventError> {
        let action = definition.action.parse::<EventAction>()?;
        self.add(
            &definition.exchange,
            &definition.item,
            &definition.condition,
            &definition.first_currency,
            &definition.second_currency,
            action,
        )
        .await
    }

    /// Register every definition in a JSON array file.
    ///
    /// Rejected definitions are logged and skipped; only I/O and parse errors
    /// fail the whole load. Returns the number registered.
    pub async fn load_json_file(&self, path: impl AsRef<Path>) -> crate::errors::Result<usize> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let definitions: Vec<EventDefinition> = serde_json::from_str(&raw)?;
        let mut registered = 0;

        for (index, definition) in definitions.iter().enumerate() {
            match self.add_definition(definition).await {
                Ok(_) => registered += 1,
                Err(e) => warn!(index, exchange = %definition.exchange, "🔔 Skipping event definition: {}", e),
            }
        }

        info!(
            "🔔 Registered {}/{} events from {}",
            registered,
            definitions.len(),
            path.as_ref().display()
        );
        Ok(registered)
    }

    /// Remove an event whatever its state; the rest keep their order
    pub async fn remove(&self, id: EventId) -> bool {
        let mut state = self.state.write().await;
        let removed = state.events.shift_remove(&id).is_some();

        if removed {
            info!(event_id = id, "🔔 Removed event");
        }

        removed
    }

    pub async fn count(&self) -> EventCounter {
        let state = self.state.read().await;
        EventCounter {
            total: state.events.len(),
            executed: state.events.values().filter(|e| e.executed).count(),
        }
    }

    /// Ordered copy of every event
    pub async fn events(&self) -> Vec<Event> {
        let state = self.state.read().await;
        state.events.values().cloned().collect()
    }

    pub async fn get(&self, id: EventId) -> Option<Event> {
        let state = self.state.read().await;
        state.events.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.events.is_empty()
    }

    /// Pending events not currently being dispatched, in registry order
    pub(crate) async fn pending_snapshot(&self) -> Vec<Event> {
        let state = self.state.read().await;
        state
            .events
            .values()
            .filter(|e| e.is_claimable())
            .cloned()
            .collect()
    }

    /// Bump the failure streak; `None` when the event is gone
    pub(crate) async fn record_fetch_failure(&self, id: EventId) -> Option<u32> {
        let mut state = self.state.write().await;
        let event = state.events.get_mut(&id)?;
        event.consecutive_failures = event.consecutive_failures.saturating_add(1);
        Some(event.consecutive_failures)
    }

    pub(crate) async fn record_fetch_success(&self, id: EventId) {
        let mut state = self.state.write().await;
        if let Some(event) = state.events.get_mut(&id) {
            if event.consecutive_failures > 0 {
                debug!(
                    event_id = id,
                    failures = event.consecutive_failures,
                    "🔔 Price fetch recovered"
                );
                event.consecutive_failures = 0;
            }
        }
    }

    /// Take exclusive ownership of a triggered event before its action runs.
    ///
    /// Returns the claimed event, or `None` if it was removed, already
    /// executed, or claimed by an overlapping tick.
    pub(crate) async fn claim(
        &self,
        id: EventId,
        price: Decimal,
        policy: ActionFailurePolicy,
    ) -> Option<Event> {
        let mut state = self.state.write().await;
        let event = state.events.get_mut(&id)?;

        if !event.is_claimable() {
            return None;
        }

        match policy {
            ActionFailurePolicy::MarkExecuted => {
                event.executed = true;
                event.executed_at = Some(Utc::now());
                event.trigger_price = Some(price);
            }
            ActionFailurePolicy::RetryNextTick => {
                event.dispatching = true;
            }
        }

        Some(event.clone())
    }

    /// Clear the in-flight marker left by an abandoned dispatch so the events
    /// are evaluated again. Returns how many were released.
    pub(crate) async fn release_in_flight(&self) -> usize {
        let mut state = self.state.write().await;
        let mut released = 0;

        for event in state.events.values_mut().filter(|e| e.dispatching) {
            event.dispatching = false;
            released += 1;
        }

        released
    }

    /// Record the action's result for a claimed event
    pub(crate) async fn finish_dispatch(
        &self,
        id: EventId,
        price: Decimal,
        succeeded: bool,
        policy: ActionFailurePolicy,
    ) {
        let mut state = self.state.write().await;
        let Some(event) = state.events.get_mut(&id) else {
            debug!(event_id = id, "🔔 Event removed while its action was running");
            return;
        };

        event.last_action_succeeded = Some(succeeded);

        if policy == ActionFailurePolicy::RetryNextTick {
            event.dispatching = false;
            if succeeded {
                event.executed = true;
                event.executed_at = Some(Utc::now());
                event.trigger_price = Some(price);
            } else {
                warn!(event_id = id, "🔔 Action failed, event stays pending");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{ConfigExchangeDirectory, DefaultCurrencies, ExchangeConfig};

    fn registry() -> EventRegistry {
        let exchanges = ConfigExchangeDirectory::new(vec![ExchangeConfig::enabled("BTCE")]);
        EventRegistry::new(ConditionValidator::new(
            Arc::new(exchanges),
            Arc::new(DefaultCurrencies::new()),
        ))
    }

    async fn add_console(registry: &EventRegistry) -> EventId {
        registry
            .add("BTCE", "PRICE", ">,1000", "BTC", "USD", EventAction::ConsolePrint)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let registry = registry();
        let id = add_console(&registry).await;
        let price = Decimal::from(1001);

        let claimed = registry
            .claim(id, price, ActionFailurePolicy::MarkExecuted)
            .await
            .unwrap();
        assert!(claimed.is_executed());
        assert!(registry.claim(id, price, ActionFailurePolicy::MarkExecuted).await.is_none());
        assert!(registry.pending_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_retry_policy_keeps_event_pending_after_failure() {
        let registry = registry();
        let id = add_console(&registry).await;
        let price = Decimal::from(1001);
        let policy = ActionFailurePolicy::RetryNextTick;

        assert!(registry.claim(id, price, policy).await.is_some());
        // In flight: hidden from the snapshot and not claimable twice.
        assert!(registry.pending_snapshot().await.is_empty());
        assert!(registry.claim(id, price, policy).await.is_none());

        registry.finish_dispatch(id, price, false, policy).await;
        let event = registry.get(id).await.unwrap();
        assert!(!event.is_executed());
        assert_eq!(event.last_action_succeeded(), Some(false));
        assert_eq!(registry.pending_snapshot().await.len(), 1);

        assert!(registry.claim(id, price, policy).await.is_some());
        registry.finish_dispatch(id, price, true, policy).await;
        let event = registry.get(id).await.unwrap();
        assert!(event.is_executed());
        assert_eq!(event.trigger_price(), Some(price));
    }

    #[tokio::test]
    async fn test_failure_streak_resets_on_success() {
        let registry = registry();
        let id = add_console(&registry).await;

        assert_eq!(registry.record_fetch_failure(id).await, Some(1));
        assert_eq!(registry.record_fetch_failure(id).await, Some(2));
        registry.record_fetch_success(id).await;
        assert_eq!(registry.get(id).await.unwrap().consecutive_failures(), 0);
        assert_eq!(registry.record_fetch_failure(99).await, None);
    }

    #[tokio::test]
    async fn test_release_in_flight_makes_event_claimable_again() {
        let registry = registry();
        let id = add_console(&registry).await;
        let price = Decimal::from(1001);

        registry.claim(id, price, ActionFailurePolicy::RetryNextTick).await.unwrap();
        assert!(registry.pending_snapshot().await.is_empty());

        assert_eq!(registry.release_in_flight().await, 1);
        assert_eq!(registry.pending_snapshot().await.len(), 1);
        assert_eq!(registry.release_in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_finish_after_removal_is_noop() {
        let registry = registry();
        let id = add_console(&registry).await;
        let price = Decimal::from(1001);

        registry.claim(id, price, ActionFailurePolicy::RetryNextTick).await.unwrap();
        assert!(registry.remove(id).await);
        registry
            .finish_dispatch(id, price, true, ActionFailurePolicy::RetryNextTick)
            .await;
        assert!(registry.is_empty().await);
    }
}
