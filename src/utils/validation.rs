use std::sync::Arc;

use crate::alerts::{Condition, EventAction, ItemKind, SmsTarget};
use crate::errors::EventError;
use crate::market::{CurrencyPair, CurrencyRegistry, ExchangeDirectory};

/// Typed form of an event definition that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEvent {
    pub exchange: String,
    pub item: ItemKind,
    pub condition: Condition,
    pub pair: CurrencyPair,
    pub action: EventAction,
}

/// Creation-time checks for event definitions
pub struct ConditionValidator {
    exchanges: Arc<dyn ExchangeDirectory>,
    currencies: Arc<dyn CurrencyRegistry>,
    sms_enabled: bool,
}

impl ConditionValidator {
    pub fn new(exchanges: Arc<dyn ExchangeDirectory>, currencies: Arc<dyn CurrencyRegistry>) -> Self {
        Self {
            exchanges,
            currencies,
            sms_enabled: true,
        }
    }

    /// Allow or refuse SMS actions
    pub fn with_sms(mut self, enabled: bool) -> Self {
        self.sms_enabled = enabled;
        self
    }

    /// Run every check in order: exchange, item, condition, action, currencies.
    pub async fn validate(
        &self,
        exchange: &str,
        item: &str,
        condition: &str,
        first_currency: &str,
        second_currency: &str,
        action: EventAction,
    ) -> Result<ValidatedEvent, EventError> {
        let exchange = self.validate_exchange(exchange).await?;
        let item = Self::validate_item(item)?;
        let condition = Self::validate_condition(condition)?;
        self.validate_action(&action)?;
        let pair = self.validate_pair(first_currency, second_currency)?;

        Ok(ValidatedEvent {
            exchange,
            item,
            condition,
            pair,
            action,
        })
    }

    /// Returns the exchange name as configured
    pub async fn validate_exchange(&self, exchange: &str) -> Result<String, EventError> {
        match self.exchanges.find(exchange).await {
            Some(config) if config.enabled => Ok(config.name),
            _ => Err(EventError::ExchangeDisabled(exchange.to_string())),
        }
    }

    pub fn validate_item(item: &str) -> Result<ItemKind, EventError> {
        item.parse()
    }

    pub fn validate_condition(condition: &str) -> Result<Condition, EventError> {
        condition.parse()
    }

    pub fn validate_action(&self, action: &EventAction) -> Result<(), EventError> {
        match action {
            EventAction::Sms(_) if !self.sms_enabled => Err(EventError::InvalidAction(format!(
                "{} (SMS support disabled)",
                action
            ))),
            EventAction::Sms(SmsTarget::Recipient(name)) if name.trim().is_empty() => {
                Err(EventError::InvalidAction(action.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Both sides of the pair must be known currencies
    pub fn validate_pair(&self, first: &str, second: &str) -> Result<CurrencyPair, EventError> {
        for code in [first, second] {
            if !self.currencies.is_known_currency(code) {
                return Err(EventError::InvalidCurrency(code.to_string()));
            }
        }

        Ok(CurrencyPair::new(first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{ConfigExchangeDirectory, DefaultCurrencies, ExchangeConfig};

    fn validator() -> ConditionValidator {
        let exchanges = ConfigExchangeDirectory::new(vec![
            ExchangeConfig::enabled("BTCE"),
            ExchangeConfig::disabled("GDAX"),
        ]);
        ConditionValidator::new(Arc::new(exchanges), Arc::new(DefaultCurrencies::new()))
    }

    #[tokio::test]
    async fn test_exchange_name_is_canonicalised() {
        assert_eq!(validator().validate_exchange("btce").await.unwrap(), "BTCE");
    }

    #[tokio::test]
    async fn test_checks_run_in_order() {
        let err = validator()
            .validate("GDAX", "VOLUME", "bad", "XYZ", "USD", EventAction::ConsolePrint)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::ExchangeDisabled(_)));

        let err = validator()
            .validate("BTCE", "VOLUME", "bad", "XYZ", "USD", EventAction::ConsolePrint)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidItem(_)));

        let err = validator()
            .validate("BTCE", "PRICE", "bad", "XYZ", "USD", EventAction::ConsolePrint)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidCondition(_)));
    }

    #[test]
    fn test_sms_rejected_when_disabled() {
        let validator = validator().with_sms(false);
        assert!(matches!(
            validator.validate_action(&EventAction::sms_all()),
            Err(EventError::InvalidAction(_))
        ));
        assert!(validator.validate_action(&EventAction::ConsolePrint).is_ok());
    }

    #[test]
    fn test_blank_recipient_rejected() {
        assert!(matches!(
            validator().validate_action(&EventAction::sms_to("  ")),
            Err(EventError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_pair_requires_both_currencies_known() {
        let validator = validator();
        assert_eq!(
            validator.validate_pair("btc", "usd").unwrap(),
            CurrencyPair::new("BTC", "USD")
        );
        assert_eq!(
            validator.validate_pair("BTC", "XYZ").unwrap_err(),
            EventError::InvalidCurrency("XYZ".to_string())
        );
        assert_eq!(
            validator.validate_pair("ABC", "USD").unwrap_err(),
            EventError::InvalidCurrency("ABC".to_string())
        );
    }
}
