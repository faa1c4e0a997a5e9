use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    GREATER_THAN, GREATER_THAN_OR_EQUAL, IS_EQUAL, LESS_THAN, LESS_THAN_OR_EQUAL,
};
use crate::errors::EventError;
use crate::market::Ticker;

/// Comparison applied between the last traded price and the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::GreaterThan => GREATER_THAN,
            Operator::GreaterThanOrEqual => GREATER_THAN_OR_EQUAL,
            Operator::LessThan => LESS_THAN,
            Operator::LessThanOrEqual => LESS_THAN_OR_EQUAL,
            Operator::Equal => IS_EQUAL,
        }
    }

    /// Exact decimal comparison, no tolerance
    pub fn compare(&self, price: Decimal, threshold: Decimal) -> bool {
        match self {
            Operator::GreaterThan => price > threshold,
            Operator::GreaterThanOrEqual => price >= threshold,
            Operator::LessThan => price < threshold,
            Operator::LessThanOrEqual => price <= threshold,
            Operator::Equal => price == threshold,
        }
    }
}

impl FromStr for Operator {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            GREATER_THAN => Ok(Operator::GreaterThan),
            GREATER_THAN_OR_EQUAL => Ok(Operator::GreaterThanOrEqual),
            LESS_THAN => Ok(Operator::LessThan),
            LESS_THAN_OR_EQUAL => Ok(Operator::LessThanOrEqual),
            IS_EQUAL => Ok(Operator::Equal),
            other => Err(EventError::InvalidCondition(format!("unknown operator '{}'", other))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Threshold condition gating an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub operator: Operator,
    pub threshold: Decimal,
}

impl Condition {
    pub fn new(operator: Operator, threshold: Decimal) -> Self {
        Self { operator, threshold }
    }

    /// Legacy `"<operator>,<threshold>"` form
    pub fn to_definition(&self) -> String {
        format!("{},{}", self.operator, self.threshold)
    }
}

impl FromStr for Condition {
    type Err = EventError;

    /// Parses `"<operator>,<threshold>"`, e.g. `">,1000"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split(',');
        let (Some(operator), Some(threshold), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(EventError::InvalidCondition(format!(
                "expected '<operator>,<threshold>', got '{}'",
                s
            )));
        };

        let operator = operator.parse::<Operator>()?;

        let threshold = threshold.trim();
        if threshold.is_empty() {
            return Err(EventError::InvalidCondition("missing threshold".to_string()));
        }

        let threshold = Decimal::from_str(threshold).map_err(|_| {
            EventError::InvalidCondition(format!("threshold '{}' is not a decimal number", threshold))
        })?;

        Ok(Self { operator, threshold })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.threshold)
    }
}

/// Outcome of checking one event against one price snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// The venue has not reported a trade yet
    NoData,
    NotMet,
    Triggered,
}

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn evaluate(condition: &Condition, ticker: &Ticker) -> Evaluation {
        if !ticker.has_trade_data() {
            return Evaluation::NoData;
        }

        if condition.operator.compare(ticker.last, condition.threshold) {
            Evaluation::Triggered
        } else {
            Evaluation::NotMet
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::CurrencyPair;

    fn ticker(last: &str) -> Ticker {
        Ticker::with_last("BTCE", CurrencyPair::new("BTC", "USD"), last.parse().unwrap())
    }

    #[test]
    fn test_parse_all_operators() {
        let cases = [
            (">,100", Operator::GreaterThan),
            (">=,100", Operator::GreaterThanOrEqual),
            ("<,100", Operator::LessThan),
            ("<=,100", Operator::LessThanOrEqual),
            ("==,100", Operator::Equal),
        ];

        for (raw, operator) in cases {
            let condition: Condition = raw.parse().unwrap();
            assert_eq!(condition.operator, operator);
            assert_eq!(condition.threshold, Decimal::from(100));
            assert_eq!(condition.to_definition(), raw);
        }
    }

    #[test]
    fn test_parse_tolerates_whitespace_around_fields() {
        let condition: Condition = " >= , 1000.50 ".parse().unwrap();
        assert_eq!(condition.operator, Operator::GreaterThanOrEqual);
        assert_eq!(condition.threshold, "1000.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_malformed_conditions_are_rejected() {
        for raw in [">100", "", ">,", "!=,100", "=>,100", ">,abc", ">,100,5", ",100"] {
            let err = raw.parse::<Condition>().unwrap_err();
            assert!(
                matches!(err, EventError::InvalidCondition(_)),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_strictly_greater_does_not_fire_on_equal_price() {
        let condition: Condition = ">,100".parse().unwrap();
        assert_eq!(ConditionEvaluator::evaluate(&condition, &ticker("100")), Evaluation::NotMet);
        assert_eq!(ConditionEvaluator::evaluate(&condition, &ticker("100.0000001")), Evaluation::Triggered);
    }

    #[test]
    fn test_comparisons_are_exact() {
        let condition: Condition = "==,0.3".parse().unwrap();
        let sum = "0.1".parse::<Decimal>().unwrap() + "0.2".parse::<Decimal>().unwrap();
        let snapshot = Ticker::with_last("BTCE", CurrencyPair::new("BTC", "USD"), sum);
        assert_eq!(ConditionEvaluator::evaluate(&condition, &snapshot), Evaluation::Triggered);

        let condition: Condition = "<=,99.99".parse().unwrap();
        assert_eq!(ConditionEvaluator::evaluate(&condition, &ticker("99.99")), Evaluation::Triggered);
        assert_eq!(ConditionEvaluator::evaluate(&condition, &ticker("99.991")), Evaluation::NotMet);
    }

    #[test]
    fn test_zero_price_never_satisfies_any_condition() {
        for raw in ["==,0", "<=,0", "<,1", ">=,0"] {
            let condition: Condition = raw.parse().unwrap();
            assert_eq!(ConditionEvaluator::evaluate(&condition, &ticker("0")), Evaluation::NoData);
        }
    }
}
