use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::{EngineError, Result};

/// Ordered (base, quote) currency pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub first: String,
    pub second: String,
}

impl CurrencyPair {
    pub fn new(first: impl AsRef<str>, second: impl AsRef<str>) -> Self {
        Self {
            first: first.as_ref().trim().to_uppercase(),
            second: second.as_ref().trim().to_uppercase(),
        }
    }

    fn normalized(&self) -> Self {
        Self::new(&self.first, &self.second)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.first, self.second)
    }
}

/// Price snapshot for one pair on one exchange.
///
/// Fields that the venue did not report stay at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub exchange: String,
    pub pair: CurrencyPair,
    #[serde(default)]
    pub last: Decimal,
    #[serde(default)]
    pub bid: Decimal,
    #[serde(default)]
    pub ask: Decimal,
    #[serde(default)]
    pub high: Decimal,
    #[serde(default)]
    pub low: Decimal,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Ticker {
    /// Snapshot carrying only a last traded price
    pub fn with_last(exchange: impl Into<String>, pair: CurrencyPair, last: Decimal) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            last,
            bid: Decimal::ZERO,
            ask: Decimal::ZERO,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            volume: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// False until the venue has reported at least one trade
    pub fn has_trade_data(&self) -> bool {
        !self.last.is_zero()
    }
}

/// Source of the latest traded price per exchange and pair
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn latest_price(&self, exchange: &str, pair: &CurrencyPair) -> Result<Ticker>;
}

/// In-memory ticker store fed by exchange clients
#[derive(Clone, Default)]
pub struct TickerCache {
    tickers: Arc<RwLock<HashMap<String, HashMap<CurrencyPair, Ticker>>>>,
}

impl TickerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the snapshot for the ticker's exchange and pair
    pub async fn update(&self, mut ticker: Ticker) {
        ticker.exchange = ticker.exchange.trim().to_uppercase();
        ticker.pair = ticker.pair.normalized();

        debug!(exchange = %ticker.exchange, pair = %ticker.pair, last = %ticker.last, "ticker updated");

        let mut tickers = self.tickers.write().await;
        tickers
            .entry(ticker.exchange.clone())
            .or_default()
            .insert(ticker.pair.clone(), ticker);
    }

    /// Seed the cache from a JSON array of tickers
    pub async fn load_json_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let tickers: Vec<Ticker> = serde_json::from_str(&raw)?;
        let loaded = tickers.len();

        for ticker in tickers {
            self.update(ticker).await;
        }

        info!("📈 Loaded {} ticker snapshots from {}", loaded, path.as_ref().display());
        Ok(loaded)
    }

    /// Drop every snapshot held for an exchange
    pub async fn clear_exchange(&self, exchange: &str) -> bool {
        let mut tickers = self.tickers.write().await;
        tickers.remove(&exchange.trim().to_uppercase()).is_some()
    }

    pub async fn len(&self) -> usize {
        let tickers = self.tickers.read().await;
        tickers.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PriceOracle for TickerCache {
    async fn latest_price(&self, exchange: &str, pair: &CurrencyPair) -> Result<Ticker> {
        let exchange = exchange.trim().to_uppercase();
        let pair = pair.normalized();

        let tickers = self.tickers.read().await;
        let venue = tickers
            .get(&exchange)
            .ok_or_else(|| EngineError::exchange_unavailable(exchange.clone()))?;

        venue
            .get(&pair)
            .cloned()
            .ok_or_else(|| EngineError::price_not_found(exchange, &pair))
    }
}
