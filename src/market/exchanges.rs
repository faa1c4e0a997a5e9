use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::Result;

/// Per-exchange entry of the host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub enabled: bool,
}

impl ExchangeConfig {
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }
}

/// Read access to the configured exchange set
#[async_trait]
pub trait ExchangeDirectory: Send + Sync {
    async fn exchanges(&self) -> Vec<ExchangeConfig>;

    /// Case-insensitive lookup by name
    async fn find(&self, name: &str) -> Option<ExchangeConfig> {
        let name = name.trim();
        self.exchanges()
            .await
            .into_iter()
            .find(|exchange| exchange.name.eq_ignore_ascii_case(name))
    }

    async fn is_enabled(&self, name: &str) -> bool {
        self.find(name).await.is_some_and(|exchange| exchange.enabled)
    }
}

pub type ExchangeLoader = Box<dyn Fn() -> Result<Vec<ExchangeConfig>> + Send + Sync>;

/// Exchange list held in memory, loaded on first use when empty
pub struct ConfigExchangeDirectory {
    exchanges: RwLock<Vec<ExchangeConfig>>,
    loader: Option<ExchangeLoader>,
}

impl ConfigExchangeDirectory {
    pub fn new(exchanges: Vec<ExchangeConfig>) -> Self {
        Self {
            exchanges: RwLock::new(exchanges),
            loader: None,
        }
    }

    /// Start empty and pull the list from `loader` whenever it is still empty
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Vec<ExchangeConfig>> + Send + Sync + 'static,
    {
        Self {
            exchanges: RwLock::new(Vec::new()),
            loader: Some(Box::new(loader)),
        }
    }

    /// Flip the enabled flag; returns false when the exchange is unknown
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        self.ensure_loaded().await;

        let mut exchanges = self.exchanges.write().await;
        match exchanges
            .iter_mut()
            .find(|exchange| exchange.name.eq_ignore_ascii_case(name.trim()))
        {
            Some(exchange) => {
                exchange.enabled = enabled;
                info!("🏦 Exchange {} enabled={}", exchange.name, enabled);
                true
            }
            None => false,
        }
    }

    pub async fn enabled_count(&self) -> usize {
        self.exchanges().await.iter().filter(|e| e.enabled).count()
    }

    async fn ensure_loaded(&self) {
        let Some(loader) = &self.loader else {
            return;
        };

        if !self.exchanges.read().await.is_empty() {
            return;
        }

        let mut exchanges = self.exchanges.write().await;
        if !exchanges.is_empty() {
            return;
        }

        match loader() {
            Ok(loaded) => {
                info!("🏦 Loaded {} exchange entries", loaded.len());
                *exchanges = loaded;
            }
            Err(e) => {
                warn!("🏦 Failed to load exchange configuration: {}", e);
            }
        }
    }
}

#[async_trait]
impl ExchangeDirectory for ConfigExchangeDirectory {
    async fn exchanges(&self) -> Vec<ExchangeConfig> {
        self.ensure_loaded().await;
        self.exchanges.read().await.clone()
    }
}
