use std::collections::HashSet;

use crate::constants::{DEFAULT_CRYPTO_CURRENCIES, DEFAULT_FIAT_CURRENCIES};

/// Lookup of currency codes the engine is allowed to monitor
pub trait CurrencyRegistry: Send + Sync {
    /// Case-insensitive check across fiat and crypto codes
    fn is_known_currency(&self, code: &str) -> bool;
}

/// Fiat and crypto code sets, seeded with the built-in defaults
#[derive(Debug, Clone)]
pub struct DefaultCurrencies {
    fiat: HashSet<String>,
    crypto: HashSet<String>,
}

impl DefaultCurrencies {
    pub fn new() -> Self {
        Self::from_codes(DEFAULT_FIAT_CURRENCIES, DEFAULT_CRYPTO_CURRENCIES)
    }

    pub fn from_codes<F, C>(fiat: F, crypto: C) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            fiat: fiat.into_iter().map(|c| normalize(c.as_ref())).collect(),
            crypto: crypto.into_iter().map(|c| normalize(c.as_ref())).collect(),
        }
    }

    pub fn with_fiat(mut self, code: &str) -> Self {
        self.fiat.insert(normalize(code));
        self
    }

    pub fn with_crypto(mut self, code: &str) -> Self {
        self.crypto.insert(normalize(code));
        self
    }

    pub fn is_fiat(&self, code: &str) -> bool {
        self.fiat.contains(&normalize(code))
    }

    pub fn is_crypto(&self, code: &str) -> bool {
        self.crypto.contains(&normalize(code))
    }
}

impl Default for DefaultCurrencies {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrencyRegistry for DefaultCurrencies {
    fn is_known_currency(&self, code: &str) -> bool {
        self.is_crypto(code) || self.is_fiat(code)
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
