mod currency;
mod exchanges;
mod ticker;

pub use currency::{CurrencyRegistry, DefaultCurrencies};
pub use exchanges::{ConfigExchangeDirectory, ExchangeConfig, ExchangeDirectory, ExchangeLoader};
pub use ticker::{CurrencyPair, PriceOracle, Ticker, TickerCache};
