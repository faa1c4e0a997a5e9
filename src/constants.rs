// Event definition tokens
pub const ITEM_PRICE: &str = "PRICE";

pub const GREATER_THAN: &str = ">";
pub const GREATER_THAN_OR_EQUAL: &str = ">=";
pub const LESS_THAN: &str = "<";
pub const LESS_THAN_OR_EQUAL: &str = "<=";
pub const IS_EQUAL: &str = "==";

pub const ACTION_SMS_NOTIFY: &str = "SMS";
pub const ACTION_CONSOLE_PRINT: &str = "CONSOLE_PRINT";
pub const ACTION_TEST: &str = "ACTION_TEST";
pub const SMS_TARGET_ALL: &str = "ALL";

// Scheduler defaults
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
pub const DEFAULT_FAILURE_WARN_THRESHOLD: u32 = 10;

// Currencies recognised without any extra configuration
pub const DEFAULT_FIAT_CURRENCIES: &[&str] = &["USD", "AUD", "EUR", "CNY"];
pub const DEFAULT_CRYPTO_CURRENCIES: &[&str] = &["BTC", "LTC", "ETH", "DOGE", "DASH", "XRP", "XMR"];
