use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;

use crate::models::Currency;

// Tuning for the market-data gateway. Every knob has a working default so the
// service starts with nothing but DATABASE_URL set.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How long a cached quote or window stays valid.
    pub cache_ttl: Duration,
    /// Attempts per quote fetch before giving up.
    pub max_retries: u32,
    /// Backoff unit; attempt n sleeps `retry_delay * n`.
    pub retry_delay: Duration,
    /// Cap on concurrent provider calls.
    pub max_concurrent_requests: usize,
    /// Minimum spacing between provider calls.
    pub min_request_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(15 * 60),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            max_concurrent_requests: 4,
            min_request_delay: Duration::from_millis(250),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl: env_secs("QUOTE_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            max_retries: env_parse("QUOTE_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay: env_millis("QUOTE_RETRY_DELAY_MS").unwrap_or(defaults.retry_delay),
            max_concurrent_requests: env_parse("PROVIDER_MAX_CONCURRENT")
                .unwrap_or(defaults.max_concurrent_requests),
            min_request_delay: env_millis("PROVIDER_MIN_DELAY_MS")
                .unwrap_or(defaults.min_request_delay),
        }
    }
}

// Flat withholding applied by the dividend synchronizer. The rate only
// applies to investments denominated in `taxed_currency`; everything else
// synchronizes with zero tax.
#[derive(Debug, Clone)]
pub struct TaxPolicy {
    pub withholding_rate: BigDecimal,
    pub taxed_currency: Currency,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self {
            withholding_rate: BigDecimal::from_str("0.30").expect("literal rate"),
            taxed_currency: Currency::Usd,
        }
    }
}

impl TaxPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let withholding_rate = std::env::var("WITHHOLDING_RATE")
            .ok()
            .and_then(|v| BigDecimal::from_str(&v).ok())
            .unwrap_or(defaults.withholding_rate);
        let taxed_currency = std::env::var("WITHHOLDING_CURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.taxed_currency);
        Self {
            withholding_rate,
            taxed_currency,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}
