use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use thiserror::Error;

// A month-end closing price reported by the provider.
#[derive(Debug, Clone)]
pub struct ExternalClosePoint {
    pub date: DateTime<Utc>,
    pub close: BigDecimal,
}

// A dividend corporate action: ex-date plus the raw per-share amount, before
// any scaling by shares held.
#[derive(Debug, Clone)]
pub struct ExternalDividendEvent {
    pub ex_date: DateTime<Utc>,
    pub amount: BigDecimal,
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest spot quote for a symbol.
    async fn quote(&self, symbol: &str) -> Result<BigDecimal, MarketDataError>;

    /// Month-interval closing prices over `[start, end]`, ascending.
    async fn monthly_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalClosePoint>, MarketDataError>;

    /// Dividend events over `[start, end]`, ascending by ex-date.
    async fn dividend_events(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalDividendEvent>, MarketDataError>;
}
