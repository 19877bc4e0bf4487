use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Utc};
use tracing::warn;

use crate::errors::AppError;
use crate::models::Currency;
use crate::services::gateway::MarketDataGateway;

#[async_trait]
pub trait FxConverter: Send + Sync {
    /// Convert `amount` between currencies, optionally at the rate in effect
    /// during the month containing `as_of`.
    async fn convert(
        &self,
        amount: &BigDecimal,
        from: Currency,
        to: Currency,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<BigDecimal, AppError>;
}

// Point-in-time conversion backed by the market-data gateway, using currency
// pair symbols ("USDBRL=X"). Historical rates resolve to the month close of
// the pair; when that month is absent the live quote is used instead.
pub struct GatewayFxConverter {
    gateway: Arc<MarketDataGateway>,
}

impl GatewayFxConverter {
    pub fn new(gateway: Arc<MarketDataGateway>) -> Self {
        Self { gateway }
    }

    async fn rate(
        &self,
        pair: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Option<BigDecimal> {
        if let Some(date) = as_of {
            let closes = self
                .gateway
                .monthly_closes(pair, date, Utc::now())
                .await;
            let key = format!("{}-{:02}", date.year(), date.month());
            if let Some(rate) = closes.get(&key) {
                return Some(rate.clone());
            }
        }
        self.gateway.current_price(pair).await
    }
}

#[async_trait]
impl FxConverter for GatewayFxConverter {
    async fn convert(
        &self,
        amount: &BigDecimal,
        from: Currency,
        to: Currency,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<BigDecimal, AppError> {
        if from == to {
            return Ok(amount.clone());
        }

        let pair = format!("{}{}=X", from, to);
        let rate = self.rate(&pair, as_of).await.ok_or_else(|| {
            warn!("No FX rate available for {}", pair);
            AppError::External(format!("FX rate unavailable for {}", pair))
        })?;

        Ok(amount * rate)
    }
}
