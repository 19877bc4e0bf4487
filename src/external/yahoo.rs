use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::external::market_data::{
    ExternalClosePoint, ExternalDividendEvent, MarketDataError, MarketDataProvider,
};

pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        query: &[(&str, String)],
    ) -> Result<YahooResult, MarketDataError> {
        let url = format!("https://query1.finance.yahoo.com/v8/finance/chart/{symbol}");

        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited);
        }

        let body = resp
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        if let Some(err) = body.chart.error {
            return Err(MarketDataError::BadResponse(err.to_string()));
        }

        body.chart
            .result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| MarketDataError::BadResponse("missing result".into()))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    timestamp: Option<Vec<i64>>,
    events: Option<YahooEvents>,
    indicators: Option<YahooIndicators>,
}

#[derive(Debug, Deserialize)]
struct YahooMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooEvents {
    // Keyed by the epoch-second ex-date as a string.
    dividends: Option<BTreeMap<String, YahooDividend>>,
}

#[derive(Debug, Deserialize)]
struct YahooDividend {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    close: Vec<Option<f64>>,
}

fn decimal_from_f64(value: f64) -> Result<BigDecimal, MarketDataError> {
    value
        .to_string()
        .parse::<BigDecimal>()
        .map_err(|e| MarketDataError::Parse(e.to_string()))
}

fn datetime_from_epoch(secs: i64) -> Result<DateTime<Utc>, MarketDataError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| MarketDataError::Parse(format!("bad timestamp: {secs}")))
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn quote(&self, symbol: &str) -> Result<BigDecimal, MarketDataError> {
        let result = self
            .fetch_chart(symbol, &[("range", "1d".into()), ("interval", "1d".into())])
            .await?;

        let price = result
            .meta
            .regular_market_price
            .ok_or_else(|| MarketDataError::BadResponse("missing market price".into()))?;

        decimal_from_f64(price)
    }

    async fn monthly_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalClosePoint>, MarketDataError> {
        let result = self
            .fetch_chart(
                symbol,
                &[
                    ("period1", start.timestamp().to_string()),
                    ("period2", end.timestamp().to_string()),
                    ("interval", "1mo".into()),
                ],
            )
            .await?;

        let timestamps = result.timestamp.unwrap_or_default();

        // timestamp aligns with the close list by index
        let closes = result
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .map(|q| q.close)
            .unwrap_or_default();

        let mut out = Vec::new();
        for (i, ts) in timestamps.iter().enumerate() {
            // skip missing closes
            let Some(close) = closes.get(i).and_then(|v| *v) else {
                continue;
            };

            out.push(ExternalClosePoint {
                date: datetime_from_epoch(*ts)?,
                close: decimal_from_f64(close)?,
            });
        }

        out.sort_by_key(|p| p.date);
        Ok(out)
    }

    async fn dividend_events(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalDividendEvent>, MarketDataError> {
        let result = self
            .fetch_chart(
                symbol,
                &[
                    ("period1", start.timestamp().to_string()),
                    ("period2", end.timestamp().to_string()),
                    ("interval", "1mo".into()),
                    ("events", "div".into()),
                ],
            )
            .await?;

        let dividends = result.events.and_then(|e| e.dividends).unwrap_or_default();

        let mut out = Vec::new();
        for payout in dividends.into_values() {
            out.push(ExternalDividendEvent {
                ex_date: datetime_from_epoch(payout.date)?,
                amount: decimal_from_f64(payout.amount)?,
            });
        }

        out.sort_by_key(|e| e.ex_date);
        Ok(out)
    }
}
