use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::external::fx::FxConverter;
use crate::models::{
    BestInvestment, Currency, DashboardSummary, PortfolioChart, PortfolioPoint,
};
use crate::services::equity_series::{monthly_equity_series, start_of_month, SeriesOptions};
use crate::services::gateway::MarketDataGateway;
use crate::services::metrics::compute_metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartPeriod {
    SixMonths,
    CurrentYear,
    LastYear,
    FiveYears,
    AllTime,
}

impl std::str::FromStr for ChartPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "6-months" => Ok(Self::SixMonths),
            "current-year" => Ok(Self::CurrentYear),
            "last-year" => Ok(Self::LastYear),
            "5-years" => Ok(Self::FiveYears),
            "all-time" => Ok(Self::AllTime),
            other => Err(AppError::Validation(format!("Invalid period: {}", other))),
        }
    }
}

impl ChartPeriod {
    fn range(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let this_month = start_of_month(now.year(), now.month());
        match self {
            Self::SixMonths => (this_month - Months::new(5), now),
            Self::CurrentYear => (start_of_month(now.year(), 1), now),
            Self::LastYear => (
                start_of_month(now.year() - 1, 1),
                start_of_month(now.year(), 1) - Duration::seconds(1),
            ),
            Self::FiveYears => (this_month - Months::new(60), now),
            Self::AllTime => (
                Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0)
                    .single()
                    .expect("epoch"),
                now,
            ),
        }
    }
}

/// Portfolio headline cards: open positions valued at their cached quotes,
/// dividends and realized gains counted across the whole history, everything
/// converted into `display` at today's rate.
pub async fn summary(
    pool: &PgPool,
    fx: &dyn FxConverter,
    user_id: Uuid,
    display: Currency,
) -> Result<DashboardSummary, AppError> {
    let investments = db::investment_queries::fetch_all_for_user(pool, user_id).await?;

    let zero = BigDecimal::zero();
    let mut total_value = BigDecimal::zero();
    let mut total_invested = BigDecimal::zero();
    let mut total_dividends = BigDecimal::zero();
    let mut total_realized = BigDecimal::zero();
    let mut best: Option<BestInvestment> = None;

    for investment in investments {
        let transactions =
            db::transaction_queries::fetch_for_investment(pool, investment.id).await?;
        let dividends = db::dividend_queries::fetch_for_investment(pool, investment.id).await?;
        let sells = db::sell_gain_loss_queries::fetch_for_investment(pool, investment.id).await?;

        let metrics = compute_metrics(
            &transactions,
            &dividends,
            &sells,
            &investment.current_price,
            &investment.shares,
        )?;

        if metrics.shares > zero {
            // Only the cost of the shares still held counts as invested.
            let proportional_invested = if metrics.total_quantity_bought > zero {
                &metrics.shares / &metrics.total_quantity_bought * &metrics.total_invested
            } else {
                BigDecimal::zero()
            };

            total_value += fx
                .convert(&metrics.current_value, investment.currency, display, None)
                .await?;
            total_invested += fx
                .convert(&proportional_invested, investment.currency, display, None)
                .await?;

            let is_best = match &best {
                Some(current) => metrics.profit_loss_percentage > current.profit_percentage,
                None => true,
            };
            if is_best {
                best = Some(BestInvestment {
                    symbol: investment.symbol.clone(),
                    profit: metrics.total_profit_loss.clone(),
                    profit_percentage: metrics.profit_loss_percentage.clone(),
                });
            }
        }

        // Sold-out holdings still contribute what they paid out.
        total_dividends += fx
            .convert(&metrics.total_dividends, investment.currency, display, None)
            .await?;
        total_realized += fx
            .convert(&metrics.realized_gain_loss, investment.currency, display, None)
            .await?;
    }

    let gain_loss =
        (&total_value - &total_invested) + &total_dividends + &total_realized;

    Ok(DashboardSummary {
        total_value: total_value.round(2),
        total_invested: total_invested.round(2),
        gain_loss: gain_loss.round(2),
        dividends: total_dividends.round(2),
        best_performing_investment: best.unwrap_or_default(),
    })
}

#[derive(Default)]
struct MonthBucket {
    value_usd: BigDecimal,
    value_brl: BigDecimal,
    invested_usd: BigDecimal,
    invested_brl: BigDecimal,
}

/// Portfolio equity curve over `period`: per-holding monthly series summed in
/// their native currency, then the cross-currency half converted at each
/// month's rate.
pub async fn chart(
    pool: &PgPool,
    gateway: &MarketDataGateway,
    fx: &dyn FxConverter,
    user_id: Uuid,
    period: ChartPeriod,
    display: Currency,
) -> Result<PortfolioChart, AppError> {
    let investments = db::investment_queries::fetch_all_for_user(pool, user_id).await?;
    if investments.is_empty() {
        return Ok(PortfolioChart {
            currency: display,
            values: Vec::new(),
        });
    }

    let (start, end) = period.range(Utc::now());
    let mut buckets: BTreeMap<(i32, u32), MonthBucket> = BTreeMap::new();

    for investment in &investments {
        let transactions =
            db::transaction_queries::fetch_for_investment(pool, investment.id).await?;
        let dividends = db::dividend_queries::fetch_for_investment(pool, investment.id).await?;

        let series = monthly_equity_series(
            gateway,
            &investment.symbol,
            &transactions,
            &dividends,
            SeriesOptions {
                stop_when_zero: false,
            },
        )
        .await?;

        for point in series {
            let Some((year, month)) = parse_month_key(&point.month) else {
                warn!("Unparseable month key in series: {}", point.month);
                continue;
            };
            let month_date = start_of_month(year, month);
            if month_date < start || month_date > end {
                continue;
            }

            let bucket = buckets.entry((year, month)).or_default();
            match investment.currency {
                Currency::Usd => {
                    bucket.value_usd += &point.value;
                    bucket.invested_usd += &point.invested;
                }
                Currency::Brl => {
                    bucket.value_brl += &point.value;
                    bucket.invested_brl += &point.invested;
                }
            }
        }
    }

    let zero = BigDecimal::zero();
    let mut values = Vec::with_capacity(buckets.len());
    for ((year, month), bucket) in buckets {
        let month_date = start_of_month(year, month);

        let (native_value, native_invested, foreign_value, foreign_invested, foreign_currency) =
            match display {
                Currency::Usd => (
                    bucket.value_usd,
                    bucket.invested_usd,
                    bucket.value_brl,
                    bucket.invested_brl,
                    Currency::Brl,
                ),
                Currency::Brl => (
                    bucket.value_brl,
                    bucket.invested_brl,
                    bucket.value_usd,
                    bucket.invested_usd,
                    Currency::Usd,
                ),
            };

        let converted_value = if foreign_value > zero {
            fx.convert(&foreign_value, foreign_currency, display, Some(month_date))
                .await?
        } else {
            BigDecimal::zero()
        };
        let converted_invested = if foreign_invested > zero {
            fx.convert(
                &foreign_invested,
                foreign_currency,
                display,
                Some(month_date),
            )
            .await?
        } else {
            BigDecimal::zero()
        };

        values.push(PortfolioPoint {
            month: format!("{:02}/{}", month, year),
            value: (native_value + converted_value).round(2),
            invested: (native_invested + converted_invested).round(2),
        });
    }

    Ok(PortfolioChart {
        currency: display,
        values,
    })
}

fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (month, year) = key.split_once('/')?;
    Some((year.parse().ok()?, month.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_month_keys() {
        assert_eq!(parse_month_key("03/2024"), Some((2024, 3)));
        assert_eq!(parse_month_key("12/1999"), Some((1999, 12)));
        assert_eq!(parse_month_key("2024-03"), None);
    }

    #[test]
    fn period_ranges_cover_the_expected_months() {
        let now = Utc.with_ymd_and_hms(2025, 8, 6, 12, 0, 0).unwrap();

        let (start, end) = ChartPeriod::SixMonths.range(now);
        assert_eq!((start.year(), start.month()), (2025, 3));
        assert_eq!(end, now);

        let (start, end) = ChartPeriod::LastYear.range(now);
        assert_eq!((start.year(), start.month(), start.day()), (2024, 1, 1));
        assert_eq!((end.year(), end.month(), end.day()), (2024, 12, 31));

        let (start, _) = ChartPeriod::CurrentYear.range(now);
        assert_eq!((start.year(), start.month()), (2025, 1));

        let (start, _) = ChartPeriod::FiveYears.range(now);
        assert_eq!((start.year(), start.month()), (2020, 8));

        let (start, _) = ChartPeriod::AllTime.range(now);
        assert_eq!(start.year(), 1970);
    }

    #[test]
    fn unknown_period_is_rejected() {
        assert!("quarterly".parse::<ChartPeriod>().is_err());
    }
}
