use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::errors::AppError;
use crate::models::{Dividend, EquityPoint, Side, Transaction};
use crate::services::gateway::MarketDataGateway;
use crate::services::position::shares_at_date;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesOptions {
    /// End the series at the first month the position drops to zero after
    /// having been open, instead of skipping it and continuing.
    pub stop_when_zero: bool,
}

/// Month-by-month value of one holding, from its first transaction through
/// the current month. Prices come from a single batched month-close fetch;
/// only the in-progress month may fall back to a live quote. Months without a
/// resolvable price or without a position are absent from the output.
pub async fn monthly_equity_series(
    gateway: &MarketDataGateway,
    symbol: &str,
    transactions: &[Transaction],
    dividends: &[Dividend],
    options: SeriesOptions,
) -> Result<Vec<EquityPoint>, AppError> {
    let zero = BigDecimal::zero();
    for tx in transactions {
        if tx.quantity <= zero {
            return Err(AppError::Validation(
                "transaction quantity must be positive".into(),
            ));
        }
    }

    // Sort once; every month below reuses the same ordered view.
    let mut ordered = transactions.to_vec();
    ordered.sort_by_key(|tx| tx.date);
    let Some(first) = ordered.first() else {
        return Ok(Vec::new());
    };
    let first_date = first.date;

    let now = Utc::now();
    let series_start = start_of_month(first_date.year(), first_date.month());
    let closes = gateway.monthly_closes(symbol, series_start, now).await;

    let mut points = Vec::new();
    let mut had_position = false;
    let mut cursor = (first_date.year(), first_date.month());
    let current = (now.year(), now.month());

    while cursor <= current {
        let (year, month) = cursor;
        let is_current_month = cursor == current;
        let month_start = start_of_month(year, month);
        let month_end = if is_current_month {
            now
        } else {
            end_of_month(year, month)
        };

        let shares = shares_at_date(&ordered, month_end);
        if shares <= zero {
            if options.stop_when_zero && had_position {
                break;
            }
            cursor = next_month(cursor);
            continue;
        }
        had_position = true;

        let mut price = closes.get(&format!("{}-{:02}", year, month)).cloned();
        if price.is_none() && is_current_month {
            price = gateway.current_price(symbol).await;
        }
        // No resolvable price means no data point for the month.
        let Some(price) = price else {
            cursor = next_month(cursor);
            continue;
        };

        let gross_dividends = dividends
            .iter()
            .filter(|d| d.date >= month_start && d.date <= month_end)
            .map(|d| d.amount.clone())
            .sum::<BigDecimal>();

        let invested = ordered
            .iter()
            .filter(|tx| tx.side == Side::Buy && tx.date <= month_end)
            .map(|tx| &tx.quantity * &tx.price + tx.tax.clone().unwrap_or_else(BigDecimal::zero))
            .sum::<BigDecimal>();

        points.push(EquityPoint {
            month: format!("{:02}/{}", month, year),
            value: (&price * &shares).round(2),
            invested: invested.round(2),
            dividends: gross_dividends.round(2),
        });

        cursor = next_month(cursor);
    }

    Ok(points)
}

pub fn start_of_month(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("valid calendar month")
}

fn end_of_month(year: i32, month: u32) -> DateTime<Utc> {
    let (next_year, next_month) = next_month((year, month));
    start_of_month(next_year, next_month) - Duration::milliseconds(1)
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
