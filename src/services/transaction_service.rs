use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::config::TaxPolicy;
use crate::db;
use crate::errors::AppError;
use crate::models::{CreateTransaction, Investment, SellGainLoss, Side, Transaction};
use crate::services::dividend_sync::sync_investment_dividends;
use crate::services::gateway::MarketDataGateway;

/// Weighted average price paid per share over every BUY dated at or before
/// `as_of`, fees included. Zero when nothing was bought yet.
pub fn weighted_avg_buy_price(transactions: &[Transaction], as_of: DateTime<Utc>) -> BigDecimal {
    let mut cost = BigDecimal::zero();
    let mut quantity = BigDecimal::zero();
    for tx in transactions {
        if tx.side != Side::Buy || tx.date > as_of {
            continue;
        }
        cost += &tx.quantity * &tx.price + tx.tax.clone().unwrap_or_else(BigDecimal::zero);
        quantity += &tx.quantity;
    }
    if quantity.is_zero() {
        BigDecimal::zero()
    } else {
        cost / quantity
    }
}

/// P&L locked in by a sale: proceeds minus the average cost of the sold
/// shares minus the sale's own tax. Computed once, at sale time, against the
/// buy history as it stands then.
pub fn realized_profit_loss(
    transactions: &[Transaction],
    quantity: &BigDecimal,
    price: &BigDecimal,
    tax: Option<&BigDecimal>,
    date: DateTime<Utc>,
) -> BigDecimal {
    let avg = weighted_avg_buy_price(transactions, date);
    let zero = BigDecimal::zero();
    quantity * price - quantity * avg - tax.unwrap_or(&zero)
}

pub async fn create(
    pool: &PgPool,
    gateway: &MarketDataGateway,
    policy: &TaxPolicy,
    investment: &Investment,
    input: CreateTransaction,
) -> Result<Transaction, AppError> {
    validate(&input)?;

    let transaction = Transaction::new(
        investment.id,
        input.side,
        input.quantity,
        input.price,
        input.date,
        input.tax,
        input.observation,
    );

    let realized = if transaction.side == Side::Sell {
        let history = db::transaction_queries::fetch_for_investment(pool, investment.id).await?;
        let amount = realized_profit_loss(
            &history,
            &transaction.quantity,
            &transaction.price,
            transaction.tax.as_ref(),
            transaction.date,
        );
        Some(SellGainLoss::new(investment.id, transaction.id, amount))
    } else {
        None
    };

    db::transaction_queries::insert_with_effects(pool, &transaction, realized.as_ref()).await?;

    resync(pool, gateway, policy, investment.id).await;
    Ok(transaction)
}

pub async fn delete(
    pool: &PgPool,
    gateway: &MarketDataGateway,
    policy: &TaxPolicy,
    investment_id: Uuid,
    transaction_id: Uuid,
) -> Result<(), AppError> {
    let transaction = db::transaction_queries::fetch_one(pool, transaction_id, investment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", transaction_id)))?;

    db::transaction_queries::delete_with_effects(pool, &transaction).await?;

    resync(pool, gateway, policy, investment_id).await;
    Ok(())
}

// The mutation is already committed; a failed resynchronization only delays
// convergence until the next sync.
async fn resync(pool: &PgPool, gateway: &MarketDataGateway, policy: &TaxPolicy, id: Uuid) {
    if let Err(e) = sync_investment_dividends(pool, gateway, policy, id).await {
        warn!("Dividend resync after mutation of investment {} failed: {}", id, e);
    }
}

fn validate(input: &CreateTransaction) -> Result<(), AppError> {
    let zero = BigDecimal::zero();
    if input.quantity <= zero {
        return Err(AppError::Validation("Quantity must be positive".into()));
    }
    if input.price < zero {
        return Err(AppError::Validation("Price cannot be negative".into()));
    }
    if matches!(&input.tax, Some(tax) if *tax < zero) {
        return Err(AppError::Validation("Tax cannot be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn day(month: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, d, 0, 0, 0).unwrap()
    }

    fn buy(quantity: i64, price: i64, tax: Option<&str>, date: DateTime<Utc>) -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            Side::Buy,
            BigDecimal::from(quantity),
            BigDecimal::from(price),
            date,
            tax.map(|t| BigDecimal::from_str(t).unwrap()),
            None,
        )
    }

    #[test]
    fn sell_against_single_buy_lot() {
        // BUY 10 @ $100, SELL 5 @ $120 with $2 tax -> 5*120 - 5*100 - 2.
        let history = vec![buy(10, 100, None, day(1, 5))];
        let pnl = realized_profit_loss(
            &history,
            &BigDecimal::from(5),
            &BigDecimal::from(120),
            Some(&BigDecimal::from(2)),
            day(6, 1),
        );
        assert_eq!(pnl, BigDecimal::from(98));
    }

    #[test]
    fn average_weighs_all_buys_up_to_the_sale() {
        let history = vec![
            buy(10, 100, None, day(1, 5)),
            buy(10, 200, None, day(2, 5)),
            // Later buy must not affect a sale dated before it.
            buy(10, 900, None, day(9, 5)),
        ];

        let avg = weighted_avg_buy_price(&history, day(6, 1));
        assert_eq!(avg, BigDecimal::from(150));

        let pnl = realized_profit_loss(
            &history,
            &BigDecimal::from(4),
            &BigDecimal::from(175),
            None,
            day(6, 1),
        );
        assert_eq!(pnl, BigDecimal::from(100));
    }

    #[test]
    fn buy_fees_are_part_of_the_cost_basis() {
        let history = vec![buy(10, 100, Some("10"), day(1, 5))];
        let avg = weighted_avg_buy_price(&history, day(6, 1));
        assert_eq!(avg, BigDecimal::from(101));
    }

    #[test]
    fn no_buys_means_zero_average() {
        assert_eq!(
            weighted_avg_buy_price(&[], day(1, 1)),
            BigDecimal::from(0)
        );
    }
}
