use bigdecimal::{BigDecimal, Zero};

use crate::errors::AppError;
use crate::models::{Dividend, InvestmentMetrics, SellGainLoss, Side, Transaction};

/// Aggregate numbers for one holding, derived from its complete history.
///
/// The cost basis is history-wide: the average buy price weighs every BUY
/// ever recorded (fees included), not just the lots still held. Dividends
/// count net of their recorded tax, with no date filter. Both percentage
/// figures are exactly zero when nothing was ever invested.
pub fn compute_metrics(
    transactions: &[Transaction],
    dividends: &[Dividend],
    sell_records: &[SellGainLoss],
    current_price: &BigDecimal,
    shares: &BigDecimal,
) -> Result<InvestmentMetrics, AppError> {
    validate(transactions, dividends)?;

    let mut total_invested = BigDecimal::zero();
    let mut total_quantity_bought = BigDecimal::zero();
    for tx in transactions.iter().filter(|tx| tx.side == Side::Buy) {
        let tax = tx.tax.clone().unwrap_or_else(BigDecimal::zero);
        total_invested += &tx.quantity * &tx.price + tax;
        total_quantity_bought += &tx.quantity;
    }

    let avg_buy_price = if total_quantity_bought.is_zero() {
        BigDecimal::zero()
    } else {
        &total_invested / &total_quantity_bought
    };

    let total_dividends = dividends
        .iter()
        .map(|d| &d.amount - d.tax.clone().unwrap_or_else(BigDecimal::zero))
        .sum::<BigDecimal>();

    let realized_gain_loss = sell_records
        .iter()
        .map(|s| s.realized_profit_loss.clone())
        .sum::<BigDecimal>();

    let current_value = shares * current_price;
    let unrealized_gain_loss = &current_value - &avg_buy_price * shares;
    let total_profit_loss = &unrealized_gain_loss + &total_dividends + &realized_gain_loss;

    let hundred = BigDecimal::from(100);
    let (profit_loss_percentage, return_on_investment) = if total_invested.is_zero() {
        (BigDecimal::zero(), BigDecimal::zero())
    } else {
        let pl_pct = &total_profit_loss / &total_invested * &hundred;
        let recovered = &current_value + &total_dividends + &realized_gain_loss;
        let roi = (recovered / &total_invested - BigDecimal::from(1)) * &hundred;
        (pl_pct, roi)
    };

    Ok(InvestmentMetrics {
        avg_buy_price,
        total_invested,
        total_quantity_bought,
        shares: shares.clone(),
        current_value,
        total_dividends,
        realized_gain_loss,
        unrealized_gain_loss,
        total_profit_loss,
        profit_loss_percentage,
        return_on_investment,
    })
}

fn validate(transactions: &[Transaction], dividends: &[Dividend]) -> Result<(), AppError> {
    let zero = BigDecimal::zero();
    for tx in transactions {
        if tx.quantity <= zero {
            return Err(AppError::Validation(
                "transaction quantity must be positive".into(),
            ));
        }
        if tx.price < zero {
            return Err(AppError::Validation(
                "transaction price cannot be negative".into(),
            ));
        }
    }
    for dividend in dividends {
        if dividend.amount < zero {
            return Err(AppError::Validation(
                "dividend amount cannot be negative".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;
    use uuid::Uuid;

    fn buy(quantity: i64, price: i64, tax: Option<&str>) -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            Side::Buy,
            BigDecimal::from(quantity),
            BigDecimal::from(price),
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            tax.map(|t| BigDecimal::from_str(t).unwrap()),
            None,
        )
    }

    #[test]
    fn single_buy_scenario() {
        // BUY 10 @ $100, quote now $150.
        let transactions = vec![buy(10, 100, None)];
        let metrics = compute_metrics(
            &transactions,
            &[],
            &[],
            &BigDecimal::from(150),
            &BigDecimal::from(10),
        )
        .unwrap();

        assert_eq!(metrics.avg_buy_price, BigDecimal::from(100));
        assert_eq!(metrics.total_invested, BigDecimal::from(1000));
        assert_eq!(metrics.current_value, BigDecimal::from(1500));
        assert_eq!(metrics.unrealized_gain_loss, BigDecimal::from(500));
        assert_eq!(metrics.total_profit_loss, BigDecimal::from(500));
        assert_eq!(metrics.profit_loss_percentage, BigDecimal::from(50));
        assert_eq!(metrics.return_on_investment, BigDecimal::from(50));
    }

    #[test]
    fn buy_fees_raise_the_cost_basis() {
        let transactions = vec![buy(10, 100, Some("10"))];
        let metrics = compute_metrics(
            &transactions,
            &[],
            &[],
            &BigDecimal::from(100),
            &BigDecimal::from(10),
        )
        .unwrap();

        assert_eq!(metrics.total_invested, BigDecimal::from(1010));
        assert_eq!(metrics.avg_buy_price, BigDecimal::from(101));
        assert_eq!(metrics.unrealized_gain_loss, BigDecimal::from(-10));
    }

    #[test]
    fn dividends_count_net_of_tax() {
        let transactions = vec![buy(10, 100, None)];
        let dividends = vec![Dividend::new(
            Uuid::new_v4(),
            BigDecimal::from(10),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Some(BigDecimal::from(3)),
            None,
        )];

        let metrics = compute_metrics(
            &transactions,
            &dividends,
            &[],
            &BigDecimal::from(100),
            &BigDecimal::from(10),
        )
        .unwrap();

        assert_eq!(metrics.total_dividends, BigDecimal::from(7));
        assert_eq!(metrics.total_profit_loss, BigDecimal::from(7));
    }

    #[test]
    fn realized_gains_flow_into_totals() {
        let transactions = vec![buy(10, 100, None)];
        let sells = vec![SellGainLoss::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BigDecimal::from(98),
        )];

        let metrics = compute_metrics(
            &transactions,
            &[],
            &sells,
            &BigDecimal::from(100),
            &BigDecimal::from(5),
        )
        .unwrap();

        assert_eq!(metrics.realized_gain_loss, BigDecimal::from(98));
        assert_eq!(metrics.total_profit_loss, BigDecimal::from(98));
    }

    #[test]
    fn empty_history_never_divides_by_zero() {
        let metrics = compute_metrics(
            &[],
            &[],
            &[],
            &BigDecimal::from(150),
            &BigDecimal::from(0),
        )
        .unwrap();

        assert_eq!(metrics.total_invested, BigDecimal::from(0));
        assert_eq!(metrics.profit_loss_percentage, BigDecimal::from(0));
        assert_eq!(metrics.return_on_investment, BigDecimal::from(0));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let mut bad = buy(10, 100, None);
        bad.quantity = BigDecimal::from(-1);

        let result = compute_metrics(
            &[bad],
            &[],
            &[],
            &BigDecimal::from(100),
            &BigDecimal::from(0),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
