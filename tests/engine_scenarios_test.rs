//! End-to-end scenarios for the financial engine: position reconstruction,
//! metrics, realized P&L at sale time, and dividend reconciliation planning.
//! Everything here is market data a user could actually have entered.

use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeZone, Utc};
use std::str::FromStr;
use uuid::Uuid;

use investfolio_backend::config::TaxPolicy;
use investfolio_backend::external::market_data::ExternalDividendEvent;
use investfolio_backend::models::{Currency, Dividend, SellGainLoss, Side, Transaction};
use investfolio_backend::services::dividend_sync::{plan_dividend_sync, SyncAction};
use investfolio_backend::services::metrics::compute_metrics;
use investfolio_backend::services::position::shares_at_date;
use investfolio_backend::services::transaction_service::realized_profit_loss;

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn transaction(side: Side, quantity: &str, price: &str, d: DateTime<Utc>) -> Transaction {
    Transaction::new(
        Uuid::new_v4(),
        side,
        dec(quantity),
        dec(price),
        d,
        None,
        None,
    )
}

// ---------------------------------------------------------------------------
// A position accumulated, trimmed, and rebuilt over a year
// ---------------------------------------------------------------------------

mod position_reconstruction {
    use super::*;

    #[test]
    fn dollar_cost_averaging_with_a_mid_year_trim() {
        let history = vec![
            transaction(Side::Buy, "12.5", "380.10", date(2024, 1, 15)),
            transaction(Side::Buy, "12.5", "402.55", date(2024, 2, 15)),
            transaction(Side::Buy, "12.5", "395.00", date(2024, 3, 15)),
            transaction(Side::Sell, "20", "410.20", date(2024, 6, 3)),
            transaction(Side::Buy, "5", "388.40", date(2024, 9, 16)),
        ];

        assert_eq!(shares_at_date(&history, date(2024, 1, 1)), dec("0"));
        assert_eq!(shares_at_date(&history, date(2024, 2, 20)), dec("25"));
        assert_eq!(shares_at_date(&history, date(2024, 5, 31)), dec("37.5"));
        assert_eq!(shares_at_date(&history, date(2024, 6, 30)), dec("17.5"));
        assert_eq!(shares_at_date(&history, date(2024, 12, 31)), dec("22.5"));
    }

    #[test]
    fn full_liquidation_reaches_exactly_zero() {
        let history = vec![
            transaction(Side::Buy, "8", "100", date(2024, 1, 5)),
            transaction(Side::Buy, "2", "110", date(2024, 2, 5)),
            transaction(Side::Sell, "10", "120", date(2024, 3, 5)),
        ];

        assert_eq!(shares_at_date(&history, date(2024, 3, 5)), dec("0"));
    }
}

// ---------------------------------------------------------------------------
// Metrics over a whole holding lifecycle
// ---------------------------------------------------------------------------

mod metrics_scenarios {
    use super::*;

    #[test]
    fn reference_buy_and_hold_numbers() {
        // BUY 10 @ $100 on 2024-01-05, quote now $150.
        let transactions = vec![transaction(Side::Buy, "10", "100", date(2024, 1, 5))];

        let metrics =
            compute_metrics(&transactions, &[], &[], &dec("150"), &dec("10")).unwrap();

        assert_eq!(metrics.avg_buy_price, dec("100"));
        assert_eq!(metrics.total_invested, dec("1000"));
        assert_eq!(metrics.current_value, dec("1500"));
        assert_eq!(metrics.unrealized_gain_loss, dec("500"));
        assert_eq!(metrics.total_profit_loss, dec("500"));
        assert_eq!(metrics.profit_loss_percentage, dec("50"));
        assert_eq!(metrics.return_on_investment, dec("50"));
    }

    #[test]
    fn dividends_and_realized_gains_compound_the_return() {
        let transactions = vec![
            transaction(Side::Buy, "10", "100", date(2024, 1, 5)),
            transaction(Side::Sell, "5", "120", date(2024, 6, 1)),
        ];
        let dividends = vec![Dividend::new(
            Uuid::new_v4(),
            dec("10.00"),
            date(2024, 3, 15),
            Some(dec("3.00")),
            None,
        )];
        let sells = vec![SellGainLoss::new(Uuid::new_v4(), Uuid::new_v4(), dec("98"))];

        // 5 shares left, quote at $130.
        let metrics =
            compute_metrics(&transactions, &dividends, &sells, &dec("130"), &dec("5")).unwrap();

        assert_eq!(metrics.current_value, dec("650"));
        // Cost basis stays history-wide even after the sale.
        assert_eq!(metrics.avg_buy_price, dec("100"));
        assert_eq!(metrics.unrealized_gain_loss, dec("150"));
        assert_eq!(metrics.total_dividends, dec("7"));
        assert_eq!(metrics.realized_gain_loss, dec("98"));
        assert_eq!(metrics.total_profit_loss, dec("255"));
        assert_eq!(metrics.profit_loss_percentage, dec("25.5"));
    }

    #[test]
    fn percentages_are_zero_without_any_investment() {
        let metrics = compute_metrics(&[], &[], &[], &dec("99"), &dec("0")).unwrap();
        assert_eq!(metrics.profit_loss_percentage, dec("0"));
        assert_eq!(metrics.return_on_investment, dec("0"));
    }
}

// ---------------------------------------------------------------------------
// Realized P&L fixed at sale time
// ---------------------------------------------------------------------------

mod realized_gains {
    use super::*;

    #[test]
    fn sale_against_weighted_average_with_fees() {
        // BUY 10 @ $100, then SELL 5 @ $120 with $2 of fees.
        let history = vec![transaction(Side::Buy, "10", "100", date(2024, 1, 5))];

        let pnl = realized_profit_loss(
            &history,
            &dec("5"),
            &dec("120"),
            Some(&dec("2")),
            date(2024, 6, 1),
        );
        assert_eq!(pnl, dec("98"));
    }

    #[test]
    fn buys_after_the_sale_date_do_not_count() {
        let history = vec![
            transaction(Side::Buy, "10", "100", date(2024, 1, 5)),
            transaction(Side::Buy, "10", "300", date(2024, 8, 1)),
        ];

        let pnl =
            realized_profit_loss(&history, &dec("5"), &dec("120"), None, date(2024, 6, 1));
        assert_eq!(pnl, dec("100"));
    }
}

// ---------------------------------------------------------------------------
// Dividend reconciliation planning
// ---------------------------------------------------------------------------

mod dividend_reconciliation {
    use super::*;

    fn event(amount: &str, d: DateTime<Utc>) -> ExternalDividendEvent {
        ExternalDividendEvent {
            ex_date: d,
            amount: dec(amount),
        }
    }

    #[test]
    fn quarterly_payer_first_sync() {
        let investment_id = Uuid::new_v4();
        let transactions = vec![transaction(Side::Buy, "20", "180", date(2024, 1, 10))];
        let events = vec![
            event("0.50", date(2024, 2, 9)),
            event("0.50", date(2024, 5, 10)),
            event("0.55", date(2024, 8, 9)),
        ];

        let actions = plan_dividend_sync(
            investment_id,
            "AAPL",
            Currency::Usd,
            &transactions,
            &[],
            &events,
            &TaxPolicy::default(),
        );

        assert_eq!(actions.len(), 3);
        for action in &actions {
            let SyncAction::Create(dividend) = action else {
                panic!("first sync only creates rows");
            };
            assert_eq!(dividend.investment_id, investment_id);
            // $0.50 or $0.55 across 20 shares, 30% withheld.
            assert!(dividend.amount == dec("10") || dividend.amount == dec("11"));
            let tax = dividend.tax.clone().unwrap();
            assert!(tax == dec("3") || tax == dec("3.3"));
        }
    }

    #[test]
    fn second_sync_with_no_new_events_plans_nothing() {
        let investment_id = Uuid::new_v4();
        let transactions = vec![transaction(Side::Buy, "20", "180", date(2024, 1, 10))];
        let events = vec![event("0.50", date(2024, 2, 9))];

        let first = plan_dividend_sync(
            investment_id,
            "AAPL",
            Currency::Usd,
            &transactions,
            &[],
            &events,
            &TaxPolicy::default(),
        );
        let SyncAction::Create(created) = &first[0] else {
            panic!("expected a create");
        };

        let second = plan_dividend_sync(
            investment_id,
            "AAPL",
            Currency::Usd,
            &transactions,
            std::slice::from_ref(created),
            &events,
            &TaxPolicy::default(),
        );
        assert!(second.is_empty(), "sync is idempotent by value");
    }

    #[test]
    fn manual_row_on_an_ex_date_is_overwritten() {
        // A hand-entered dividend dated exactly on the provider ex-date is an
        // update candidate like any other row.
        let transactions = vec![transaction(Side::Buy, "20", "180", date(2024, 1, 10))];
        let manual = Dividend::new(
            Uuid::new_v4(),
            dec("9.99"),
            date(2024, 2, 9),
            None,
            Some("entered by hand".to_string()),
        );

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &[manual.clone()],
            &[event("0.50", date(2024, 2, 9))],
            &TaxPolicy::default(),
        );

        assert_eq!(actions.len(), 1);
        let SyncAction::Update { id, amount, tax, .. } = &actions[0] else {
            panic!("expected an update");
        };
        assert_eq!(*id, manual.id);
        assert_eq!(*amount, dec("10"));
        assert_eq!(*tax, dec("3"));
    }

    #[test]
    fn configurable_withholding_rate_is_honored() {
        let policy = TaxPolicy {
            withholding_rate: dec("0.15"),
            taxed_currency: Currency::Usd,
        };
        let transactions = vec![transaction(Side::Buy, "10", "180", date(2024, 1, 10))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &[],
            &[event("1.00", date(2024, 2, 9))],
            &policy,
        );

        let SyncAction::Create(dividend) = &actions[0] else {
            panic!("expected a create");
        };
        assert_eq!(dividend.amount, dec("10"));
        assert_eq!(dividend.tax, Some(dec("1.5")));
    }

    #[test]
    fn events_before_the_first_purchase_are_ignored() {
        let transactions = vec![transaction(Side::Buy, "10", "180", date(2024, 3, 1))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &[],
            &[event("0.50", date(2024, 2, 9))],
            &TaxPolicy::default(),
        );
        assert!(actions.is_empty());
    }
}
