use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TaxPolicy;
use crate::db;
use crate::errors::AppError;
use crate::external::market_data::ExternalDividendEvent;
use crate::models::{Currency, Dividend, Transaction};
use crate::services::gateway::MarketDataGateway;
use crate::services::position::shares_at_date;

#[derive(Debug, Default, Serialize)]
pub struct SyncOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
}

// One reconciliation step. Stored rows are matched to provider events by
// exact timestamp equality, so clock skew between provider dates and stored
// dates produces a Create next to the old row instead of an Update.
#[derive(Debug, Clone)]
pub enum SyncAction {
    Create(Dividend),
    Update {
        id: Uuid,
        date: DateTime<Utc>,
        amount: BigDecimal,
        tax: BigDecimal,
    },
    Delete {
        id: Uuid,
        date: DateTime<Utc>,
    },
}

/// Reconcile stored dividends against provider events for the window the
/// caller fetched. Pure; all I/O stays with the caller.
///
/// Per event, the raw per-share amount is scaled by the shares held at the
/// ex-date and rounded to 6 decimals; withholding applies only when the
/// investment is denominated in the policy's taxed currency. Events whose
/// scaled row already matches the stored one produce no action, which is what
/// makes a repeated sync a no-op.
pub fn plan_dividend_sync(
    investment_id: Uuid,
    symbol: &str,
    currency: Currency,
    transactions: &[Transaction],
    stored: &[Dividend],
    events: &[ExternalDividendEvent],
    policy: &TaxPolicy,
) -> Vec<SyncAction> {
    let by_date: HashMap<DateTime<Utc>, &Dividend> =
        stored.iter().map(|d| (d.date, d)).collect();
    let zero = BigDecimal::zero();

    let mut actions = Vec::new();
    for event in events {
        let shares = shares_at_date(transactions, event.ex_date);

        if shares <= zero {
            // Scaling is meaningless without a position; drop any row that
            // claims one existed.
            if let Some(existing) = by_date.get(&event.ex_date) {
                actions.push(SyncAction::Delete {
                    id: existing.id,
                    date: existing.date,
                });
            }
            continue;
        }

        let amount = (&event.amount * &shares).round(6);
        let tax = if currency == policy.taxed_currency {
            (&amount * &policy.withholding_rate).round(6)
        } else {
            BigDecimal::zero()
        };

        match by_date.get(&event.ex_date) {
            Some(existing) => {
                let stored_tax = existing.tax.clone().unwrap_or_else(BigDecimal::zero);
                if existing.amount != amount || stored_tax != tax {
                    actions.push(SyncAction::Update {
                        id: existing.id,
                        date: existing.date,
                        amount,
                        tax,
                    });
                }
            }
            None => {
                let observation = format!(
                    "{} dividend on {}",
                    symbol,
                    event.ex_date.format("%Y-%m-%d")
                );
                actions.push(SyncAction::Create(Dividend::new(
                    investment_id,
                    amount,
                    event.ex_date,
                    Some(tax),
                    Some(observation),
                )));
            }
        }
    }

    actions
}

/// Pull provider dividend events for the investment's open window and
/// converge the stored rows to them. Individual row failures are collected
/// and do not stop the rest of the reconciliation.
pub async fn sync_investment_dividends(
    pool: &PgPool,
    gateway: &MarketDataGateway,
    policy: &TaxPolicy,
    investment_id: Uuid,
) -> Result<SyncOutcome, AppError> {
    let investment = db::investment_queries::fetch_by_id(pool, investment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Investment {} not found", investment_id)))?;

    let transactions = db::transaction_queries::fetch_for_investment(pool, investment_id).await?;
    if transactions.is_empty() {
        return Ok(SyncOutcome::default());
    }
    let dividends = db::dividend_queries::fetch_for_investment(pool, investment_id).await?;

    // Resume from the most recent stored dividend, or cover the whole
    // holding's life on the first sync.
    let window_start = dividends
        .first()
        .map(|d| d.date)
        .unwrap_or(transactions[0].date);
    let window_end = Utc::now();

    let events = gateway
        .dividend_events(&investment.symbol, window_start, window_end)
        .await;

    let actions = plan_dividend_sync(
        investment_id,
        &investment.symbol,
        investment.currency,
        &transactions,
        &dividends,
        &events,
        policy,
    );

    let mut outcome = SyncOutcome::default();
    for action in actions {
        match action {
            SyncAction::Create(dividend) => {
                match db::dividend_queries::insert(pool, &dividend).await {
                    Ok(()) => outcome.created += 1,
                    Err(e) => record_failure(&mut outcome, dividend.date, e),
                }
            }
            SyncAction::Update {
                id,
                date,
                amount,
                tax,
            } => match db::dividend_queries::update_amount_and_tax(pool, id, &amount, &tax).await {
                Ok(()) => outcome.updated += 1,
                Err(e) => record_failure(&mut outcome, date, e),
            },
            SyncAction::Delete { id, date } => {
                match db::dividend_queries::delete(pool, id).await {
                    Ok(_) => outcome.deleted += 1,
                    Err(e) => record_failure(&mut outcome, date, e),
                }
            }
        }
    }

    info!(
        "Dividend sync for {}: {} created, {} updated, {} deleted, {} errors",
        investment.symbol,
        outcome.created,
        outcome.updated,
        outcome.deleted,
        outcome.errors.len()
    );
    Ok(outcome)
}

fn record_failure(outcome: &mut SyncOutcome, date: DateTime<Utc>, error: sqlx::Error) {
    warn!("Failed to persist dividend dated {}: {}", date, error);
    outcome
        .errors
        .push(format!("{}: {}", date.format("%Y-%m-%d"), error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn policy() -> TaxPolicy {
        TaxPolicy::default()
    }

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 0, 0, 0).unwrap()
    }

    fn buy(quantity: i64, date: DateTime<Utc>) -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            Side::Buy,
            BigDecimal::from(quantity),
            BigDecimal::from(100),
            date,
            None,
            None,
        )
    }

    fn sell(quantity: i64, date: DateTime<Utc>) -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            Side::Sell,
            BigDecimal::from(quantity),
            BigDecimal::from(100),
            date,
            None,
            None,
        )
    }

    fn event(amount: &str, date: DateTime<Utc>) -> ExternalDividendEvent {
        ExternalDividendEvent {
            ex_date: date,
            amount: BigDecimal::from_str(amount).unwrap(),
        }
    }

    // Replays the planned actions against the in-memory rows, the way the
    // database application loop would.
    fn apply(stored: &mut Vec<Dividend>, actions: &[SyncAction]) {
        for action in actions {
            match action {
                SyncAction::Create(d) => stored.push(d.clone()),
                SyncAction::Update {
                    id, amount, tax, ..
                } => {
                    let row = stored.iter_mut().find(|d| d.id == *id).unwrap();
                    row.amount = amount.clone();
                    row.tax = Some(tax.clone());
                }
                SyncAction::Delete { id, .. } => stored.retain(|d| d.id != *id),
            }
        }
    }

    #[test]
    fn scales_by_shares_and_withholds_for_usd() {
        let transactions = vec![buy(20, at(1, 2))];
        let events = vec![event("0.50", at(3, 15))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &[],
            &events,
            &policy(),
        );

        assert_eq!(actions.len(), 1);
        let SyncAction::Create(dividend) = &actions[0] else {
            panic!("expected a create");
        };
        assert_eq!(dividend.amount, BigDecimal::from_str("10").unwrap());
        assert_eq!(dividend.tax, Some(BigDecimal::from_str("3").unwrap()));
        assert_eq!(dividend.date, at(3, 15));
        let obs = dividend.observation.as_deref().unwrap();
        assert!(obs.contains("AAPL") && obs.contains("2024-03-15"));
    }

    #[test]
    fn brl_investments_synchronize_without_withholding() {
        let transactions = vec![buy(10, at(1, 2))];
        let events = vec![event("1.25", at(4, 1))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "PETR4.SA",
            Currency::Brl,
            &transactions,
            &[],
            &events,
            &policy(),
        );

        let SyncAction::Create(dividend) = &actions[0] else {
            panic!("expected a create");
        };
        assert_eq!(dividend.amount, BigDecimal::from_str("12.5").unwrap());
        assert_eq!(dividend.tax, Some(BigDecimal::from(0)));
    }

    #[test]
    fn matching_row_with_same_values_is_left_untouched() {
        let transactions = vec![buy(20, at(1, 2))];
        let stored = vec![Dividend::new(
            Uuid::new_v4(),
            BigDecimal::from_str("10").unwrap(),
            at(3, 15),
            Some(BigDecimal::from_str("3").unwrap()),
            None,
        )];
        let events = vec![event("0.50", at(3, 15))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &stored,
            &events,
            &policy(),
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn changed_amount_updates_the_existing_row() {
        let transactions = vec![buy(20, at(1, 2)), buy(20, at(2, 1))];
        let stored = vec![Dividend::new(
            Uuid::new_v4(),
            BigDecimal::from_str("10").unwrap(),
            at(3, 15),
            Some(BigDecimal::from_str("3").unwrap()),
            None,
        )];
        // 40 shares at the ex-date now.
        let events = vec![event("0.50", at(3, 15))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &stored,
            &events,
            &policy(),
        );

        assert_eq!(actions.len(), 1);
        let SyncAction::Update { amount, tax, .. } = &actions[0] else {
            panic!("expected an update");
        };
        assert_eq!(*amount, BigDecimal::from_str("20").unwrap());
        assert_eq!(*tax, BigDecimal::from_str("6").unwrap());
    }

    #[test]
    fn zero_share_event_deletes_a_stale_row_and_skips_otherwise() {
        let transactions = vec![buy(10, at(1, 2)), sell(10, at(2, 1))];
        let stale = Dividend::new(
            Uuid::new_v4(),
            BigDecimal::from(5),
            at(3, 15),
            None,
            None,
        );
        let events = vec![event("0.50", at(3, 15)), event("0.50", at(4, 15))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &[stale.clone()],
            &events,
            &policy(),
        );

        // One delete for the matched stale row; the second event has no
        // stored counterpart and is skipped.
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            SyncAction::Delete { id, .. } if *id == stale.id
        ));
    }

    #[test]
    fn timestamp_skew_creates_a_second_row_instead_of_updating() {
        let transactions = vec![buy(20, at(1, 2))];
        // Stored a second later than the provider reports it.
        let skewed = Dividend::new(
            Uuid::new_v4(),
            BigDecimal::from_str("10").unwrap(),
            at(3, 15) + chrono::Duration::seconds(1),
            Some(BigDecimal::from_str("3").unwrap()),
            None,
        );
        let events = vec![event("0.50", at(3, 15))];

        let actions = plan_dividend_sync(
            Uuid::new_v4(),
            "AAPL",
            Currency::Usd,
            &transactions,
            &[skewed],
            &events,
            &policy(),
        );
        assert!(matches!(&actions[0], SyncAction::Create(_)));
    }

    #[test]
    fn replanning_after_apply_is_a_no_op() {
        let transactions = vec![buy(20, at(1, 2)), buy(10, at(2, 10)), sell(30, at(5, 1))];
        let events = vec![
            event("0.50", at(3, 15)),
            event("0.55", at(4, 15)),
            event("0.60", at(6, 15)),
        ];
        let mut stored: Vec<Dividend> = Vec::new();

        let investment_id = Uuid::new_v4();
        let first = plan_dividend_sync(
            investment_id,
            "AAPL",
            Currency::Usd,
            &transactions,
            &stored,
            &events,
            &policy(),
        );
        assert!(!first.is_empty());
        apply(&mut stored, &first);

        let second = plan_dividend_sync(
            investment_id,
            "AAPL",
            Currency::Usd,
            &transactions,
            &stored,
            &events,
            &policy(),
        );
        assert!(second.is_empty());
    }
}
