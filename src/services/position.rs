use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use crate::models::{Side, Transaction};

/// Shares held as of `as_of`: signed sum of every transaction dated at or
/// before it. Pure and O(n); callers iterating many dates should pre-sort the
/// slice once and reuse it. The result is only negative when the underlying
/// history is corrupt; no validation happens here.
pub fn shares_at_date(transactions: &[Transaction], as_of: DateTime<Utc>) -> BigDecimal {
    let mut shares = BigDecimal::zero();
    for tx in transactions {
        if tx.date > as_of {
            continue;
        }
        match tx.side {
            Side::Buy => shares += &tx.quantity,
            Side::Sell => shares -= &tx.quantity,
        }
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn tx(side: Side, quantity: i64, date: DateTime<Utc>) -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            side,
            BigDecimal::from(quantity),
            BigDecimal::from(100),
            date,
            None,
            None,
        )
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn sums_signed_quantities_up_to_the_date() {
        let history = vec![
            tx(Side::Buy, 10, day(5)),
            tx(Side::Buy, 5, day(10)),
            tx(Side::Sell, 3, day(20)),
        ];

        assert_eq!(shares_at_date(&history, day(1)), BigDecimal::from(0));
        assert_eq!(shares_at_date(&history, day(5)), BigDecimal::from(10));
        assert_eq!(shares_at_date(&history, day(15)), BigDecimal::from(15));
        assert_eq!(shares_at_date(&history, day(25)), BigDecimal::from(12));
    }

    #[test]
    fn transaction_on_the_query_date_is_included() {
        let history = vec![tx(Side::Buy, 7, day(5))];
        assert_eq!(shares_at_date(&history, day(5)), BigDecimal::from(7));
    }

    #[test]
    fn buys_only_history_is_monotonic_non_decreasing() {
        let history = vec![
            tx(Side::Buy, 1, day(3)),
            tx(Side::Buy, 2, day(9)),
            tx(Side::Buy, 4, day(21)),
        ];

        let mut previous = BigDecimal::from(-1);
        for d in 1..=28 {
            let current = shares_at_date(&history, day(d));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn matches_running_total_after_last_transaction() {
        let history = vec![
            tx(Side::Buy, 10, day(2)),
            tx(Side::Sell, 4, day(8)),
            tx(Side::Buy, 1, day(14)),
        ];

        // The incrementally maintained running total for the same history.
        let running_total = BigDecimal::from(10 - 4 + 1);
        assert_eq!(shares_at_date(&history, day(28)), running_total);
    }
}
