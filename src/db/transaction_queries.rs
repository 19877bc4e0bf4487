use sqlx::{PgPool, Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use crate::models::{SellGainLoss, Side, Transaction};

pub async fn fetch_for_investment(
    pool: &PgPool,
    investment_id: Uuid,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT id, investment_id, side, quantity, price, date, tax, observation, created_at
         FROM transactions
         WHERE investment_id = $1
         ORDER BY date ASC, created_at ASC",
    )
    .bind(investment_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_paginated(
    pool: &PgPool,
    investment_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT id, investment_id, side, quantity, price, date, tax, observation, created_at
         FROM transactions
         WHERE investment_id = $1
         ORDER BY date DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(investment_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_for_investment(
    pool: &PgPool,
    investment_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE investment_id = $1")
            .bind(investment_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn fetch_one(
    pool: &PgPool,
    id: Uuid,
    investment_id: Uuid,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT id, investment_id, side, quantity, price, date, tax, observation, created_at
         FROM transactions
         WHERE id = $1 AND investment_id = $2",
    )
    .bind(id)
    .bind(investment_id)
    .fetch_optional(pool)
    .await
}

// Recording a transaction, moving the running share total, dropping the
// dividends its date invalidates, and (for a SELL) locking in the realized
// P&L must land together or not at all.
pub async fn insert_with_effects(
    pool: &PgPool,
    transaction: &Transaction,
    realized: Option<&SellGainLoss>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO transactions (id, investment_id, side, quantity, price, date, tax, observation, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.investment_id)
    .bind(transaction.side)
    .bind(&transaction.quantity)
    .bind(&transaction.price)
    .bind(transaction.date)
    .bind(transaction.tax.as_ref())
    .bind(transaction.observation.as_ref())
    .bind(transaction.created_at)
    .execute(&mut *tx)
    .await?;

    apply_share_delta(&mut tx, transaction, false).await?;
    delete_dividends_after(&mut tx, transaction).await?;

    if let Some(record) = realized {
        sqlx::query(
            r#"
            INSERT INTO sell_gain_loss (id, investment_id, transaction_id, realized_profit_loss, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.investment_id)
        .bind(record.transaction_id)
        .bind(&record.realized_profit_loss)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

// Mirror image of insert_with_effects. The sell_gain_loss row of a deleted
// SELL goes away through its foreign key; realized P&L on other sales is
// deliberately left as recorded.
pub async fn delete_with_effects(
    pool: &PgPool,
    transaction: &Transaction,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(transaction.id)
        .execute(&mut *tx)
        .await?;

    apply_share_delta(&mut tx, transaction, true).await?;
    delete_dividends_after(&mut tx, transaction).await?;

    tx.commit().await
}

async fn apply_share_delta(
    tx: &mut PgTransaction<'_, Postgres>,
    transaction: &Transaction,
    reverse: bool,
) -> Result<(), sqlx::Error> {
    let mut delta = match transaction.side {
        Side::Buy => transaction.quantity.clone(),
        Side::Sell => -transaction.quantity.clone(),
    };
    if reverse {
        delta = -delta;
    }

    sqlx::query("UPDATE investments SET shares = shares + $2 WHERE id = $1")
        .bind(transaction.investment_id)
        .bind(delta)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn delete_dividends_after(
    tx: &mut PgTransaction<'_, Postgres>,
    transaction: &Transaction,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM dividends WHERE investment_id = $1 AND date > $2")
        .bind(transaction.investment_id)
        .bind(transaction.date)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
