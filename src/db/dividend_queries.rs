use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Dividend;

// Most-recent-first: the synchronizer reads the head to find where its last
// run stopped.
pub async fn fetch_for_investment(
    pool: &PgPool,
    investment_id: Uuid,
) -> Result<Vec<Dividend>, sqlx::Error> {
    sqlx::query_as::<_, Dividend>(
        "SELECT id, investment_id, amount, date, tax, observation, created_at
         FROM dividends
         WHERE investment_id = $1
         ORDER BY date DESC",
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
) -> Result<Vec<Dividend>, sqlx::Error> {
    sqlx::query_as::<_, Dividend>(
        "SELECT id, investment_id, amount, date, tax, observation, created_at
         FROM dividends
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
        sqlx::query_as("SELECT COUNT(*) FROM dividends WHERE investment_id = $1")
            .bind(investment_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn fetch_one(
    pool: &PgPool,
    id: Uuid,
    investment_id: Uuid,
) -> Result<Option<Dividend>, sqlx::Error> {
    sqlx::query_as::<_, Dividend>(
        "SELECT id, investment_id, amount, date, tax, observation, created_at
         FROM dividends
         WHERE id = $1 AND investment_id = $2",
    )
    .bind(id)
    .bind(investment_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &PgPool, dividend: &Dividend) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO dividends (id, investment_id, amount, date, tax, observation, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(dividend.id)
    .bind(dividend.investment_id)
    .bind(&dividend.amount)
    .bind(dividend.date)
    .bind(dividend.tax.as_ref())
    .bind(dividend.observation.as_ref())
    .bind(dividend.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_amount_and_tax(
    pool: &PgPool,
    id: Uuid,
    amount: &BigDecimal,
    tax: &BigDecimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE dividends SET amount = $2, tax = $3 WHERE id = $1")
        .bind(id)
        .bind(amount)
        .bind(tax)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM dividends WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
