use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Investment, Transaction};

// Creating an investment and its opening BUY is one atomic unit; a holding
// without its first transaction is never visible.
pub async fn insert_with_initial_buy(
    pool: &PgPool,
    investment: &Investment,
    opening_buy: &Transaction,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO investments (id, user_id, symbol, name, type, currency, current_price, shares, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(investment.id)
    .bind(investment.user_id)
    .bind(&investment.symbol)
    .bind(&investment.name)
    .bind(investment.kind)
    .bind(investment.currency)
    .bind(&investment.current_price)
    .bind(&investment.shares)
    .bind(investment.created_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO transactions (id, investment_id, side, quantity, price, date, tax, observation, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(opening_buy.id)
    .bind(opening_buy.investment_id)
    .bind(opening_buy.side)
    .bind(&opening_buy.quantity)
    .bind(&opening_buy.price)
    .bind(opening_buy.date)
    .bind(opening_buy.tax.as_ref())
    .bind(opening_buy.observation.as_ref())
    .bind(opening_buy.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

pub async fn fetch_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Investment>, sqlx::Error> {
    sqlx::query_as::<_, Investment>(
        "SELECT id, user_id, symbol, name, type, currency, current_price, shares, created_at
         FROM investments
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_one(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Investment>, sqlx::Error> {
    sqlx::query_as::<_, Investment>(
        "SELECT id, user_id, symbol, name, type, currency, current_price, shares, created_at
         FROM investments
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_for_user(
    pool: &PgPool,
    user_id: Uuid,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Investment>, sqlx::Error> {
    sqlx::query_as::<_, Investment>(
        r#"
        SELECT id, user_id, symbol, name, type, currency, current_price, shares, created_at
        FROM investments
        WHERE user_id = $1
          AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR symbol ILIKE '%' || $2 || '%')
        ORDER BY created_at ASC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_for_user(
    pool: &PgPool,
    user_id: Uuid,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM investments
        WHERE user_id = $1
          AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR symbol ILIKE '%' || $2 || '%')
        "#,
    )
    .bind(user_id)
    .bind(search)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn fetch_all_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Investment>, sqlx::Error> {
    sqlx::query_as::<_, Investment>(
        "SELECT id, user_id, symbol, name, type, currency, current_price, shares, created_at
         FROM investments
         WHERE user_id = $1
         ORDER BY created_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn update_current_price(
    pool: &PgPool,
    id: Uuid,
    price: &BigDecimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE investments SET current_price = $2 WHERE id = $1")
        .bind(id)
        .bind(price)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM investments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
