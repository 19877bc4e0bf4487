use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreateDividend, Dividend};

pub async fn list(
    pool: &PgPool,
    investment_id: Uuid,
    limit: i64,
    page: i64,
) -> Result<(Vec<Dividend>, i64), AppError> {
    let offset = (page.max(1) - 1) * limit;
    let dividends =
        db::dividend_queries::fetch_paginated(pool, investment_id, limit, offset).await?;
    let total = db::dividend_queries::count_for_investment(pool, investment_id).await?;
    Ok((dividends, total))
}

// Manual entry. The row is indistinguishable from a synchronized one and a
// later sync will overwrite it if its date matches a provider ex-date.
pub async fn create(
    pool: &PgPool,
    investment_id: Uuid,
    input: CreateDividend,
) -> Result<Dividend, AppError> {
    let zero = BigDecimal::zero();
    if input.amount < zero {
        return Err(AppError::Validation("Amount cannot be negative".into()));
    }
    if matches!(&input.tax, Some(tax) if *tax < zero) {
        return Err(AppError::Validation("Tax cannot be negative".into()));
    }

    let dividend = Dividend::new(
        investment_id,
        input.amount,
        input.date,
        input.tax,
        input.observation,
    );
    db::dividend_queries::insert(pool, &dividend).await?;
    Ok(dividend)
}

pub async fn delete(
    pool: &PgPool,
    investment_id: Uuid,
    dividend_id: Uuid,
) -> Result<(), AppError> {
    db::dividend_queries::fetch_one(pool, dividend_id, investment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Dividend {} not found", dividend_id)))?;
    db::dividend_queries::delete(pool, dividend_id).await?;
    Ok(())
}
