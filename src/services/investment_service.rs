use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    CreateInvestment, Dividend, Investment, InvestmentMetrics, SellGainLoss, Side, Transaction,
};
use crate::services::equity_series::{monthly_equity_series, SeriesOptions};
use crate::services::gateway::MarketDataGateway;
use crate::services::metrics::compute_metrics;
use crate::models::EquityPoint;

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    input: CreateInvestment,
) -> Result<Investment, AppError> {
    if input.symbol.trim().is_empty() {
        return Err(AppError::Validation("Symbol cannot be empty".into()));
    }
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".into()));
    }
    let zero = BigDecimal::zero();
    if input.shares <= zero {
        return Err(AppError::Validation("Shares must be positive".into()));
    }
    if input.buy_price < zero {
        return Err(AppError::Validation("Buy price cannot be negative".into()));
    }

    // The opening quote is simply the purchase price until the next refresh.
    let investment = Investment::new(
        user_id,
        input.symbol.trim().to_uppercase(),
        input.name,
        input.kind,
        input.currency,
        input.buy_price.clone(),
        input.shares.clone(),
    );
    let opening_buy = Transaction::new(
        investment.id,
        Side::Buy,
        input.shares,
        input.buy_price,
        input.buy_date,
        input.fees,
        None,
    );

    db::investment_queries::insert_with_initial_buy(pool, &investment, &opening_buy).await?;
    Ok(investment)
}

pub async fn fetch_one(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Investment, AppError> {
    db::investment_queries::fetch_one(pool, id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Investment {} not found", id)))
}

pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    search: Option<&str>,
    limit: i64,
    page: i64,
) -> Result<(Vec<Investment>, i64), AppError> {
    let offset = (page.max(1) - 1) * limit;
    let investments =
        db::investment_queries::fetch_for_user(pool, user_id, search, limit, offset).await?;
    let total = db::investment_queries::count_for_user(pool, user_id, search).await?;
    Ok((investments, total))
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    // Ownership check first; the delete cascades transactions, dividends and
    // realized P&L rows.
    fetch_one(pool, id, user_id).await?;
    match db::investment_queries::delete(pool, id).await? {
        0 => Err(AppError::NotFound(format!("Investment {} not found", id))),
        _ => Ok(()),
    }
}

/// Full history of one holding, for the detail endpoint.
#[derive(Debug, serde::Serialize)]
pub struct InvestmentDetail {
    pub investment: Investment,
    pub transactions: Vec<Transaction>,
    pub dividends: Vec<Dividend>,
    pub sell_gain_loss: Vec<SellGainLoss>,
}

pub async fn fetch_detail(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<InvestmentDetail, AppError> {
    let investment = fetch_one(pool, id, user_id).await?;
    let transactions = db::transaction_queries::fetch_for_investment(pool, id).await?;
    let dividends = db::dividend_queries::fetch_for_investment(pool, id).await?;
    let sell_gain_loss = db::sell_gain_loss_queries::fetch_for_investment(pool, id).await?;
    Ok(InvestmentDetail {
        investment,
        transactions,
        dividends,
        sell_gain_loss,
    })
}

pub async fn metrics(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<InvestmentMetrics, AppError> {
    let detail = fetch_detail(pool, id, user_id).await?;
    compute_metrics(
        &detail.transactions,
        &detail.dividends,
        &detail.sell_gain_loss,
        &detail.investment.current_price,
        &detail.investment.shares,
    )
}

pub async fn equity_series(
    pool: &PgPool,
    gateway: &MarketDataGateway,
    id: Uuid,
    user_id: Uuid,
    options: SeriesOptions,
) -> Result<Vec<EquityPoint>, AppError> {
    let investment = fetch_one(pool, id, user_id).await?;
    let transactions = db::transaction_queries::fetch_for_investment(pool, id).await?;
    let dividends = db::dividend_queries::fetch_for_investment(pool, id).await?;
    monthly_equity_series(
        gateway,
        &investment.symbol,
        &transactions,
        &dividends,
        options,
    )
    .await
}

/// Refresh every holding's cached quote. Symbols the provider cannot price
/// are reported back rather than failing the whole pass.
pub async fn refresh_prices(
    pool: &PgPool,
    gateway: &MarketDataGateway,
    user_id: Uuid,
) -> Result<Vec<String>, AppError> {
    let investments = db::investment_queries::fetch_all_for_user(pool, user_id).await?;

    let mut failed_symbols = Vec::new();
    for investment in investments {
        match gateway.current_price(&investment.symbol).await {
            Some(price) => {
                db::investment_queries::update_current_price(pool, investment.id, &price).await?;
            }
            None => {
                warn!("No current price for {}", investment.symbol);
                failed_symbols.push(investment.symbol);
            }
        }
    }

    if failed_symbols.is_empty() {
        info!("Refreshed prices for all investments of user {}", user_id);
    }
    Ok(failed_symbols)
}
