use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateDividend, Dividend};
use crate::routes::{Page, Pagination, UserId};
use crate::services::dividend_sync::{sync_investment_dividends, SyncOutcome};
use crate::services::{dividend_service, investment_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:investment_id/dividends",
            get(list_dividends).post(create_dividend),
        )
        .route(
            "/:investment_id/dividends/:dividend_id",
            delete(delete_dividend),
        )
        .route("/:investment_id/dividends/sync", post(sync_dividends))
}

async fn list_dividends(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Dividend>>, AppError> {
    investment_service::fetch_one(&state.pool, investment_id, user_id).await?;
    let (dividends, total) = dividend_service::list(
        &state.pool,
        investment_id,
        pagination.limit(),
        pagination.page(),
    )
    .await?;
    Ok(Json(Page {
        data: dividends,
        total,
    }))
}

async fn create_dividend(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
    Json(input): Json<CreateDividend>,
) -> Result<Json<Dividend>, AppError> {
    investment_service::fetch_one(&state.pool, investment_id, user_id).await?;
    let dividend = dividend_service::create(&state.pool, investment_id, input).await?;
    Ok(Json(dividend))
}

async fn delete_dividend(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path((investment_id, dividend_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    investment_service::fetch_one(&state.pool, investment_id, user_id).await?;
    dividend_service::delete(&state.pool, investment_id, dividend_id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Dividend deleted successfully" }),
    ))
}

async fn sync_dividends(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
) -> Result<Json<SyncOutcome>, AppError> {
    info!("POST /api/investments/{}/dividends/sync", investment_id);
    investment_service::fetch_one(&state.pool, investment_id, user_id).await?;
    let outcome = sync_investment_dividends(
        &state.pool,
        &state.gateway,
        &state.tax_policy,
        investment_id,
    )
    .await?;
    Ok(Json(outcome))
}
