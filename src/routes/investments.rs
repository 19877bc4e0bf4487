use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateInvestment, Investment, InvestmentMetrics};
use crate::routes::{Page, Pagination, UserId};
use crate::services::equity_series::SeriesOptions;
use crate::services::investment_service::{self, InvestmentDetail};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_investments).post(create_investment))
        .route(
            "/:investment_id",
            get(get_investment).delete(delete_investment),
        )
        .route("/:investment_id/metrics", get(get_metrics))
        .route("/:investment_id/series", get(get_series))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    search: Option<String>,
    limit: Option<i64>,
    page: Option<i64>,
}

async fn list_investments(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Investment>>, AppError> {
    let pagination = Pagination {
        limit: params.limit,
        page: params.page,
    };
    let (investments, total) = investment_service::list(
        &state.pool,
        user_id,
        params.search.as_deref(),
        pagination.limit(),
        pagination.page(),
    )
    .await?;
    Ok(Json(Page {
        data: investments,
        total,
    }))
}

async fn create_investment(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(input): Json<CreateInvestment>,
) -> Result<Json<Investment>, AppError> {
    info!("POST /api/investments - Creating investment for {}", input.symbol);
    let investment = investment_service::create(&state.pool, user_id, input).await?;
    Ok(Json(investment))
}

async fn get_investment(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
) -> Result<Json<InvestmentDetail>, AppError> {
    let detail = investment_service::fetch_detail(&state.pool, investment_id, user_id).await?;
    Ok(Json(detail))
}

async fn delete_investment(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!("DELETE /api/investments/{}", investment_id);
    investment_service::delete(&state.pool, investment_id, user_id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Investment deleted successfully" }),
    ))
}

async fn get_metrics(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
) -> Result<Json<InvestmentMetrics>, AppError> {
    let metrics = investment_service::metrics(&state.pool, investment_id, user_id).await?;
    Ok(Json(metrics))
}

#[derive(Debug, Deserialize)]
struct SeriesParams {
    stop_when_zero: Option<bool>,
}

async fn get_series(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<Vec<crate::models::EquityPoint>>, AppError> {
    let series = investment_service::equity_series(
        &state.pool,
        &state.gateway,
        investment_id,
        user_id,
        SeriesOptions {
            stop_when_zero: params.stop_when_zero.unwrap_or(false),
        },
    )
    .await?;
    Ok(Json(series))
}
