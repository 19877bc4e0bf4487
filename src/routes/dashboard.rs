use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Currency, DashboardSummary, PortfolioChart};
use crate::routes::UserId;
use crate::services::dashboard_service::{self, ChartPeriod};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_summary))
        .route("/chart", get(get_chart))
}

#[derive(Debug, Deserialize)]
struct DashboardParams {
    currency: Option<String>,
    period: Option<String>,
}

fn parse_currency(raw: Option<&str>) -> Result<Currency, AppError> {
    match raw {
        Some(value) => value.parse().map_err(AppError::Validation),
        None => Ok(Currency::Usd),
    }
}

async fn get_summary(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardSummary>, AppError> {
    let currency = parse_currency(params.currency.as_deref())?;
    let summary =
        dashboard_service::summary(&state.pool, state.fx.as_ref(), user_id, currency).await?;
    Ok(Json(summary))
}

async fn get_chart(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<DashboardParams>,
) -> Result<Json<PortfolioChart>, AppError> {
    let currency = parse_currency(params.currency.as_deref())?;
    let period: ChartPeriod = params.period.as_deref().unwrap_or("6-months").parse()?;

    let chart = dashboard_service::chart(
        &state.pool,
        &state.gateway,
        state.fx.as_ref(),
        user_id,
        period,
        currency,
    )
    .await?;
    Ok(Json(chart))
}
