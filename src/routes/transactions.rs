use axum::extract::{Path, Query, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreateTransaction, Transaction};
use crate::routes::{Page, Pagination, UserId};
use crate::services::{investment_service, transaction_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:investment_id/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/:investment_id/transactions/:transaction_id",
            delete(delete_transaction),
        )
}

async fn list_transactions(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Transaction>>, AppError> {
    investment_service::fetch_one(&state.pool, investment_id, user_id).await?;

    let offset = (pagination.page() - 1) * pagination.limit();
    let transactions = db::transaction_queries::fetch_paginated(
        &state.pool,
        investment_id,
        pagination.limit(),
        offset,
    )
    .await?;
    let total = db::transaction_queries::count_for_investment(&state.pool, investment_id).await?;

    Ok(Json(Page {
        data: transactions,
        total,
    }))
}

async fn create_transaction(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(investment_id): Path<Uuid>,
    Json(input): Json<CreateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    info!(
        "POST /api/investments/{}/transactions - Recording transaction",
        investment_id
    );
    let investment =
        investment_service::fetch_one(&state.pool, investment_id, user_id).await?;
    let transaction = transaction_service::create(
        &state.pool,
        &state.gateway,
        &state.tax_policy,
        &investment,
        input,
    )
    .await?;
    Ok(Json(transaction))
}

async fn delete_transaction(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path((investment_id, transaction_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!(
        "DELETE /api/investments/{}/transactions/{}",
        investment_id, transaction_id
    );
    investment_service::fetch_one(&state.pool, investment_id, user_id).await?;
    transaction_service::delete(
        &state.pool,
        &state.gateway,
        &state.tax_policy,
        investment_id,
        transaction_id,
    )
    .await?;
    Ok(Json(
        serde_json::json!({ "message": "Transaction deleted successfully" }),
    ))
}
