use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::routes::UserId;
use crate::services::investment_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/refresh", post(refresh_prices))
}

async fn refresh_prices(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<serde_json::Value>, AppError> {
    info!("POST /api/prices/refresh - Refreshing quotes for user {}", user_id);
    let failed_symbols =
        investment_service::refresh_prices(&state.pool, &state.gateway, user_id).await?;

    if !failed_symbols.is_empty() {
        return Err(AppError::Validation(format!(
            "Some symbols were not found: {}",
            failed_symbols.join(", ")
        )));
    }

    Ok(Json(
        serde_json::json!({ "message": "Investments updated successfully" }),
    ))
}
