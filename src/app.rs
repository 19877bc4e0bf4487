use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{dashboard, dividends, health, investments, prices, transactions};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest(
            "/api/investments",
            investments::router()
                .merge(transactions::router())
                .merge(dividends::router()),
        )
        .nest("/api/prices", prices::router())
        .nest("/api/dashboard", dashboard::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
