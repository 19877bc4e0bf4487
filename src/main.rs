use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use investfolio_backend::app;
use investfolio_backend::config::{GatewayConfig, TaxPolicy};
use investfolio_backend::external::fx::GatewayFxConverter;
use investfolio_backend::external::yahoo::YahooProvider;
use investfolio_backend::logging::{init_logging, LoggingConfig};
use investfolio_backend::services::gateway::MarketDataGateway;
use investfolio_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let provider = Arc::new(YahooProvider::new());
    let gateway = MarketDataGateway::new(provider, GatewayConfig::from_env());
    let fx = Arc::new(GatewayFxConverter::new(gateway.clone()));

    let state = AppState {
        pool,
        gateway,
        fx,
        tax_policy: TaxPolicy::from_env(),
    };
    let app = app::create_app(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Investfolio backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
