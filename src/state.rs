use std::sync::Arc;

use sqlx::PgPool;

use crate::config::TaxPolicy;
use crate::external::fx::FxConverter;
use crate::services::gateway::MarketDataGateway;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gateway: Arc<MarketDataGateway>,
    pub fx: Arc<dyn FxConverter>,
    pub tax_policy: TaxPolicy,
}
