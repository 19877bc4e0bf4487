use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Realized P&L locked in by a SELL. Computed once when the sale is recorded,
// against the weighted average buy price up to the sale date; deleting or
// adding earlier buys afterwards does not rewrite it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SellGainLoss {
    pub id: Uuid,
    pub investment_id: Uuid,
    pub transaction_id: Uuid,
    pub realized_profit_loss: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl SellGainLoss {
    pub fn new(investment_id: Uuid, transaction_id: Uuid, realized_profit_loss: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            investment_id,
            transaction_id,
            realized_profit_loss,
            created_at: Utc::now(),
        }
    }
}
