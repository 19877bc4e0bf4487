use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_side", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

// A buy or sell event. Immutable once recorded: rows are only ever deleted,
// which also cascades away all dividends dated after them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub investment_id: Uuid,
    pub side: Side,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub date: DateTime<Utc>,
    pub tax: Option<BigDecimal>,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        investment_id: Uuid,
        side: Side,
        quantity: BigDecimal,
        price: BigDecimal,
        date: DateTime<Utc>,
        tax: Option<BigDecimal>,
        observation: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            investment_id,
            side,
            quantity,
            price,
            date,
            tax,
            observation,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTransaction {
    pub side: Side,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub date: DateTime<Utc>,
    pub tax: Option<BigDecimal>,
    pub observation: Option<String>,
}
