use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// A dividend payout, already scaled by the shares held at its ex-date.
// Rows are either user-entered or created by the synchronizer; both kinds are
// matched by exact `date` equality when reconciling against provider events.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dividend {
    pub id: Uuid,
    pub investment_id: Uuid,
    pub amount: BigDecimal,
    pub date: DateTime<Utc>,
    pub tax: Option<BigDecimal>,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Dividend {
    pub fn new(
        investment_id: Uuid,
        amount: BigDecimal,
        date: DateTime<Utc>,
        tax: Option<BigDecimal>,
        observation: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            investment_id,
            amount,
            date,
            tax,
            observation,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDividend {
    pub amount: BigDecimal,
    pub date: DateTime<Utc>,
    pub tax: Option<BigDecimal>,
    pub observation: Option<String>,
}
