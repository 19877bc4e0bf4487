use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "currency", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Brl,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Brl => write!(f, "BRL"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "BRL" => Ok(Currency::Brl),
            other => Err(format!("unknown currency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "investment_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InvestmentType {
    Stock,
    Etf,
    Crypto,
    Fund,
}

// A holding the user tracks. `shares` is a running total maintained on every
// transaction create/delete; it is never recomputed from history on the
// mutation path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: InvestmentType,
    pub currency: Currency,
    pub current_price: BigDecimal,
    pub shares: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl Investment {
    pub fn new(
        user_id: Uuid,
        symbol: String,
        name: String,
        kind: InvestmentType,
        currency: Currency,
        current_price: BigDecimal,
        shares: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            name,
            kind,
            currency,
            current_price,
            shares,
            created_at: Utc::now(),
        }
    }
}

// Creating an investment always records its first BUY in the same unit of work.
#[derive(Debug, Deserialize)]
pub struct CreateInvestment {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InvestmentType,
    pub currency: Currency,
    pub buy_price: BigDecimal,
    pub buy_date: DateTime<Utc>,
    pub shares: BigDecimal,
    pub fees: Option<BigDecimal>,
}
