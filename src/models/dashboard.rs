use bigdecimal::BigDecimal;
use serde::Serialize;

// Headline numbers for the portfolio as a whole, in the display currency the
// caller asked for.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_value: BigDecimal,
    pub total_invested: BigDecimal,
    pub gain_loss: BigDecimal,
    pub dividends: BigDecimal,
    pub best_performing_investment: BestInvestment,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestInvestment {
    pub symbol: String,
    pub profit: BigDecimal,
    pub profit_percentage: BigDecimal,
}

impl Default for BestInvestment {
    fn default() -> Self {
        Self {
            symbol: "N/A".to_string(),
            profit: BigDecimal::default(),
            profit_percentage: BigDecimal::default(),
        }
    }
}
