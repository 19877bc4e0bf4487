use bigdecimal::BigDecimal;
use serde::Serialize;

// Snapshot of the aggregate numbers for one holding, derived from its full
// transaction/dividend/sell history plus the current quote.
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentMetrics {
    pub avg_buy_price: BigDecimal,
    pub total_invested: BigDecimal,
    pub total_quantity_bought: BigDecimal,
    pub shares: BigDecimal,
    pub current_value: BigDecimal,
    pub total_dividends: BigDecimal,
    pub realized_gain_loss: BigDecimal,
    pub unrealized_gain_loss: BigDecimal,
    pub total_profit_loss: BigDecimal,
    pub profit_loss_percentage: BigDecimal,
    pub return_on_investment: BigDecimal,
}
