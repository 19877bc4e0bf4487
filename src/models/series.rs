use bigdecimal::BigDecimal;
use serde::Serialize;

use super::Currency;

// One month of a single holding's equity curve. `month` is "MM/YYYY".
#[derive(Debug, Clone, Serialize)]
pub struct EquityPoint {
    pub month: String,
    pub value: BigDecimal,
    pub invested: BigDecimal,
    pub dividends: BigDecimal,
}

// One month of the portfolio-wide curve, already converted into the
// requested display currency.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioPoint {
    pub month: String,
    pub value: BigDecimal,
    pub invested: BigDecimal,
}

#[derive(Debug, Serialize)]
pub struct PortfolioChart {
    pub currency: Currency,
    pub values: Vec<PortfolioPoint>,
}
