mod dashboard;
mod dividend;
mod investment;
mod metrics;
mod sell_gain_loss;
mod series;
mod transaction;

pub use dashboard::{BestInvestment, DashboardSummary};
pub use dividend::{CreateDividend, Dividend};
pub use investment::{CreateInvestment, Currency, Investment, InvestmentType};
pub use metrics::InvestmentMetrics;
pub use sell_gain_loss::SellGainLoss;
pub use series::{EquityPoint, PortfolioChart, PortfolioPoint};
pub use transaction::{CreateTransaction, Side, Transaction};
