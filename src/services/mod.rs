pub mod dashboard_service;
pub mod dividend_service;
pub mod dividend_sync;
pub mod equity_series;
pub mod gateway;
pub mod investment_service;
pub mod metrics;
pub mod position;
pub mod rate_limiter;
pub mod transaction_service;
