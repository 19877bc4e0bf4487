pub(crate) mod dividend_queries;
pub(crate) mod investment_queries;
pub(crate) mod sell_gain_loss_queries;
pub(crate) mod transaction_queries;
