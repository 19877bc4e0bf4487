use sqlx::PgPool;
use uuid::Uuid;

use crate::models::SellGainLoss;

pub async fn fetch_for_investment(
    pool: &PgPool,
    investment_id: Uuid,
) -> Result<Vec<SellGainLoss>, sqlx::Error> {
    sqlx::query_as::<_, SellGainLoss>(
        "SELECT id, investment_id, transaction_id, realized_profit_loss, created_at
         FROM sell_gain_loss
         WHERE investment_id = $1
         ORDER BY created_at ASC",
    )
    .bind(investment_id)
    .fetch_all(pool)
    .await
}
