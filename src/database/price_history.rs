use sqlx::{Executor, Sqlite};

use crate::database::Database;
use crate::models::PriceObservation;
use crate::Result;

pub async fn insert<'e, E>(executor: E, observation: &PriceObservation) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO price_history (id, product_id, price, currency, checked_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&observation.id)
    .bind(&observation.product_id)
    .bind(observation.price.to_string())
    .bind(&observation.currency)
    .bind(observation.checked_at)
    .execute(executor)
    .await?;
    Ok(())
}

impl Database {
    /// Observations for a product the user owns, oldest first. A product owned
    /// by someone else yields an empty list.
    pub async fn price_history(&self, product_id: &str, user_id: &str) -> Result<Vec<PriceObservation>> {
        let history = sqlx::query_as::<_, PriceObservation>(
            "SELECT h.id, h.product_id, h.price, h.currency, h.checked_at
             FROM price_history h
             JOIN products p ON p.id = h.product_id
             WHERE h.product_id = ? AND p.user_id = ?
             ORDER BY h.checked_at ASC, h.rowid ASC",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(history)
    }

    pub async fn count_observations(&self, product_id: &str) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM price_history WHERE product_id = ?")
                .bind(product_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }
}
