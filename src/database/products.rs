use chrono::Utc;
use sqlx::{Executor, Sqlite};

use crate::database::Database;
use crate::models::{generate_id, NewProduct, PriceRefresh, Product};
use crate::Result;

const PRODUCT_COLUMNS: &str =
    "id, user_id, url, name, current_price, currency, image_url, created_at, updated_at";

pub async fn find_by_owner_url<'e, E>(executor: E, user_id: &str, url: &str) -> Result<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = ? AND url = ?");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(user_id)
        .bind(url)
        .fetch_optional(executor)
        .await?;
    Ok(product)
}

/// Insert-or-update keyed on `(user_id, url)`. The unique index decides which
/// branch runs, so concurrent adds of the same URL cannot duplicate the row.
pub async fn upsert<'e, E>(executor: E, new_product: &NewProduct) -> Result<Product>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO products (id, user_id, url, name, current_price, currency, image_url, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id, url) DO UPDATE SET
             name = excluded.name,
             current_price = excluded.current_price,
             currency = excluded.currency,
             image_url = excluded.image_url,
             updated_at = excluded.updated_at
         RETURNING {PRODUCT_COLUMNS}"
    );

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(generate_id())
        .bind(&new_product.user_id)
        .bind(&new_product.url)
        .bind(&new_product.name)
        .bind(new_product.current_price.to_string())
        .bind(&new_product.currency)
        .bind(&new_product.image_url)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await?;
    Ok(product)
}

pub async fn apply_refresh<'e, E>(executor: E, product_id: &str, refresh: &PriceRefresh) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE products
         SET current_price = ?, currency = ?, name = ?, image_url = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(refresh.current_price.to_string())
    .bind(&refresh.currency)
    .bind(&refresh.name)
    .bind(&refresh.image_url)
    .bind(Utc::now())
    .bind(product_id)
    .execute(executor)
    .await?;
    Ok(())
}

impl Database {
    /// Every tracked product across all users, oldest first.
    pub async fn all_products(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at ASC");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool())
            .await?;
        Ok(products)
    }

    pub async fn products_for_user(&self, user_id: &str) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = ? ORDER BY created_at DESC"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        Ok(products)
    }

    pub async fn find_product(&self, user_id: &str, url: &str) -> Result<Option<Product>> {
        find_by_owner_url(self.pool(), user_id, url).await
    }

    /// Deletes only when `user_id` owns the product. Returns the number of
    /// rows removed (0 or 1).
    pub async fn delete_product(&self, product_id: &str, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM products WHERE id = ? AND user_id = ?")
            .bind(product_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_products(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
