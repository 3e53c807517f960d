use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::models::{decode_decimal, generate_id};

/// One recorded price point for a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceObservation {
    pub id: String,
    pub product_id: String,
    pub price: Decimal,
    pub currency: String,
    pub checked_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(product_id: impl Into<String>, price: Decimal, currency: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            product_id: product_id.into(),
            price,
            currency: currency.into(),
            checked_at: Utc::now(),
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for PriceObservation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_price: String = row.try_get("price")?;
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            price: decode_decimal("price", &raw_price)?,
            currency: row.try_get("currency")?,
            checked_at: row.try_get("checked_at")?,
        })
    }
}
