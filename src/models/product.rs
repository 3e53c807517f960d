use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::models::{decode_decimal, PriceChange};
use crate::plugins::traits::ScrapedProduct;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub name: String,
    pub current_price: Decimal,
    pub currency: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Prices live in TEXT columns so SQLite never rounds them through a float.
impl<'r> FromRow<'r, SqliteRow> for Product {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_price: String = row.try_get("current_price")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            url: row.try_get("url")?,
            name: row.try_get("name")?,
            current_price: decode_decimal("current_price", &raw_price)?,
            currency: row.try_get("currency")?,
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Insert-or-update payload keyed on `(user_id, url)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProduct {
    pub user_id: String,
    pub url: String,
    pub name: String,
    pub current_price: Decimal,
    pub currency: String,
    pub image_url: Option<String>,
}

/// Fields rewritten on a product by a scheduled re-scrape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRefresh {
    pub name: String,
    pub current_price: Decimal,
    pub currency: String,
    pub image_url: Option<String>,
}

impl Product {
    pub fn price_change(&self, new_price: Decimal) -> PriceChange {
        PriceChange::between(self.current_price, new_price)
    }

    /// Builds the update for a fresh scrape, keeping stored values for any
    /// field the scrape left out.
    pub fn refresh_from(&self, scraped: &ScrapedProduct, new_price: Decimal) -> PriceRefresh {
        PriceRefresh {
            name: scraped.name.clone().unwrap_or_else(|| self.name.clone()),
            current_price: new_price,
            currency: scraped.currency.clone().unwrap_or_else(|| self.currency.clone()),
            image_url: scraped.image_url.clone().or_else(|| self.image_url.clone()),
        }
    }
}
