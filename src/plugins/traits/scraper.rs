use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Price as reported by the extraction step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ScrapedPrice {
    Amount(Decimal),
    /// Something was extracted but it is not a number.
    Unparseable(String),
}

/// Structured product fields pulled from a page. Every field is optional
/// because extraction is best-effort; callers decide which ones they require.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScrapedProduct {
    pub name: Option<String>,
    pub price: Option<ScrapedPrice>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
}

impl ScrapedProduct {
    pub fn amount(&self) -> Option<Decimal> {
        match self.price {
            Some(ScrapedPrice::Amount(amount)) => Some(amount),
            _ => None,
        }
    }
}

/// Fetches a product page and extracts its fields.
#[async_trait]
pub trait ProductScraper: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the page was fetched but nothing usable came back.
    async fn scrape(&self, url: &str) -> Result<Option<ScrapedProduct>>;
}

/// Search and listing pages carry many products; only single-product pages
/// can be tracked.
pub fn is_likely_product_page(url: &str) -> bool {
    !(url.contains("/s?") || url.contains("/search") || url.contains("query="))
}
