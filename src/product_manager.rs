use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::cache::ListingCache;
use crate::database::{price_history, products, Database};
use crate::models::{NewProduct, PriceObservation, Product, DEFAULT_CURRENCY};
use crate::plugins::traits::{is_likely_product_page, ProductScraper, ScrapedPrice};
use crate::{AppError, Result};

pub const EXTRACTION_FAILED: &str = "Could not extract product information from this URL";
pub const INVALID_PRICE: &str = "Invalid price detected";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddProductRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "URL is required"),
        custom(function = "validate_product_url")
    )]
    pub url: String,
}

fn validate_product_url(raw: &str) -> std::result::Result<(), ValidationError> {
    let parsed = url::Url::parse(raw).map_err(|_| {
        let mut err = ValidationError::new("invalid_url");
        err.message = Some("Please enter a valid product URL".into());
        err
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        let mut err = ValidationError::new("unsupported_scheme");
        err.message = Some("Only http and https URLs can be tracked".into());
        return Err(err);
    }

    if !is_likely_product_page(raw) {
        let mut err = ValidationError::new("listing_page");
        err.message =
            Some("Please use a single product page URL, not a search or listing page".into());
        return Err(err);
    }

    Ok(())
}

fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddProductOutcome {
    pub product: Product,
    pub created: bool,
}

impl AddProductOutcome {
    pub fn message(&self) -> &'static str {
        if self.created {
            "Product added successfully!"
        } else {
            "Product updated with latest price!"
        }
    }
}

/// Owner-facing product operations: add/refresh, list, delete, history.
pub struct ProductManager {
    db: Database,
    scraper: Arc<dyn ProductScraper>,
    listings: ListingCache,
}

impl ProductManager {
    pub fn new(db: Database, scraper: Arc<dyn ProductScraper>, listings: ListingCache) -> Self {
        Self {
            db,
            scraper,
            listings,
        }
    }

    pub async fn add_product(&self, user_id: &str, request: AddProductRequest) -> Result<AddProductOutcome> {
        let request = AddProductRequest {
            url: request.url.trim().to_string(),
        };
        request
            .validate()
            .map_err(|errors| AppError::Validation(first_message(&errors)))?;
        let url = request.url;

        let scraped = match self.scraper.scrape(&url).await {
            Ok(Some(scraped)) => scraped,
            Ok(None) => return Err(AppError::Extraction(EXTRACTION_FAILED.to_string())),
            Err(e) => {
                warn!(url = %url, scraper = self.scraper.name(), error = %e, "Scrape failed");
                return Err(AppError::Extraction(EXTRACTION_FAILED.to_string()));
            }
        };

        let name = match scraped.name.as_deref() {
            Some(name) => name.to_string(),
            None => return Err(AppError::Extraction(EXTRACTION_FAILED.to_string())),
        };
        let price = match &scraped.price {
            None => return Err(AppError::Extraction(EXTRACTION_FAILED.to_string())),
            Some(ScrapedPrice::Amount(amount)) if amount.is_zero() => {
                return Err(AppError::Extraction(EXTRACTION_FAILED.to_string()))
            }
            Some(ScrapedPrice::Amount(amount)) if amount.is_sign_negative() => {
                return Err(AppError::Extraction(INVALID_PRICE.to_string()))
            }
            Some(ScrapedPrice::Amount(amount)) => *amount,
            Some(ScrapedPrice::Unparseable(raw)) => {
                debug!(url = %url, raw = %raw, "Non-numeric price extracted");
                return Err(AppError::Extraction(INVALID_PRICE.to_string()));
            }
        };
        let currency = scraped
            .currency
            .clone()
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let mut tx = self.db.begin().await?;

        let previous_price: Option<Decimal> = products::find_by_owner_url(&mut *tx, user_id, &url)
            .await?
            .map(|existing| existing.current_price);

        let product = products::upsert(
            &mut *tx,
            &NewProduct {
                user_id: user_id.to_string(),
                url: url.clone(),
                name,
                current_price: price,
                currency: currency.clone(),
                image_url: scraped.image_url.clone(),
            },
        )
        .await?;

        let record_history = previous_price.map_or(true, |old| old != price);
        if record_history {
            price_history::insert(&mut *tx, &PriceObservation::new(&product.id, price, &currency)).await?;
        }

        tx.commit().await?;
        self.listings.invalidate(user_id).await;

        let created = previous_price.is_none();
        info!(
            product_id = %product.id,
            user_id = %user_id,
            created,
            price = %price,
            "Product saved"
        );

        Ok(AddProductOutcome { product, created })
    }

    pub async fn list_products(&self, user_id: &str) -> Result<Vec<Product>> {
        if let Some(cached) = self.listings.get(user_id).await {
            return Ok(cached);
        }

        let products = self.db.products_for_user(user_id).await?;
        self.listings.put(user_id, products.clone()).await;
        Ok(products)
    }

    /// Returns `false` when no product with that id belongs to the user.
    pub async fn delete_product(&self, user_id: &str, product_id: &str) -> Result<bool> {
        let removed = self.db.delete_product(product_id, user_id).await? > 0;
        if removed {
            self.listings.invalidate(user_id).await;
            info!(product_id = %product_id, user_id = %user_id, "Product deleted");
        }
        Ok(removed)
    }

    pub async fn price_history(&self, user_id: &str, product_id: &str) -> Result<Vec<PriceObservation>> {
        self.db.price_history(product_id, user_id).await
    }
}
