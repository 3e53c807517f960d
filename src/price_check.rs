use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::auth::UserDirectory;
use crate::cache::ListingCache;
use crate::database::{price_history, products, Database};
use crate::models::{PriceChange, PriceObservation, Product};
use crate::plugins::traits::{Notifier, PriceDropAlert, ProductScraper};
use crate::Result;

/// Counters for one batch run. `total == updated + failed` always holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    pub price_changes: usize,
    pub alerts_sent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCheckReport {
    pub message: String,
    pub results: CheckSummary,
}

enum ProductOutcome {
    Skipped,
    Unchanged,
    Changed { alert_sent: bool },
}

/// Re-scrapes every tracked product and alerts owners about drops.
///
/// At most one pass runs at a time, whichever trigger starts it (HTTP, CLI
/// or the in-process scheduler).
pub struct PriceChecker {
    db: Database,
    scraper: Arc<dyn ProductScraper>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    listings: ListingCache,
    run_lock: Mutex<()>,
}

impl PriceChecker {
    pub fn new(
        db: Database,
        scraper: Arc<dyn ProductScraper>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        listings: ListingCache,
    ) -> Self {
        Self {
            db,
            scraper,
            users,
            notifier,
            listings,
            run_lock: Mutex::new(()),
        }
    }

    /// Runs one sequential pass over all products, waiting for any pass
    /// already in progress to finish first. Only a failure to load the
    /// product list fails the run; per-product errors are counted.
    pub async fn run(&self) -> Result<PriceCheckReport> {
        let _guard = self.run_lock.lock().await;
        self.run_exclusive().await
    }

    /// Like [`run`](Self::run), but returns `None` instead of waiting when a
    /// pass is already in progress.
    pub async fn try_run(&self) -> Option<Result<PriceCheckReport>> {
        let _guard = self.run_lock.try_lock().ok()?;
        Some(self.run_exclusive().await)
    }

    async fn run_exclusive(&self) -> Result<PriceCheckReport> {
        let all = self.db.all_products().await?;
        let mut summary = CheckSummary {
            total: all.len(),
            ..Default::default()
        };

        if all.is_empty() {
            info!("No products to check");
            return Ok(PriceCheckReport {
                message: "No products to check".to_string(),
                results: summary,
            });
        }

        info!(total = summary.total, "Starting price check");

        for product in &all {
            match self.check_product(product).await {
                Ok(ProductOutcome::Skipped) => summary.failed += 1,
                Ok(ProductOutcome::Unchanged) => summary.updated += 1,
                Ok(ProductOutcome::Changed { alert_sent }) => {
                    summary.updated += 1;
                    summary.price_changes += 1;
                    if alert_sent {
                        summary.alerts_sent += 1;
                    }
                }
                Err(e) => {
                    error!(product_id = %product.id, error = %e, "Price check failed for product");
                    summary.failed += 1;
                }
            }
        }

        if summary.updated > 0 {
            self.listings.invalidate_all().await;
        }

        info!(
            total = summary.total,
            updated = summary.updated,
            failed = summary.failed,
            price_changes = summary.price_changes,
            alerts_sent = summary.alerts_sent,
            "Price check completed"
        );

        Ok(PriceCheckReport {
            message: "Price check completed".to_string(),
            results: summary,
        })
    }

    async fn check_product(&self, product: &Product) -> Result<ProductOutcome> {
        let scraped = match self.scraper.scrape(&product.url).await {
            Ok(Some(scraped)) => scraped,
            Ok(None) => {
                warn!(product_id = %product.id, "Nothing extracted; skipping");
                return Ok(ProductOutcome::Skipped);
            }
            Err(e) => {
                warn!(product_id = %product.id, error = %e, "Scrape failed; skipping");
                return Ok(ProductOutcome::Skipped);
            }
        };

        let new_price = match scraped.amount() {
            Some(price) if !price.is_sign_negative() && !price.is_zero() => price,
            _ => {
                warn!(product_id = %product.id, price = ?scraped.price, "No usable price; skipping");
                return Ok(ProductOutcome::Skipped);
            }
        };

        let refresh = product.refresh_from(&scraped, new_price);
        let change = product.price_change(new_price);

        let mut tx = self.db.begin().await?;
        products::apply_refresh(&mut *tx, &product.id, &refresh).await?;
        if change.is_change() {
            let observation = PriceObservation::new(&product.id, new_price, &refresh.currency);
            price_history::insert(&mut *tx, &observation).await?;
        }
        tx.commit().await?;

        if !change.is_change() {
            debug!(product_id = %product.id, "Price unchanged");
            return Ok(ProductOutcome::Unchanged);
        }

        info!(
            product_id = %product.id,
            old_price = %product.current_price,
            new_price = %new_price,
            "Price changed"
        );

        let alert_sent = if change == PriceChange::Decreased {
            let alert = PriceDropAlert::for_product(product, &refresh.currency, product.current_price, new_price);
            self.notify_owner(product, &alert).await
        } else {
            false
        };

        Ok(ProductOutcome::Changed { alert_sent })
    }

    /// Delivery problems are logged and never fail the product.
    async fn notify_owner(&self, product: &Product, alert: &PriceDropAlert) -> bool {
        let email = match self.users.user_email(&product.user_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                warn!(user_id = %product.user_id, "Owner has no email; alert not sent");
                return false;
            }
            Err(e) => {
                warn!(user_id = %product.user_id, error = %e, "Owner lookup failed; alert not sent");
                return false;
            }
        };

        match self.notifier.send_price_drop(&email, alert).await {
            Ok(result) if result.success => {
                info!(product_id = %product.id, notifier = self.notifier.name(), "Price drop alert sent");
                true
            }
            Ok(result) => {
                warn!(product_id = %product.id, error = ?result.error, "Price drop alert rejected");
                false
            }
            Err(e) => {
                warn!(product_id = %product.id, error = %e, "Price drop alert failed");
                false
            }
        }
    }
}
