pub mod notifier;
pub mod scraper;

pub use notifier::{NotificationResult, Notifier, PriceDropAlert};
pub use scraper::{is_likely_product_page, ProductScraper, ScrapedPrice, ScrapedProduct};
