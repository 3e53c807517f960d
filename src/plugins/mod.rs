pub mod notifiers;
pub mod parsers;
pub mod scrapers;
pub mod traits;

pub use notifiers::build_notifier;
pub use scrapers::FirecrawlScraper;
pub use traits::{Notifier, ProductScraper};
