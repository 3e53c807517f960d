// Product scraper implementations
pub mod firecrawl;

pub use firecrawl::FirecrawlScraper;
