use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::plugins::parsers::PriceParser;
use crate::plugins::traits::{ProductScraper, ScrapedPrice, ScrapedProduct};
use crate::{AppError, Result};

const EXTRACTION_PROMPT: &str =
    "Extract ONE product's name, current price, currency code, and main image.";

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    json: Option<Value>,
    // Older API versions return the extraction under `extract`.
    extract: Option<Value>,
}

/// Client for a Firecrawl-compatible scrape+extraction API.
pub struct FirecrawlScraper {
    client: Client,
    api_key: String,
    base_url: String,
    price_parser: PriceParser,
}

impl FirecrawlScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            price_parser: PriceParser::new(),
        })
    }

    fn request_body(url: &str) -> Value {
        json!({
            "url": url,
            "formats": [{
                "type": "json",
                "prompt": EXTRACTION_PROMPT,
                "schema": {
                    "type": "object",
                    "properties": {
                        "productName": { "type": "string" },
                        "currentPrice": { "type": "number" },
                        "currencyCode": { "type": "string" },
                        "productImageUrl": { "type": "string" }
                    },
                    "required": ["productName", "currentPrice"]
                }
            }]
        })
    }

    fn to_scraped_product(&self, extracted: &Value) -> ScrapedProduct {
        let text = |key: &str| {
            extracted
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut currency = text("currencyCode").map(|c| c.to_uppercase());
        let price = match extracted.get("currentPrice") {
            Some(Value::Number(number)) => Some(decimal_from_number(number)),
            Some(Value::String(raw)) => Some(match self.price_parser.parse(raw) {
                Some(parsed) => {
                    if currency.is_none() {
                        currency = parsed.currency;
                    }
                    ScrapedPrice::Amount(parsed.amount)
                }
                None => ScrapedPrice::Unparseable(raw.clone()),
            }),
            Some(Value::Null) | None => None,
            Some(other) => Some(ScrapedPrice::Unparseable(other.to_string())),
        };

        ScrapedProduct {
            name: text("productName"),
            price,
            currency,
            image_url: text("productImageUrl"),
        }
    }
}

fn decimal_from_number(number: &serde_json::Number) -> ScrapedPrice {
    let raw = number.to_string();
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map(ScrapedPrice::Amount)
        .unwrap_or(ScrapedPrice::Unparseable(raw))
}

#[async_trait]
impl ProductScraper for FirecrawlScraper {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn scrape(&self, url: &str) -> Result<Option<ScrapedProduct>> {
        let endpoint = format!("{}/v2/scrape", self.base_url);
        debug!(url = %url, "Requesting product extraction");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&Self::request_body(url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, "Scrape API rejected request");
            return Err(AppError::Extraction(format!(
                "scrape API returned {}: {}",
                status, body
            )));
        }

        let payload: ScrapeResponse = response.json().await?;
        if !payload.success {
            warn!(url = %url, error = ?payload.error, "Scrape API reported failure");
            return Ok(None);
        }

        let extracted = payload.data.and_then(|data| data.json.or(data.extract));
        match extracted {
            Some(value) if value.is_object() => Ok(Some(self.to_scraped_product(&value))),
            _ => {
                debug!(url = %url, "Scrape returned no structured data");
                Ok(None)
            }
        }
    }
}
