use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod price_history;
pub mod product;

pub use price_history::*;
pub use product::*;

/// Direction of a price move between two observations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriceChange {
    Decreased,
    Increased,
    Unchanged,
}

impl PriceChange {
    pub fn between(old: Decimal, new: Decimal) -> Self {
        if new < old {
            PriceChange::Decreased
        } else if new > old {
            PriceChange::Increased
        } else {
            PriceChange::Unchanged
        }
    }

    pub fn is_change(self) -> bool {
        self != PriceChange::Unchanged
    }
}

/// Currency used when the scrape does not report one.
pub const DEFAULT_CURRENCY: &str = "USD";

// Helper function to generate UUIDs in the format expected by the database
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub(crate) fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, sqlx::Error> {
    raw.parse::<Decimal>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
