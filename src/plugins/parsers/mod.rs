pub mod price;

pub use price::{ParsedPrice, PriceParser};
