pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod models;
pub mod plugins;
pub mod price_check;
pub mod product_manager;
pub mod scheduler;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use price_check::{CheckSummary, PriceCheckReport, PriceChecker};
pub use product_manager::{AddProductOutcome, AddProductRequest, ProductManager};
pub use scheduler::PriceCheckScheduler;
pub use utils::error::{AppError, Result};
