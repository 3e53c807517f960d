use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::models::Product;

/// Per-user product listings kept in memory between requests.
#[derive(Debug, Clone, Default)]
pub struct ListingCache {
    entries: Arc<RwLock<HashMap<String, Vec<Product>>>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str) -> Option<Vec<Product>> {
        self.entries.read().await.get(user_id).cloned()
    }

    pub async fn put(&self, user_id: &str, products: Vec<Product>) {
        self.entries.write().await.insert(user_id.to_string(), products);
    }

    pub async fn invalidate(&self, user_id: &str) {
        if self.entries.write().await.remove(user_id).is_some() {
            debug!(user_id = %user_id, "Invalidated product listing");
        }
    }

    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        debug!(count = entries.len(), "Invalidating all product listings");
        entries.clear();
    }
}
