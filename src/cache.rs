//! In-memory caching using moka
//!
//! Caches the pricing catalog listings. Plans and services change rarely and
//! only through the admin endpoints, which invalidate the affected listing.

use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::pricing::catalog::PricingCatalog;
use crate::pricing::models::{PricingPlan, Service};

/// Key of the full (active and inactive) listing in each cache.
pub const CATALOG_KEY: &str = "catalog:all";

/// Application cache holding catalog listings
#[derive(Clone)]
pub struct AppCache {
    /// Every pricing plan, active first
    pub plans: Cache<String, Arc<Vec<PricingPlan>>>,
    /// Every service, by display order
    pub services: Cache<String, Arc<Vec<Service>>>,
}

impl AppCache {
    /// Create a new cache instance with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            plans: Cache::builder()
                .max_capacity(4)
                .time_to_live(ttl)
                .build(),

            services: Cache::builder()
                .max_capacity(4)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            plans_cached: self.plans.contains_key(CATALOG_KEY),
            services_cached: self.services.contains_key(CATALOG_KEY),
        }
    }

    /// Invalidate all caches
    pub fn invalidate_all(&self) {
        self.plans.invalidate_all();
        self.services.invalidate_all();
        info!("All caches invalidated");
    }

    pub async fn invalidate_plans(&self) {
        self.plans.invalidate(CATALOG_KEY).await;
        info!("Pricing plan cache invalidated");
    }

    pub async fn invalidate_services(&self) {
        self.services.invalidate(CATALOG_KEY).await;
        info!("Service cache invalidated");
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub plans_cached: bool,
    pub services_cached: bool,
}

/// Start background cache warmer
///
/// Warms the catalog on startup and refreshes it once per TTL.
pub async fn start_cache_warmer(catalog: PricingCatalog, every: Duration) {
    warm_cache(&catalog).await;

    let mut interval = interval(every);
    // the first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        catalog.cache().invalidate_all();
        warm_cache(&catalog).await;
    }
}

/// Load both catalog listings into the cache
async fn warm_cache(catalog: &PricingCatalog) {
    info!("Starting cache warm-up...");

    if let Err(e) = catalog.all_plans().await {
        warn!("Failed to warm pricing plan cache: {}", e);
    }
    if let Err(e) = catalog.all_services().await {
        warn!("Failed to warm service cache: {}", e);
    }

    info!("Cache warm-up complete. Stats: {:?}", catalog.cache().stats());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_invalidate_plans_drops_listing() {
        let cache = AppCache::default();
        let plan = PricingPlan {
            id: Uuid::new_v4(),
            name: "Basic".to_string(),
            rate_per_area: dec!(300),
            currency: "PEN".to_string(),
            min_days: None,
            max_days: None,
            is_active: true,
            created_at: Utc::now(),
        };
        cache
            .plans
            .insert(CATALOG_KEY.to_string(), Arc::new(vec![plan]))
            .await;
        assert!(cache.stats().plans_cached);

        cache.invalidate_plans().await;
        assert!(cache.plans.get(CATALOG_KEY).await.is_none());
        assert!(!cache.stats().plans_cached);
    }
}
