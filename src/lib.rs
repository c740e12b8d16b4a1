//! Quote pricing service for an architecture firm.

pub mod cache;
pub mod config;
pub mod error;
pub mod pricing;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use cache::AppCache;
use config::Config;
use pricing::validation::QuoteDefaults;
use pricing::{
    CatalogAdmin, CatalogRepository, MemoryCatalog, MemoryQuoteStore, PgCatalog, PgQuoteStore,
    PricingCatalog, QuoteService, QuoteStore,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub quotes: QuoteService,
    pub admin: CatalogAdmin,
    pub default_currency: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn QuoteStore>,
        catalog: Arc<dyn CatalogRepository>,
        config: &Config,
    ) -> Self {
        let cache = AppCache::new(config.catalog_cache_ttl);
        let defaults = QuoteDefaults {
            currency: config.default_currency.clone(),
            uncovered_percent: config.default_uncovered_percent,
        };

        Self {
            quotes: QuoteService::new(
                store,
                PricingCatalog::new(catalog.clone(), cache.clone()),
                defaults,
            ),
            admin: CatalogAdmin::new(catalog, cache),
            default_currency: config.default_currency.clone(),
        }
    }

    /// State backed by process memory; nothing survives a restart.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(
            Arc::new(MemoryQuoteStore::new()),
            Arc::new(MemoryCatalog::new()),
            config,
        )
    }

    pub fn postgres(pool: PgPool, config: &Config) -> Self {
        Self::new(
            Arc::new(PgQuoteStore::new(pool.clone())),
            Arc::new(PgCatalog::new(pool)),
            config,
        )
    }
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", pricing::router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
