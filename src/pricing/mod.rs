//! Quote pricing engine.
//!
//! Quotes for architectural projects: a covered-area base cost from a pricing
//! plan or manual rate, plus catalog services priced flat, per unit area, or
//! as a percentage of the base cost.

pub mod aggregate;
pub mod calculators;
pub mod catalog;
pub mod models;
pub mod queries;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;
pub mod store;
pub mod validation;

// Re-export commonly used items
pub use aggregate::QuoteAggregate;
pub use calculators::round_money;
pub use catalog::{CatalogAdmin, CatalogRepository, MemoryCatalog, PgCatalog, PricingCatalog};
pub use routes::router;
pub use services::QuoteService;
pub use store::{MemoryQuoteStore, PgQuoteStore, QuoteStore};
