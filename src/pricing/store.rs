//! Quote persistence.
//!
//! `QuoteStore::update` is the unit of work every mutation goes through: the
//! quote is loaded under a per-quote lock, the mutation runs against an owned
//! copy, and the result is written back only if the mutation succeeded.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::aggregate::QuoteAggregate;
use super::models::Quote;
use super::queries;

/// A synchronous change applied inside the unit of work. Returning an error
/// discards the change.
pub type QuoteMutation = Box<dyn FnOnce(&mut QuoteAggregate) -> Result<()> + Send>;

#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Persist a new quote together with its line items.
    async fn insert(&self, aggregate: &QuoteAggregate) -> Result<()>;

    async fn fetch(&self, id: Uuid) -> Result<Option<QuoteAggregate>>;

    /// Quote headers, newest first.
    async fn list(&self) -> Result<Vec<Quote>>;

    /// Run `mutation` against quote `id` and persist the outcome atomically.
    /// Calls for the same quote are serialized.
    async fn update(&self, id: Uuid, mutation: QuoteMutation) -> Result<QuoteAggregate>;
}

fn quote_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Quote {}", id))
}

/// Quotes held in process memory, one lock per quote
#[derive(Default)]
pub struct MemoryQuoteStore {
    quotes: RwLock<HashMap<Uuid, Arc<Mutex<QuoteAggregate>>>>,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: Uuid) -> Option<Arc<Mutex<QuoteAggregate>>> {
        self.quotes.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn insert(&self, aggregate: &QuoteAggregate) -> Result<()> {
        let mut quotes = self.quotes.write().await;
        if quotes.contains_key(&aggregate.id()) {
            return Err(AppError::Internal(format!(
                "Quote {} already exists",
                aggregate.id()
            )));
        }
        quotes.insert(aggregate.id(), Arc::new(Mutex::new(aggregate.clone())));
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<QuoteAggregate>> {
        match self.slot(id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Quote>> {
        let slots: Vec<_> = self.quotes.read().await.values().cloned().collect();

        let mut quotes = Vec::with_capacity(slots.len());
        for slot in slots {
            quotes.push(slot.lock().await.quote().clone());
        }
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(quotes)
    }

    async fn update(&self, id: Uuid, mutation: QuoteMutation) -> Result<QuoteAggregate> {
        let slot = self.slot(id).await.ok_or_else(|| quote_not_found(id))?;
        let mut current = slot.lock().await;

        let mut working = current.clone();
        mutation(&mut working)?;
        debug_assert!(working.is_consistent());

        *current = working.clone();
        Ok(working)
    }
}

/// Quotes stored in Postgres; the row lock serializes same-quote updates
#[derive(Clone)]
pub struct PgQuoteStore {
    pool: PgPool,
}

impl PgQuoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    async fn insert(&self, aggregate: &QuoteAggregate) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        queries::insert_quote(&mut *tx, aggregate.quote()).await?;
        for (position, item) in aggregate.line_items().iter().enumerate() {
            queries::upsert_line_item(&mut *tx, item, position as i32).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<QuoteAggregate>> {
        let Some(quote) = queries::get_quote(&self.pool, id).await? else {
            return Ok(None);
        };
        let items = queries::get_line_items(&self.pool, id).await?;
        Ok(Some(QuoteAggregate::from_parts(quote, items)))
    }

    async fn list(&self) -> Result<Vec<Quote>> {
        queries::list_quotes(&self.pool).await
    }

    async fn update(&self, id: Uuid, mutation: QuoteMutation) -> Result<QuoteAggregate> {
        // Dropping `tx` on any early return rolls the unit back.
        let mut tx = self.pool.begin().await?;

        let quote = queries::lock_quote(&mut *tx, id)
            .await?
            .ok_or_else(|| quote_not_found(id))?;
        let items = queries::get_line_items(&mut *tx, id).await?;

        let mut aggregate = QuoteAggregate::from_parts(quote, items);
        mutation(&mut aggregate)?;
        debug_assert!(aggregate.is_consistent());

        queries::update_quote(&mut *tx, aggregate.quote()).await?;
        let keep: Vec<Uuid> = aggregate.line_items().iter().map(|item| item.id).collect();
        queries::delete_line_items_except(&mut *tx, id, &keep).await?;
        for (position, item) in aggregate.line_items().iter().enumerate() {
            queries::upsert_line_item(&mut *tx, item, position as i32).await?;
        }

        tx.commit().await?;
        Ok(aggregate)
    }
}
