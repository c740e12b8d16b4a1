//! Quote operations.
//!
//! Each operation validates its input, resolves catalog references, and only
//! then enters the store's unit of work. Nothing inside the unit touches the
//! catalog, so a slow catalog read never holds a quote lock.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::aggregate::{NewLineItem, PlanChange, QuoteAggregate};
use super::catalog::PricingCatalog;
use super::models::{PricingPlan, Quote, QuoteLineItem, Service};
use super::requests::{
    CreateQuoteRequest, LineItemRequest, UpdateLineItemRequest, UpdateQuoteRequest,
};
use super::store::QuoteStore;
use super::validation::{self, QuoteDefaults};

/// Plans and services offered to the quote editor, inactive ones included
#[derive(Debug, Clone)]
pub struct QuoteOptions {
    pub plans: Vec<PricingPlan>,
    pub services: Vec<Service>,
}

/// Quote operations over a store and the catalog
#[derive(Clone)]
pub struct QuoteService {
    store: Arc<dyn QuoteStore>,
    catalog: PricingCatalog,
    defaults: QuoteDefaults,
}

impl QuoteService {
    pub fn new(
        store: Arc<dyn QuoteStore>,
        catalog: PricingCatalog,
        defaults: QuoteDefaults,
    ) -> Self {
        Self {
            store,
            catalog,
            defaults,
        }
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    /// Create a quote with its requested services.
    ///
    /// Validation, plan and service resolution all finish before anything is
    /// written; one bad service rejects the whole quote.
    pub async fn create_quote(&self, req: CreateQuoteRequest) -> Result<QuoteAggregate> {
        let draft = validation::quote_draft(req, &self.defaults)?;
        let mut quote = draft.quote;

        if let Some(plan_id) = draft.plan_id {
            let plan = self.catalog.require_active_plan(plan_id).await?;
            apply_plan(&mut quote, plan);
        }

        let mut items = Vec::with_capacity(draft.services.len());
        for requested in &draft.services {
            items.push(self.new_line_item(requested).await?);
        }

        let aggregate = QuoteAggregate::create(quote, items, draft.covered_area)?;
        self.store.insert(&aggregate).await?;

        log_totals("Quote created", aggregate.quote());
        Ok(aggregate)
    }

    pub async fn get_quote(&self, id: Uuid) -> Result<QuoteAggregate> {
        self.store
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quote {}", id)))
    }

    /// Quote headers, newest first.
    pub async fn list_quotes(&self) -> Result<Vec<Quote>> {
        self.store.list().await
    }

    /// Apply a partial update. Pricing inputs trigger a full recomputation;
    /// label-only edits leave every figure as it was.
    pub async fn update_quote_fields(
        &self,
        id: Uuid,
        req: UpdateQuoteRequest,
    ) -> Result<QuoteAggregate> {
        let (mut changes, plan_id) = validation::quote_changes(req)?;

        changes.plan = match plan_id {
            Some(Some(plan_id)) => Some(PlanChange::Select(
                self.catalog.require_active_plan(plan_id).await?,
            )),
            Some(None) => Some(PlanChange::Clear),
            None => None,
        };

        let aggregate = self
            .store
            .update(
                id,
                Box::new(move |aggregate| {
                    aggregate.apply_changes(changes)?;
                    Ok(())
                }),
            )
            .await?;

        log_totals("Quote updated", aggregate.quote());
        Ok(aggregate)
    }

    /// Attach an active service. Returns the quote and the new item's id.
    pub async fn add_line_item(
        &self,
        quote_id: Uuid,
        req: LineItemRequest,
    ) -> Result<(QuoteAggregate, Uuid)> {
        if let Some(price) = req.unit_price {
            validation::unit_price("unitPrice", price)?;
        }
        let item = self.new_line_item(&req).await?;
        let item_id = item.id;

        let aggregate = self
            .store
            .update(
                quote_id,
                Box::new(move |aggregate| {
                    aggregate.add_line_item(item)?;
                    Ok(())
                }),
            )
            .await?;

        info!(%quote_id, %item_id, service_id = %req.service_id, "Line item added");
        log_totals("Quote repriced", aggregate.quote());
        Ok((aggregate, item_id))
    }

    /// Edit quantity or unit price of an item. The service is not re-checked
    /// against the catalog.
    pub async fn update_line_item(
        &self,
        quote_id: Uuid,
        item_id: Uuid,
        req: UpdateLineItemRequest,
    ) -> Result<(QuoteAggregate, QuoteLineItem)> {
        let quantity = req
            .quantity
            .map(|q| validation::quantity("quantity", Some(q)))
            .transpose()?;
        let unit_price = req
            .unit_price
            .map(|p| validation::unit_price("unitPrice", p))
            .transpose()?;

        let aggregate = self
            .store
            .update(
                quote_id,
                Box::new(move |aggregate| {
                    aggregate.update_line_item(item_id, quantity, unit_price)?;
                    Ok(())
                }),
            )
            .await?;

        let item = aggregate
            .line_item(item_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("Line item {} vanished", item_id)))?;

        info!(%quote_id, %item_id, line_total = %item.line_total, "Line item updated");
        log_totals("Quote repriced", aggregate.quote());
        Ok((aggregate, item))
    }

    pub async fn remove_line_item(&self, quote_id: Uuid, item_id: Uuid) -> Result<QuoteAggregate> {
        let aggregate = self
            .store
            .update(
                quote_id,
                Box::new(move |aggregate| {
                    aggregate.remove_line_item(item_id)?;
                    Ok(())
                }),
            )
            .await?;

        info!(%quote_id, %item_id, "Line item removed");
        log_totals("Quote repriced", aggregate.quote());
        Ok(aggregate)
    }

    pub async fn list_active_plans(&self) -> Result<Vec<PricingPlan>> {
        self.catalog.list_active_plans().await
    }

    pub async fn list_active_services(&self) -> Result<Vec<Service>> {
        self.catalog.list_active_services().await
    }

    pub async fn quote_options(&self) -> Result<QuoteOptions> {
        let plans = self.catalog.all_plans().await?;
        let services = self.catalog.all_services().await?;
        Ok(QuoteOptions {
            plans: plans.as_ref().clone(),
            services: services.as_ref().clone(),
        })
    }

    /// Resolve a requested service into a line item ready to attach.
    async fn new_line_item(&self, req: &LineItemRequest) -> Result<NewLineItem> {
        let service = self.catalog.require_active_service(req.service_id).await?;
        Ok(NewLineItem {
            id: Uuid::new_v4(),
            service_id: service.id,
            service_name: service.name,
            pricing_mode: service.pricing_mode,
            quantity: validation::quantity("quantity", req.quantity)?,
            unit_price: req.unit_price.unwrap_or(service.price),
        })
    }
}

/// Copy a plan's rate, currency and snapshot fields onto a new quote.
fn apply_plan(quote: &mut Quote, plan: PricingPlan) {
    quote.pricing_plan_id = Some(plan.id);
    quote.rate_per_area = plan.rate_per_area;
    quote.currency = plan.currency;
    quote.plan_name = Some(plan.name);
    quote.plan_min_days = plan.min_days;
    quote.plan_max_days = plan.max_days;
}

fn log_totals(event: &str, quote: &Quote) {
    info!(
        quote_id = %quote.id,
        covered_area = %quote.covered_area,
        base_cost = %quote.base_cost,
        extras_cost = %quote.extras_cost,
        total_cost = %quote.total_cost,
        currency = %quote.currency,
        "{}",
        event
    );
}
