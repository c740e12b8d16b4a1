//! Database queries for the pricing engine.
//!
//! Rows are fetched into private `*Row` structs and converted into the domain
//! models, so enum columns stored as text are parsed here and nowhere else.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::models::{PricingMode, PricingPlan, Quote, QuoteLineItem, QuoteStatus, Service};

#[derive(Debug, FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    rate_per_area: Decimal,
    currency: String,
    min_days: Option<i32>,
    max_days: Option<i32>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<PlanRow> for PricingPlan {
    fn from(row: PlanRow) -> Self {
        PricingPlan {
            id: row.id,
            name: row.name,
            rate_per_area: row.rate_per_area,
            currency: row.currency,
            min_days: row.min_days,
            max_days: row.max_days,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    pricing_mode: String,
    price: Decimal,
    currency: String,
    is_addon: bool,
    is_active: bool,
    display_order: i32,
}

impl TryFrom<ServiceRow> for Service {
    type Error = AppError;

    fn try_from(row: ServiceRow) -> Result<Self> {
        Ok(Service {
            id: row.id,
            name: row.name,
            description: row.description,
            pricing_mode: row.pricing_mode.parse().map_err(AppError::Internal)?,
            price: row.price,
            currency: row.currency,
            is_addon: row.is_addon,
            is_active: row.is_active,
            display_order: row.display_order,
        })
    }
}

#[derive(Debug, FromRow)]
struct QuoteRow {
    id: Uuid,
    full_name: String,
    phone: String,
    email: String,
    document_type: Option<String>,
    document_number: Option<String>,
    project_name: String,
    project_address: Option<String>,
    total_area: Decimal,
    uncovered_percent: Decimal,
    covered_area: Decimal,
    floor_count: i32,
    pricing_plan_id: Option<Uuid>,
    rate_per_area: Decimal,
    currency: String,
    plan_name: Option<String>,
    plan_min_days: Option<i32>,
    plan_max_days: Option<i32>,
    base_cost: Decimal,
    extras_cost: Decimal,
    total_cost: Decimal,
    status: String,
    notes: Option<String>,
    expires_at: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = AppError;

    fn try_from(row: QuoteRow) -> Result<Self> {
        Ok(Quote {
            id: row.id,
            full_name: row.full_name,
            phone: row.phone,
            email: row.email,
            document_type: row.document_type,
            document_number: row.document_number,
            project_name: row.project_name,
            project_address: row.project_address,
            total_area: row.total_area,
            uncovered_percent: row.uncovered_percent,
            covered_area: row.covered_area,
            floor_count: row.floor_count,
            pricing_plan_id: row.pricing_plan_id,
            rate_per_area: row.rate_per_area,
            currency: row.currency,
            plan_name: row.plan_name,
            plan_min_days: row.plan_min_days,
            plan_max_days: row.plan_max_days,
            base_cost: row.base_cost,
            extras_cost: row.extras_cost,
            total_cost: row.total_cost,
            status: row.status.parse::<QuoteStatus>().map_err(AppError::Internal)?,
            notes: row.notes,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: Uuid,
    quote_id: Uuid,
    service_id: Uuid,
    service_name: String,
    pricing_mode: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl TryFrom<LineItemRow> for QuoteLineItem {
    type Error = AppError;

    fn try_from(row: LineItemRow) -> Result<Self> {
        Ok(QuoteLineItem {
            id: row.id,
            quote_id: row.quote_id,
            service_id: row.service_id,
            service_name: row.service_name,
            pricing_mode: row.pricing_mode.parse::<PricingMode>().map_err(AppError::Internal)?,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        })
    }
}

// ==================== pricing plans ====================

/// Get a pricing plan by id, active or not
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<PricingPlan>> {
    let row = sqlx::query_as::<_, PlanRow>(
        r#"
        SELECT id, name, rate_per_area, currency, min_days, max_days, is_active, created_at
        FROM pricing_plans
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(PricingPlan::from))
}

/// List every pricing plan, active first
pub async fn list_plans(pool: &PgPool) -> Result<Vec<PricingPlan>> {
    let rows = sqlx::query_as::<_, PlanRow>(
        r#"
        SELECT id, name, rate_per_area, currency, min_days, max_days, is_active, created_at
        FROM pricing_plans
        ORDER BY is_active DESC, name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PricingPlan::from).collect())
}

pub async fn insert_plan(pool: &PgPool, plan: &PricingPlan) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pricing_plans
            (id, name, rate_per_area, currency, min_days, max_days, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(plan.id)
    .bind(&plan.name)
    .bind(plan.rate_per_area)
    .bind(&plan.currency)
    .bind(plan.min_days)
    .bind(plan.max_days)
    .bind(plan.is_active)
    .bind(plan.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite a plan's editable columns. Returns false if it does not exist.
pub async fn update_plan(pool: &PgPool, plan: &PricingPlan) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE pricing_plans
        SET name = $2, rate_per_area = $3, currency = $4,
            min_days = $5, max_days = $6, is_active = $7
        WHERE id = $1
        "#,
    )
    .bind(plan.id)
    .bind(&plan.name)
    .bind(plan.rate_per_area)
    .bind(&plan.currency)
    .bind(plan.min_days)
    .bind(plan.max_days)
    .bind(plan.is_active)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ==================== services ====================

/// Get a service by id, active or not
pub async fn get_service(pool: &PgPool, id: Uuid) -> Result<Option<Service>> {
    let row = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, name, description, pricing_mode, price, currency,
               is_addon, is_active, display_order
        FROM services
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Service::try_from).transpose()
}

/// List every service by display order
pub async fn list_services(pool: &PgPool) -> Result<Vec<Service>> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, name, description, pricing_mode, price, currency,
               is_addon, is_active, display_order
        FROM services
        ORDER BY display_order ASC, name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Service::try_from).collect()
}

pub async fn insert_service(pool: &PgPool, service: &Service) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO services
            (id, name, description, pricing_mode, price, currency,
             is_addon, is_active, display_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(service.id)
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.pricing_mode.as_str())
    .bind(service.price)
    .bind(&service.currency)
    .bind(service.is_addon)
    .bind(service.is_active)
    .bind(service.display_order)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite a service's editable columns. Returns false if it does not exist.
pub async fn update_service(pool: &PgPool, service: &Service) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE services
        SET name = $2, description = $3, pricing_mode = $4, price = $5,
            currency = $6, is_addon = $7, is_active = $8, display_order = $9
        WHERE id = $1
        "#,
    )
    .bind(service.id)
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.pricing_mode.as_str())
    .bind(service.price)
    .bind(&service.currency)
    .bind(service.is_addon)
    .bind(service.is_active)
    .bind(service.display_order)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ==================== quotes ====================

/// Get a quote header by id
pub async fn get_quote<'e, E>(executor: E, id: Uuid) -> Result<Option<Quote>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, QuoteRow>(
        r#"
        SELECT id, full_name, phone, email, document_type, document_number,
               project_name, project_address, total_area, uncovered_percent,
               covered_area, floor_count, pricing_plan_id, rate_per_area, currency,
               plan_name, plan_min_days, plan_max_days, base_cost, extras_cost,
               total_cost, status, notes, expires_at, created_at
        FROM quotes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(Quote::try_from).transpose()
}

/// Get a quote header and hold its row lock until the transaction ends
pub async fn lock_quote<'e, E>(executor: E, id: Uuid) -> Result<Option<Quote>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, QuoteRow>(
        r#"
        SELECT id, full_name, phone, email, document_type, document_number,
               project_name, project_address, total_area, uncovered_percent,
               covered_area, floor_count, pricing_plan_id, rate_per_area, currency,
               plan_name, plan_min_days, plan_max_days, base_cost, extras_cost,
               total_cost, status, notes, expires_at, created_at
        FROM quotes
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(Quote::try_from).transpose()
}

/// List quote headers, newest first
pub async fn list_quotes(pool: &PgPool) -> Result<Vec<Quote>> {
    let rows = sqlx::query_as::<_, QuoteRow>(
        r#"
        SELECT id, full_name, phone, email, document_type, document_number,
               project_name, project_address, total_area, uncovered_percent,
               covered_area, floor_count, pricing_plan_id, rate_per_area, currency,
               plan_name, plan_min_days, plan_max_days, base_cost, extras_cost,
               total_cost, status, notes, expires_at, created_at
        FROM quotes
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Quote::try_from).collect()
}

/// Line items of a quote in insertion order
pub async fn get_line_items<'e, E>(executor: E, quote_id: Uuid) -> Result<Vec<QuoteLineItem>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, LineItemRow>(
        r#"
        SELECT id, quote_id, service_id, service_name, pricing_mode,
               quantity, unit_price, line_total
        FROM quote_line_items
        WHERE quote_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(quote_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(QuoteLineItem::try_from).collect()
}

pub async fn insert_quote<'e, E>(executor: E, quote: &Quote) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO quotes
            (id, full_name, phone, email, document_type, document_number,
             project_name, project_address, total_area, uncovered_percent,
             covered_area, floor_count, pricing_plan_id, rate_per_area, currency,
             plan_name, plan_min_days, plan_max_days, base_cost, extras_cost,
             total_cost, status, notes, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
        "#,
    )
    .bind(quote.id)
    .bind(&quote.full_name)
    .bind(&quote.phone)
    .bind(&quote.email)
    .bind(&quote.document_type)
    .bind(&quote.document_number)
    .bind(&quote.project_name)
    .bind(&quote.project_address)
    .bind(quote.total_area)
    .bind(quote.uncovered_percent)
    .bind(quote.covered_area)
    .bind(quote.floor_count)
    .bind(quote.pricing_plan_id)
    .bind(quote.rate_per_area)
    .bind(&quote.currency)
    .bind(&quote.plan_name)
    .bind(quote.plan_min_days)
    .bind(quote.plan_max_days)
    .bind(quote.base_cost)
    .bind(quote.extras_cost)
    .bind(quote.total_cost)
    .bind(quote.status.as_str())
    .bind(&quote.notes)
    .bind(quote.expires_at)
    .bind(quote.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Overwrite every mutable column of a quote header
pub async fn update_quote<'e, E>(executor: E, quote: &Quote) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE quotes
        SET full_name = $2, phone = $3, email = $4, document_type = $5,
            document_number = $6, project_name = $7, project_address = $8,
            total_area = $9, uncovered_percent = $10, covered_area = $11,
            floor_count = $12, pricing_plan_id = $13, rate_per_area = $14,
            currency = $15, plan_name = $16, plan_min_days = $17,
            plan_max_days = $18, base_cost = $19, extras_cost = $20,
            total_cost = $21, status = $22, notes = $23, expires_at = $24
        WHERE id = $1
        "#,
    )
    .bind(quote.id)
    .bind(&quote.full_name)
    .bind(&quote.phone)
    .bind(&quote.email)
    .bind(&quote.document_type)
    .bind(&quote.document_number)
    .bind(&quote.project_name)
    .bind(&quote.project_address)
    .bind(quote.total_area)
    .bind(quote.uncovered_percent)
    .bind(quote.covered_area)
    .bind(quote.floor_count)
    .bind(quote.pricing_plan_id)
    .bind(quote.rate_per_area)
    .bind(&quote.currency)
    .bind(&quote.plan_name)
    .bind(quote.plan_min_days)
    .bind(quote.plan_max_days)
    .bind(quote.base_cost)
    .bind(quote.extras_cost)
    .bind(quote.total_cost)
    .bind(quote.status.as_str())
    .bind(&quote.notes)
    .bind(quote.expires_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Insert a line item or overwrite the one with the same id
pub async fn upsert_line_item<'e, E>(executor: E, item: &QuoteLineItem, position: i32) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO quote_line_items
            (id, quote_id, service_id, service_name, pricing_mode,
             quantity, unit_price, line_total, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE
        SET quantity = EXCLUDED.quantity,
            unit_price = EXCLUDED.unit_price,
            line_total = EXCLUDED.line_total,
            position = EXCLUDED.position
        "#,
    )
    .bind(item.id)
    .bind(item.quote_id)
    .bind(item.service_id)
    .bind(&item.service_name)
    .bind(item.pricing_mode.as_str())
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.line_total)
    .bind(position)
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete the line items of a quote whose id is not in `keep`
pub async fn delete_line_items_except<'e, E>(
    executor: E,
    quote_id: Uuid,
    keep: &[Uuid],
) -> Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM quote_line_items
        WHERE quote_id = $1 AND NOT (id = ANY($2))
        "#,
    )
    .bind(quote_id)
    .bind(keep)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
