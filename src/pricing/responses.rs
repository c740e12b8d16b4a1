//! Response DTOs for pricing API endpoints.
//!
//! Money and area figures serialize as plain JSON numbers with at most two
//! decimal places.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::QuoteAggregate;
use super::models::{PricingMode, PricingPlan, Quote, QuoteLineItem, QuoteStatus, Service};

/// Line item as shown on a quote
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub pricing_mode: PricingMode,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

impl From<&QuoteLineItem> for LineItemResponse {
    fn from(item: &QuoteLineItem) -> Self {
        Self {
            id: item.id,
            service_id: item.service_id,
            service_name: item.service_name.clone(),
            pricing_mode: item.pricing_mode,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
        }
    }
}

/// Full quote with its line items
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub project_name: String,
    pub project_address: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_area: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub uncovered_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub covered_area: Decimal,
    pub floor_count: i32,
    pub pricing_plan_id: Option<Uuid>,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate_per_area: Decimal,
    pub currency: String,
    pub plan_name: Option<String>,
    pub plan_min_days: Option<i32>,
    pub plan_max_days: Option<i32>,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub extras_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
    pub status: QuoteStatus,
    pub notes: Option<String>,
    pub expires_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub services: Vec<LineItemResponse>,
}

impl From<&QuoteAggregate> for QuoteResponse {
    fn from(aggregate: &QuoteAggregate) -> Self {
        let q = aggregate.quote();
        Self {
            id: q.id,
            full_name: q.full_name.clone(),
            phone: q.phone.clone(),
            email: q.email.clone(),
            document_type: q.document_type.clone(),
            document_number: q.document_number.clone(),
            project_name: q.project_name.clone(),
            project_address: q.project_address.clone(),
            total_area: q.total_area,
            uncovered_percent: q.uncovered_percent,
            covered_area: q.covered_area,
            floor_count: q.floor_count,
            pricing_plan_id: q.pricing_plan_id,
            rate_per_area: q.rate_per_area,
            currency: q.currency.clone(),
            plan_name: q.plan_name.clone(),
            plan_min_days: q.plan_min_days,
            plan_max_days: q.plan_max_days,
            base_cost: q.base_cost,
            extras_cost: q.extras_cost,
            total_cost: q.total_cost,
            status: q.status,
            notes: q.notes.clone(),
            expires_at: q.expires_at,
            created_at: q.created_at,
            services: aggregate.line_items().iter().map(LineItemResponse::from).collect(),
        }
    }
}

/// Row of the quote list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResponse {
    pub id: Uuid,
    pub full_name: String,
    pub project_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_area: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
    pub currency: String,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Quote> for QuoteSummaryResponse {
    fn from(q: &Quote) -> Self {
        Self {
            id: q.id,
            full_name: q.full_name.clone(),
            project_name: q.project_name.clone(),
            total_area: q.total_area,
            total_cost: q.total_cost,
            currency: q.currency.clone(),
            status: q.status,
            created_at: q.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate_per_area: Decimal,
    pub currency: String,
    pub min_days: Option<i32>,
    pub max_days: Option<i32>,
    pub is_active: bool,
}

impl From<&PricingPlan> for PlanResponse {
    fn from(p: &PricingPlan) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            rate_per_area: p.rate_per_area,
            currency: p.currency.clone(),
            min_days: p.min_days,
            max_days: p.max_days,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub pricing_mode: PricingMode,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
    pub is_addon: bool,
    pub is_active: bool,
    pub display_order: i32,
}

impl From<&Service> for ServiceResponse {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            description: s.description.clone(),
            pricing_mode: s.pricing_mode,
            price: s.price,
            currency: s.currency.clone(),
            is_addon: s.is_addon,
            is_active: s.is_active,
            display_order: s.display_order,
        }
    }
}

/// Plans and services offered by the quote editor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteOptionsResponse {
    pub pricing_plans: Vec<PlanResponse>,
    pub services: Vec<ServiceResponse>,
}

/// Id of a freshly created resource
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// Generic pricing error response
#[derive(Debug, Serialize)]
pub struct PricingErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
