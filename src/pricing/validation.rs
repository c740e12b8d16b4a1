//! Field-level checks for quote and catalog input.
//!
//! Every check runs before any catalog lookup or store write. Field names in
//! errors are the camelCase names callers send.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::aggregate::QuoteChanges;
use super::calculators::{round_money, MAX_AMOUNT, MAX_AREA, MONEY_PLACES};
use super::models::{Quote, QuoteStatus};
use super::requests::{CreateQuoteRequest, LineItemRequest, UpdateQuoteRequest};

pub const MAX_FLOORS: i32 = 1_000;
pub const MAX_QUANTITY: i32 = 1_000_000;

fn too_large(field: &str, max: impl std::fmt::Display) -> AppError {
    AppError::validation(field, format!("must not exceed {}", max))
}

pub fn total_area(value: Decimal) -> Result<Decimal> {
    if value <= Decimal::ZERO {
        return Err(AppError::validation("totalArea", "must be greater than 0"));
    }
    if value > MAX_AREA {
        return Err(too_large("totalArea", MAX_AREA));
    }
    Ok(value)
}

pub fn uncovered_percent(value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(AppError::validation(
            "uncoveredPercent",
            "must be between 0 and 100",
        ));
    }
    Ok(value)
}

pub fn covered_area(value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO {
        return Err(AppError::validation("coveredArea", "must not be negative"));
    }
    if value > MAX_AREA {
        return Err(too_large("coveredArea", MAX_AREA));
    }
    Ok(value)
}

pub fn floor_count(value: i32) -> Result<i32> {
    if value < 1 {
        return Err(AppError::validation("floorCount", "must be at least 1"));
    }
    if value > MAX_FLOORS {
        return Err(too_large("floorCount", MAX_FLOORS));
    }
    Ok(value)
}

pub fn rate_per_area(value: Decimal) -> Result<Decimal> {
    if value <= Decimal::ZERO {
        return Err(AppError::validation("ratePerArea", "must be greater than 0"));
    }
    if value > MAX_AMOUNT {
        return Err(too_large("ratePerArea", MAX_AMOUNT));
    }
    Ok(value)
}

pub fn unit_price(field: &str, value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(field, "must not be negative"));
    }
    if value > MAX_AMOUNT {
        return Err(too_large(field, MAX_AMOUNT));
    }
    Ok(value)
}

/// Missing or non-positive quantities become 1.
fn normalize_quantity(quantity: Option<i32>) -> i32 {
    quantity.unwrap_or(1).max(1)
}

/// Normalized quantity, capped at `MAX_QUANTITY`.
pub fn quantity(field: &str, value: Option<i32>) -> Result<i32> {
    let quantity = normalize_quantity(value);
    if quantity > MAX_QUANTITY {
        return Err(too_large(field, MAX_QUANTITY));
    }
    Ok(quantity)
}

/// Parse a calendar date in strict `YYYY-MM-DD` form.
pub fn expiry_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if value.len() != 10 {
        return Err(AppError::validation("expiresAt", "must be a date in YYYY-MM-DD format"));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::validation("expiresAt", "must be a date in YYYY-MM-DD format"))
}

/// Three ASCII letters, returned uppercased.
pub fn currency(value: &str) -> Result<String> {
    let value = value.trim();
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation("currency", "must be a 3-letter currency code"));
    }
    Ok(value.to_ascii_uppercase())
}

pub fn status(value: &str) -> Result<QuoteStatus> {
    value
        .trim()
        .parse::<QuoteStatus>()
        .map_err(|reason| AppError::validation("status", reason))
}

/// Trim; blank becomes `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn day_range(min_days: Option<i32>, max_days: Option<i32>) -> Result<()> {
    if min_days.is_some_and(|d| d < 0) {
        return Err(AppError::validation("minDays", "must not be negative"));
    }
    if max_days.is_some_and(|d| d < 0) {
        return Err(AppError::validation("maxDays", "must not be negative"));
    }
    if let (Some(min), Some(max)) = (min_days, max_days) {
        if min > max {
            return Err(AppError::validation("minDays", "must not exceed maxDays"));
        }
    }
    Ok(())
}

fn line_items(services: &[LineItemRequest]) -> Result<()> {
    for (i, item) in services.iter().enumerate() {
        if let Some(price) = item.unit_price {
            unit_price(&format!("services[{}].unitPrice", i), price)?;
        }
        quantity(&format!("services[{}].quantity", i), item.quantity)?;
    }
    Ok(())
}

/// Defaults applied to fields a create request leaves out.
#[derive(Debug, Clone)]
pub struct QuoteDefaults {
    pub currency: String,
    pub uncovered_percent: Decimal,
}

/// A validated create request, before catalog resolution.
#[derive(Debug, Clone)]
pub struct QuoteDraft {
    /// Header with inputs set and derived figures zeroed.
    pub quote: Quote,
    pub plan_id: Option<Uuid>,
    pub covered_area: Option<Decimal>,
    pub services: Vec<LineItemRequest>,
}

/// Validate a create request into a draft quote.
pub fn quote_draft(mut req: CreateQuoteRequest, defaults: &QuoteDefaults) -> Result<QuoteDraft> {
    use validator::Validate;

    req.normalize();
    req.validate()?;

    let total = total_area(
        req.total_area
            .ok_or_else(|| AppError::validation("totalArea", "is required"))?,
    )?;
    let uncovered = match req.uncovered_percent {
        Some(p) => uncovered_percent(p)?,
        None => defaults.uncovered_percent,
    };
    let explicit_covered = req.covered_area.map(covered_area).transpose()?;
    let floors = floor_count(req.floor_count.unwrap_or(1))?;

    // A plan supplies rate and currency; without one a manual rate is required.
    let rate = match (req.pricing_plan_id, req.rate_per_area) {
        (Some(_), _) => Decimal::ZERO,
        (None, Some(rate)) => rate_per_area(rate)?,
        (None, None) => {
            return Err(AppError::validation(
                "ratePerArea",
                "is required when no pricing plan is selected",
            ))
        }
    };
    let currency = match req.currency.as_deref() {
        Some(c) => currency(c)?,
        None => defaults.currency.clone(),
    };
    let status = match req.status.as_deref() {
        Some(s) => status(s)?,
        None => QuoteStatus::New,
    };
    let expires_at = req.expires_at.as_deref().map(expiry_date).transpose()?;
    day_range(req.plan_min_days, req.plan_max_days)?;
    line_items(&req.services)?;

    let quote = Quote {
        id: Uuid::new_v4(),
        full_name: req.full_name,
        phone: req.phone,
        email: req.email,
        document_type: optional_text(req.document_type),
        document_number: optional_text(req.document_number),
        project_name: req.project_name,
        project_address: optional_text(req.project_address),
        total_area: round_money(total, MONEY_PLACES),
        uncovered_percent: uncovered,
        covered_area: Decimal::ZERO,
        floor_count: floors,
        pricing_plan_id: None,
        rate_per_area: rate,
        currency,
        plan_name: optional_text(req.plan_name),
        plan_min_days: req.plan_min_days,
        plan_max_days: req.plan_max_days,
        base_cost: Decimal::ZERO,
        extras_cost: Decimal::ZERO,
        total_cost: Decimal::ZERO,
        status,
        notes: optional_text(req.notes),
        expires_at,
        created_at: Utc::now(),
    };

    Ok(QuoteDraft {
        quote,
        plan_id: req.pricing_plan_id,
        covered_area: explicit_covered,
        services: req.services,
    })
}

/// Validate an update request.
///
/// The plan field is returned separately since resolving it needs the
/// catalog: `None` is absent, `Some(None)` clears the plan.
pub fn quote_changes(mut req: UpdateQuoteRequest) -> Result<(QuoteChanges, Option<Option<Uuid>>)> {
    use validator::Validate;

    if req.is_empty() {
        return Err(AppError::validation("body", "no fields to update"));
    }
    req.normalize();
    req.validate()?;

    let expires_at = match req.expires_at {
        Some(Some(raw)) if !raw.trim().is_empty() => Some(Some(expiry_date(&raw)?)),
        Some(_) => Some(None),
        None => None,
    };
    let plan_min_days = req.plan_min_days;
    let plan_max_days = req.plan_max_days;
    day_range(plan_min_days.flatten(), plan_max_days.flatten())?;

    let changes = QuoteChanges {
        full_name: req.full_name,
        phone: req.phone,
        email: req.email,
        project_name: req.project_name,
        document_type: req.document_type.map(optional_text),
        document_number: req.document_number.map(optional_text),
        project_address: req.project_address.map(optional_text),
        notes: req.notes.map(optional_text),
        status: req.status.as_deref().map(status).transpose()?,
        expires_at,
        total_area: req
            .total_area
            .map(|v| total_area(v).map(|v| round_money(v, MONEY_PLACES)))
            .transpose()?,
        uncovered_percent: req.uncovered_percent.map(uncovered_percent).transpose()?,
        covered_area: req.covered_area.map(covered_area).transpose()?,
        floor_count: req.floor_count.map(floor_count).transpose()?,
        rate_per_area: req.rate_per_area.map(rate_per_area).transpose()?,
        currency: req.currency.as_deref().map(currency).transpose()?,
        plan: None,
        plan_name: req.plan_name.map(optional_text),
        plan_min_days,
        plan_max_days,
    };

    Ok((changes, req.pricing_plan_id))
}
