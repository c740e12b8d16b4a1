//! Domain models for the quote pricing engine.
//!
//! Rows are read through the structs in `queries` and converted into these
//! types, so enum columns are parsed once at the storage boundary.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a service's price is applied to a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PricingMode {
    /// `price * quantity`
    #[default]
    #[serde(rename = "flat")]
    Flat,
    /// `price * total_area * quantity`
    #[serde(rename = "per_m2")]
    PerArea,
    /// `base_cost * price / 100 * quantity`
    #[serde(rename = "percent")]
    Percentage,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::Flat => "flat",
            PricingMode::PerArea => "per_m2",
            PricingMode::Percentage => "percent",
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(PricingMode::Flat),
            "per_m2" => Ok(PricingMode::PerArea),
            "percent" => Ok(PricingMode::Percentage),
            other => Err(format!(
                "Invalid pricing mode: {}. Use flat, per_m2 or percent",
                other
            )),
        }
    }
}

/// Quote status label. No transition graph is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    New,
    Reviewed,
    Sent,
    Accepted,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::New => "new",
            QuoteStatus::Reviewed => "reviewed",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(QuoteStatus::New),
            "reviewed" => Ok(QuoteStatus::Reviewed),
            "sent" => Ok(QuoteStatus::Sent),
            "accepted" => Ok(QuoteStatus::Accepted),
            "rejected" => Ok(QuoteStatus::Rejected),
            other => Err(format!(
                "Invalid quote status: {}. Use new, reviewed, sent, accepted or rejected",
                other
            )),
        }
    }
}

/// Pricing plan from pricing_plans
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPlan {
    pub id: Uuid,
    pub name: String,
    pub rate_per_area: Decimal,
    pub currency: String,
    pub min_days: Option<i32>,
    pub max_days: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Catalog service from services
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub pricing_mode: PricingMode,
    pub price: Decimal,
    pub currency: String,
    pub is_addon: bool,
    pub is_active: bool,
    pub display_order: i32,
}

/// Quote header from quotes. Derived money fields are maintained by
/// `QuoteAggregate`; nothing else should write them.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub project_name: String,
    pub project_address: Option<String>,
    pub total_area: Decimal,
    pub uncovered_percent: Decimal,
    pub covered_area: Decimal,
    pub floor_count: i32,
    pub pricing_plan_id: Option<Uuid>,
    pub rate_per_area: Decimal,
    pub currency: String,
    pub plan_name: Option<String>,
    pub plan_min_days: Option<i32>,
    pub plan_max_days: Option<i32>,
    pub base_cost: Decimal,
    pub extras_cost: Decimal,
    pub total_cost: Decimal,
    pub status: QuoteStatus,
    pub notes: Option<String>,
    pub expires_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Line item from quote_line_items
///
/// `pricing_mode` and `service_name` are copied from the service when the
/// item is added, so recomputation never reads the live catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteLineItem {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub pricing_mode: PricingMode,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_mode_round_trips_storage_names() {
        for mode in [PricingMode::Flat, PricingMode::PerArea, PricingMode::Percentage] {
            assert_eq!(mode.as_str().parse::<PricingMode>().unwrap(), mode);
        }
        assert!("hourly".parse::<PricingMode>().is_err());
    }

    #[test]
    fn test_pricing_mode_serde_uses_storage_names() {
        let json = serde_json::to_string(&PricingMode::PerArea).unwrap();
        assert_eq!(json, "\"per_m2\"");
        let mode: PricingMode = serde_json::from_str("\"percent\"").unwrap();
        assert_eq!(mode, PricingMode::Percentage);
    }

    #[test]
    fn test_quote_status_parse() {
        assert_eq!("accepted".parse::<QuoteStatus>().unwrap(), QuoteStatus::Accepted);
        assert_eq!(QuoteStatus::default(), QuoteStatus::New);
        let err = "archived".parse::<QuoteStatus>().unwrap_err();
        assert!(err.contains("archived"));
    }
}
