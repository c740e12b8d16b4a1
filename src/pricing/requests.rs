//! Request DTOs for quote and catalog endpoints.
//!
//! Required text fields default to empty so a missing field surfaces as a
//! field-level validation error instead of a body rejection.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use super::models::PricingMode;

/// Keep `null` distinct from "absent" for clearable fields.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_option(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        trim_in_place(v);
    }
}

/// Request to create a quote
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub phone: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "must not be empty"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub project_name: String,
    #[serde(default)]
    pub project_address: Option<String>,
    #[serde(default)]
    pub total_area: Option<Decimal>,
    #[serde(default)]
    pub covered_area: Option<Decimal>,
    #[serde(default)]
    pub uncovered_percent: Option<Decimal>,
    #[serde(default)]
    pub floor_count: Option<i32>,
    #[serde(default)]
    pub rate_per_area: Option<Decimal>,
    #[serde(default)]
    pub pricing_plan_id: Option<Uuid>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub plan_min_days: Option<i32>,
    #[serde(default)]
    pub plan_max_days: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub services: Vec<LineItemRequest>,
}

impl CreateQuoteRequest {
    /// Trim identity fields before validation.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.full_name);
        trim_in_place(&mut self.phone);
        trim_in_place(&mut self.email);
        trim_in_place(&mut self.project_name);
    }
}

/// Partial update of a quote. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuoteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub full_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "must not be empty"),
        email(message = "must be a valid email address")
    )]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub project_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub document_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub document_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub project_address: Option<Option<String>>,
    #[serde(default)]
    pub total_area: Option<Decimal>,
    #[serde(default)]
    pub covered_area: Option<Decimal>,
    #[serde(default)]
    pub uncovered_percent: Option<Decimal>,
    #[serde(default)]
    pub floor_count: Option<i32>,
    #[serde(default)]
    pub rate_per_area: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub pricing_plan_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub plan_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub plan_min_days: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub plan_max_days: Option<Option<i32>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub expires_at: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl UpdateQuoteRequest {
    pub fn normalize(&mut self) {
        trim_option(&mut self.full_name);
        trim_option(&mut self.phone);
        trim_option(&mut self.email);
        trim_option(&mut self.project_name);
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.project_name.is_none()
            && self.document_type.is_none()
            && self.document_number.is_none()
            && self.project_address.is_none()
            && self.total_area.is_none()
            && self.covered_area.is_none()
            && self.uncovered_percent.is_none()
            && self.floor_count.is_none()
            && self.rate_per_area.is_none()
            && self.pricing_plan_id.is_none()
            && self.currency.is_none()
            && self.plan_name.is_none()
            && self.plan_min_days.is_none()
            && self.plan_max_days.is_none()
            && self.status.is_none()
            && self.expires_at.is_none()
            && self.notes.is_none()
    }
}

/// A service to attach to a quote
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub service_id: Uuid,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

/// Edit of an attached line item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineItemRequest {
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

/// Request to add a service to the catalog
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pricing_mode: PricingMode,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_addon: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

/// Partial update of a catalog service
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub pricing_mode: Option<PricingMode>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_addon: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

/// Request to add a pricing plan
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub rate_per_area: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub min_days: Option<i32>,
    #[serde(default)]
    pub max_days: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update of a pricing plan
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
    #[serde(default)]
    pub rate_per_area: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub min_days: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_days: Option<Option<i32>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let req: UpdateQuoteRequest =
            serde_json::from_value(json!({ "pricingPlanId": null, "notes": "hi" })).unwrap();
        assert_eq!(req.pricing_plan_id, Some(None));
        assert_eq!(req.notes, Some(Some("hi".to_string())));
        assert_eq!(req.expires_at, None);
        assert!(!req.is_empty());

        let req: UpdateQuoteRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.is_empty());
    }

    #[test]
    fn test_decimal_fields_accept_numbers() {
        let req: CreateQuoteRequest = serde_json::from_value(json!({
            "fullName": "Ana",
            "totalArea": 100,
            "uncoveredPercent": 12.5,
            "ratePerArea": "500.00",
            "services": [{ "serviceId": Uuid::nil(), "quantity": 2 }]
        }))
        .unwrap();
        assert_eq!(req.total_area, Some(dec!(100)));
        assert_eq!(req.uncovered_percent, Some(dec!(12.5)));
        assert_eq!(req.rate_per_area, Some(dec!(500)));
        assert_eq!(req.services[0].quantity, Some(2));
        assert_eq!(req.services[0].unit_price, None);
    }

    #[test]
    fn test_missing_identity_fails_validation_after_trim() {
        let mut req = CreateQuoteRequest {
            full_name: "   ".to_string(),
            phone: "123".to_string(),
            email: "ana@example.com".to_string(),
            project_name: "Casa".to_string(),
            ..Default::default()
        };
        req.normalize();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("full_name"));
    }

    #[test]
    fn test_service_request_defaults() {
        let req: CreateServiceRequest =
            serde_json::from_value(json!({ "name": "Planos", "price": 1500 })).unwrap();
        assert_eq!(req.pricing_mode, PricingMode::Flat);
        assert!(req.is_active);
        assert!(!req.is_addon);
    }
}
