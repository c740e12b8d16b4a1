//! Error handling for the application

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::pricing::responses::PricingErrorResponse;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid pricing plan: {0}")]
    InvalidPricingPlan(String),

    #[error("Invalid service selection: {0}")]
    InvalidService(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidPricingPlan(_) => "invalid_pricing_plan",
            AppError::InvalidService(_) => "invalid_service",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::InvalidPricingPlan(_)
            | AppError::InvalidService(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let Some((field, errs)) = fields.into_iter().next() else {
            return AppError::validation("body", "invalid request");
        };
        let reason = errs
            .first()
            .map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => e.code.to_string(),
            })
            .unwrap_or_else(|| "invalid value".to_string());

        AppError::validation(camel_case(&field), reason)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("id", rejection.body_text())
    }
}

/// Request fields are camelCase on the wire; validator reports Rust names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, details) = match &self {
            AppError::Validation { field, reason } => (
                format!("{} {}", field, reason),
                Some(serde_json::json!({ "field": field })),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("Database error".to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = PricingErrorResponse {
            error_type: self.kind().to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable_per_variant() {
        assert_eq!(AppError::validation("totalArea", "x").kind(), "validation_error");
        assert_eq!(AppError::NotFound("Quote".into()).kind(), "not_found");
        assert_eq!(AppError::InvalidPricingPlan("p".into()).kind(), "invalid_pricing_plan");
        assert_eq!(AppError::InvalidService("s".into()).kind(), "invalid_service");
        assert_eq!(AppError::Internal("boom".into()).kind(), "internal_error");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::validation("a", "b").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("Quote".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("full_name"), "fullName");
        assert_eq!(camel_case("email"), "email");
        assert_eq!(camel_case("project_address_line"), "projectAddressLine");
    }
}
