//! Consistent JSON error responses and engine-error mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gangway_engine::{OnboardError, WebhookError};

/// Map an onboarding failure to its HTTP response.
///
/// Validation and duplicate errors carry detail the caller can act on;
/// provisioning failures reduce to a generic message, with the provider
/// detail logged rather than exposed.
pub fn onboard_error_to_response(err: OnboardError) -> axum::response::Response {
    match err {
        OnboardError::Validation(e) => {
            let errors: Vec<_> = e
                .violations
                .iter()
                .map(|v| {
                    json!({
                        "field": v.field,
                        "code": v.code,
                        "message": v.message,
                    })
                })
                .collect();
            (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "error": "validation_error",
                    "message": "signup request failed validation",
                    "errors": errors,
                })),
            )
                .into_response()
        }
        OnboardError::DuplicateRegistration => json_error(
            StatusCode::CONFLICT,
            "duplicate_registration",
            "a registration already exists for this email",
        ),
        OnboardError::PaymentProvider(e) => {
            tracing::error!(error = %e, "payment provisioning failed");
            json_error(
                StatusCode::BAD_GATEWAY,
                "payment_setup_failed",
                "payment setup failed, please try again",
            )
        }
        OnboardError::Provision(e) => {
            tracing::error!(error = %e, "tenant provisioning failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "setup_failed",
                "account setup failed, please try again",
            )
        }
        OnboardError::Store(e) => {
            tracing::error!(error = %e, "store failure during onboarding");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "setup_failed",
                "account setup failed, please try again",
            )
        }
    }
}

/// Map a webhook rejection to its HTTP response.
pub fn webhook_error_to_response(err: WebhookError) -> axum::response::Response {
    match err {
        WebhookError::Malformed(msg) => json_error(StatusCode::BAD_REQUEST, "malformed_event", msg),
        WebhookError::Authenticity(e) => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_signature", e.to_string())
        }
        WebhookError::Store(e) => {
            tracing::error!(error = %e, "store failure during webhook ingestion");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "event could not be recorded",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
