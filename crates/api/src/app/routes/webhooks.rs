use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

/// Header carrying the `t=…,v1=…` delivery signature.
pub const SIGNATURE_HEADER: &str = "gangway-signature";

pub fn router() -> Router {
    Router::new().route("/payments", post(receive_payment_event))
}

pub async fn receive_payment_event(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match services.reconciliation.ingest(&body, signature, Utc::now()).await {
        Ok(ack) => (StatusCode::OK, Json(dto::ack_to_json(ack))).into_response(),
        Err(err) => errors::webhook_error_to_response(err),
    }
}
