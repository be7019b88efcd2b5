use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::app::dto;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", get(list_plans))
}

pub async fn list_plans(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let items: Vec<_> = services.plans.plans().iter().map(dto::plan_to_json).collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
