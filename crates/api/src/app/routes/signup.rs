use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(submit_signup))
}

pub async fn submit_signup(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SignupBody>,
) -> axum::response::Response {
    let request = body.into();
    match services.orchestrator.onboard(&request, Utc::now()).await {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(dto::SignupResponse::from(receipt)),
        )
            .into_response(),
        Err(err) => errors::onboard_error_to_response(err),
    }
}
