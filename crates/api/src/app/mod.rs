//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: engine wiring (providers, stores, guard, orchestrator)
//! - `routes/`: HTTP routes + handlers (one file per surface area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::AppConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> Router {
    let services = Arc::new(services::build_services(&config).await);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router().layer(Extension(services)))
        .layer(ServiceBuilder::new())
}
