//! HTTP routes, one file per surface area.

use axum::Router;

pub mod plans;
pub mod signup;
pub mod system;
pub mod webhooks;

pub fn router() -> Router {
    Router::new()
        .nest("/signup", signup::router())
        .nest("/webhooks", webhooks::router())
        .nest("/plans", plans::router())
}
