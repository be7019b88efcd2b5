//! Process configuration, read from the environment at wiring time.

use std::time::Duration;

use tracing::warn;

/// Runtime configuration for the API process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HMAC secret for inbound webhook signatures (`GANGWAY_WEBHOOK_SECRET`).
    pub webhook_secret: String,
    /// Listen address (`GANGWAY_BIND_ADDR`, default `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Bounded timeout applied to every external provider call
    /// (`GANGWAY_PROVIDER_TIMEOUT_MS`, default 10s).
    pub provider_timeout: Duration,
    /// Use the Postgres-backed reservation store (`USE_PERSISTENT_STORES`
    /// plus `DATABASE_URL`); requires the `postgres` feature.
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Read configuration from the environment, with dev-friendly defaults.
    pub fn from_env() -> Self {
        let webhook_secret = std::env::var("GANGWAY_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("GANGWAY_WEBHOOK_SECRET not set; using insecure dev default");
            "dev-webhook-secret".to_string()
        });

        let bind_addr =
            std::env::var("GANGWAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let provider_timeout = std::env::var("GANGWAY_PROVIDER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(10_000));

        let use_persistent_stores = std::env::var("USE_PERSISTENT_STORES")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            webhook_secret,
            bind_addr,
            provider_timeout,
            use_persistent_stores,
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// Fixed configuration for tests: in-memory stores, known secret.
    pub fn for_tests(webhook_secret: &str) -> Self {
        Self {
            webhook_secret: webhook_secret.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            provider_timeout: Duration::from_secs(5),
            use_persistent_stores: false,
            database_url: None,
        }
    }
}
