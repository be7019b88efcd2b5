//! Tracing configuration for the onboarding pipeline.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset: saga and reconciliation detail
/// at debug, query logging quieted, everything else at info.
const DEFAULT_DIRECTIVES: &str = "info,gangway_engine=debug,sqlx=warn";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    // JSON logs with targets, so engine events are filterable downstream.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}
