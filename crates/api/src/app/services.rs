//! Engine wiring: providers, stores, guard, orchestrator, reconciliation.

use std::sync::Arc;

use gangway_billing::PlanCatalog;
use gangway_engine::{
    OnboardingOrchestrator, PaymentProvisioner, ReconciliationEngine, TenantProvisioner,
};
use gangway_infra::providers::{InMemoryDirectory, InMemoryProcessor, RecordingNotifier};
use gangway_infra::records::Records;
use gangway_infra::reservations::{IdempotencyGuard, InMemoryReservationStore, ReservationStore};

use crate::config::AppConfig;

/// Everything the route handlers need.
pub struct AppServices {
    pub orchestrator: OnboardingOrchestrator,
    pub reconciliation: ReconciliationEngine,
    pub plans: PlanCatalog,
}

/// Wire the engine against the configured backends.
///
/// Providers are the in-memory implementations unless/until real adapters
/// are wired in; the reservation store is the one piece that can already be
/// pointed at Postgres (`USE_PERSISTENT_STORES`, `postgres` feature), since
/// it is the correctness-critical primitive.
pub async fn build_services(config: &AppConfig) -> AppServices {
    let plans = PlanCatalog::default();
    let records = Records::in_memory();

    let reservations = build_reservation_store(config).await;
    let guard = IdempotencyGuard::new(reservations);

    let processor = Arc::new(InMemoryProcessor::new());
    let directory = Arc::new(InMemoryDirectory::new(
        config.webhook_secret.as_bytes().to_vec(),
    ));
    let notifier = Arc::new(RecordingNotifier::new());

    let payment = PaymentProvisioner::new(processor, config.provider_timeout);
    let tenants = TenantProvisioner::new(
        directory.clone(),
        records.clone(),
        guard.clone(),
        config.provider_timeout,
    );

    let orchestrator = OnboardingOrchestrator::new(
        plans.clone(),
        payment,
        tenants.clone(),
        guard.clone(),
        records.clone(),
        directory,
        notifier.clone(),
        config.provider_timeout,
    );

    let reconciliation = ReconciliationEngine::new(
        config.webhook_secret.as_bytes().to_vec(),
        plans.clone(),
        records,
        guard,
        tenants,
        notifier,
        config.provider_timeout,
    );

    AppServices {
        orchestrator,
        reconciliation,
        plans,
    }
}

#[cfg(feature = "postgres")]
async fn build_reservation_store(config: &AppConfig) -> Arc<dyn ReservationStore> {
    if config.use_persistent_stores {
        if let Some(url) = &config.database_url {
            match sqlx::postgres::PgPoolOptions::new().connect(url).await {
                Ok(pool) => {
                    tracing::info!("using postgres-backed reservation store");
                    return Arc::new(gangway_infra::postgres::PostgresReservationStore::new(pool));
                }
                Err(e) => {
                    tracing::error!(error = %e, "postgres connection failed; falling back to in-memory reservations");
                }
            }
        } else {
            tracing::warn!("USE_PERSISTENT_STORES set but DATABASE_URL missing; using in-memory reservations");
        }
    }
    Arc::new(InMemoryReservationStore::new())
}

#[cfg(not(feature = "postgres"))]
async fn build_reservation_store(config: &AppConfig) -> Arc<dyn ReservationStore> {
    if config.use_persistent_stores {
        tracing::warn!("USE_PERSISTENT_STORES set but the postgres feature is not compiled in");
    }
    Arc::new(InMemoryReservationStore::new())
}
