//! Postgres-backed reservation store.
//!
//! The reservation slot is a row in `signup_reservations` with the key as
//! primary key; `try_reserve` is `INSERT … ON CONFLICT DO NOTHING`, so the
//! check-and-set happens inside the database, not in application code.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE signup_reservations (
//!     key        TEXT PRIMARY KEY,
//!     tenant_id  UUID,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```

use std::sync::Arc;

use sqlx::{PgPool, Row};

use gangway_core::TenantId;

use crate::records::StoreError;
use crate::reservations::{Reservation, ReservationStore, SignupKey};

/// Reservation store over a Postgres unique constraint.
///
/// The trait is synchronous (the engine and the in-memory store are too), so
/// queries bridge onto the ambient tokio runtime the way the rest of our
/// Postgres adapters do.
pub struct PostgresReservationStore {
    pool: Arc<PgPool>,
}

impl PostgresReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| StoreError::backend("no tokio runtime available"))?;
        handle
            .block_on(fut)
            .map_err(|e| StoreError::backend(e.to_string()))
    }
}

impl ReservationStore for PostgresReservationStore {
    fn try_reserve(&self, key: &SignupKey) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let key = key.to_string();
        self.block_on(async move {
            let result = sqlx::query(
                "INSERT INTO signup_reservations (key) VALUES ($1) ON CONFLICT (key) DO NOTHING",
            )
            .bind(&key)
            .execute(&*pool)
            .await?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn status(&self, key: &SignupKey) -> Result<Option<Reservation>, StoreError> {
        let pool = self.pool.clone();
        let key = key.to_string();
        self.block_on(async move {
            let row = sqlx::query("SELECT tenant_id FROM signup_reservations WHERE key = $1")
                .bind(&key)
                .fetch_optional(&*pool)
                .await?;
            Ok(row.map(|row| {
                match row.get::<Option<uuid::Uuid>, _>("tenant_id") {
                    Some(id) => Reservation::Bound(TenantId::from_uuid(id)),
                    None => Reservation::Held,
                }
            }))
        })
    }

    fn bind(&self, key: &SignupKey, tenant_id: TenantId) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let key = key.to_string();
        let tenant_uuid = *tenant_id.as_uuid();
        self.block_on(async move {
            sqlx::query(
                "INSERT INTO signup_reservations (key, tenant_id) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET tenant_id = EXCLUDED.tenant_id",
            )
            .bind(&key)
            .bind(tenant_uuid)
            .execute(&*pool)
            .await?;
            Ok(())
        })
    }

    fn release(&self, key: &SignupKey) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let key = key.to_string();
        self.block_on(async move {
            // Bound slots are permanent; only in-flight holds are released.
            sqlx::query("DELETE FROM signup_reservations WHERE key = $1 AND tenant_id IS NULL")
                .bind(&key)
                .execute(&*pool)
                .await?;
            Ok(())
        })
    }
}
