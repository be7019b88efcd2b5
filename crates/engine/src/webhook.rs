//! Webhook reconciliation: received → verified → deduplicated → routed → applied.
//!
//! The audit record is written before any processing, so a crash mid-way is
//! still visible. A handler failure is recorded on the event and swallowed;
//! the transport still acknowledges, and the provider's redelivery schedule
//! re-drives processing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info, warn};

use gangway_billing::{
    signature, EventCategory, EventOutcome, PaymentAccount, PlanCatalog, ProcessorEvent,
    SignatureError, VerificationStatus, WebhookEvent,
};
use gangway_core::{CustomerRef, TenantId};
use gangway_infra::providers::{NotificationKind, Notifier};
use gangway_infra::records::{KeyedStore, Records, StoreError};
use gangway_infra::reservations::{IdempotencyGuard, Reservation, SignupKey};
use gangway_tenancy::{SubscriptionStatus, Tenant};

use crate::payment::ProvisionedBilling;
use crate::tenant::TenantProvisioner;

/// How a delivery was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAck {
    /// Routed and applied cleanly.
    Applied,
    /// Event id seen and processed before; no side effects.
    Duplicate,
    /// Event type outside the closed category set.
    Ignored,
    /// The deferred-creation path ran: a tenant now exists.
    TenantCreated,
    /// A handler failed; the error is on the audit record and the transport
    /// is still acknowledged.
    Accepted,
}

/// Rejected deliveries: these are the only non-2xx outcomes.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed event envelope: {0}")]
    Malformed(String),

    #[error("webhook authenticity check failed: {0}")]
    Authenticity(#[from] SignatureError),

    #[error("event store failure: {0}")]
    Store(#[from] StoreError),
}

/// Handler-level failure during routing/application. Logged and recorded on
/// the event; never propagated past the engine.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no payment account for customer {0}")]
    UnknownCustomer(CustomerRef),

    #[error("no tenant linked to customer {0}")]
    NoTenant(CustomerRef),

    #[error("payment account for {0} has no signup snapshot to replay")]
    MissingSnapshot(CustomerRef),

    #[error("tenant creation for customer {0} is in flight elsewhere; awaiting redelivery")]
    CreationInFlight(CustomerRef),

    #[error("event payload invalid: {0}")]
    Payload(String),

    #[error("deferred tenant provisioning failed: {0}")]
    Provision(#[source] crate::tenant::ProvisionError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

/// Applies provider events to local payment/tenant state.
#[derive(Clone)]
pub struct ReconciliationEngine {
    secret: Vec<u8>,
    plans: PlanCatalog,
    records: Records,
    guard: IdempotencyGuard,
    tenants: TenantProvisioner,
    notifier: Arc<dyn Notifier>,
    call_timeout: Duration,
}

impl ReconciliationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        secret: impl Into<Vec<u8>>,
        plans: PlanCatalog,
        records: Records,
        guard: IdempotencyGuard,
        tenants: TenantProvisioner,
        notifier: Arc<dyn Notifier>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            secret: secret.into(),
            plans,
            records,
            guard,
            tenants,
            notifier,
            call_timeout,
        }
    }

    /// Ingest one signed delivery.
    pub async fn ingest(
        &self,
        raw_body: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<ReconcileAck, WebhookError> {
        // received: no audit key exists for an unparseable body.
        let event = ProcessorEvent::decode(raw_body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

        // Audit-before-processing applies to unprocessed records only; a
        // processed record's audit trail is immutable to unauthenticated
        // deliveries, so authenticity is checked before touching it.
        let mut record = match self.records.webhook_events.get(&event.id)? {
            Some(mut existing) if existing.outcome == EventOutcome::Processed => {
                signature::verify(&self.secret, raw_body, signature_header, now.timestamp())?;
                existing.attempts += 1;
                self.records.webhook_events.upsert(event.id.clone(), existing)?;
                info!(event_id = %event.id, "duplicate delivery; no side effects");
                return Ok(ReconcileAck::Duplicate);
            }
            Some(mut existing) => {
                existing.attempts += 1;
                self.records.webhook_events.upsert(event.id.clone(), existing.clone())?;
                existing
            }
            None => {
                let fresh = WebhookEvent::received(
                    event.id.clone(),
                    event.event_type.clone(),
                    serde_json::from_slice(raw_body).unwrap_or(JsonValue::Null),
                    now,
                );
                // A concurrent delivery may insert first; re-read either way.
                self.records
                    .webhook_events
                    .insert_if_absent(event.id.clone(), fresh.clone())?;
                self.records.webhook_events.get(&event.id)?.unwrap_or(fresh)
            }
        };
        record.customer_ref = event.customer.clone();

        // verified: authenticity gates everything else.
        if let Err(e) = signature::verify(&self.secret, raw_body, signature_header, now.timestamp()) {
            record.note_error(format!("authenticity check failed: {e}"));
            self.records.webhook_events.upsert(event.id.clone(), record)?;
            return Err(WebhookError::Authenticity(e));
        }

        // routed: unknown categories are acknowledged-but-ignored.
        let Some(category) = EventCategory::from_event_type(&event.event_type) else {
            record.mark_processed(Some("ignored: event type outside handled set".to_string()), now);
            self.records.webhook_events.upsert(event.id.clone(), record)?;
            return Ok(ReconcileAck::Ignored);
        };

        // applied: handler failures are swallowed into the audit record.
        match self.apply(category, &event, now).await {
            Ok((ack, tenant_id)) => {
                record.tenant_id = tenant_id;
                record.mark_processed(None, now);
                self.records.webhook_events.upsert(event.id.clone(), record)?;
                Ok(ack)
            }
            Err(e) => {
                error!(event_id = %event.id, category = ?category, error = %e, "event application failed");
                record.note_error(e.to_string());
                self.records.webhook_events.upsert(event.id.clone(), record)?;
                Ok(ReconcileAck::Accepted)
            }
        }
    }

    async fn apply(
        &self,
        category: EventCategory,
        event: &ProcessorEvent,
        now: DateTime<Utc>,
    ) -> Result<(ReconcileAck, Option<TenantId>), ReconcileError> {
        let customer_ref = event
            .customer
            .clone()
            .ok_or_else(|| ReconcileError::Payload("missing customer reference".to_string()))?;
        let mut account = self
            .records
            .payment_accounts
            .get(&customer_ref)?
            .ok_or_else(|| ReconcileError::UnknownCustomer(customer_ref.clone()))?;

        match category {
            EventCategory::VerificationSucceeded => {
                account.set_verification(VerificationStatus::Verified, now);
                self.records.payment_accounts.upsert(customer_ref.clone(), account.clone())?;
                let tenant_id = self.update_linked_tenant(&account, |t| t.record_verification(true, now))?;
                Ok((ReconcileAck::Applied, tenant_id))
            }
            EventCategory::VerificationFailed => {
                account.set_verification(VerificationStatus::Failed, now);
                self.records.payment_accounts.upsert(customer_ref.clone(), account.clone())?;
                let tenant_id = self.update_linked_tenant(&account, |t| t.record_verification(false, now))?;
                Ok((ReconcileAck::Applied, tenant_id))
            }
            EventCategory::FundsCleared => self.apply_funds_cleared(&customer_ref, account, now).await,
            EventCategory::FundsFailed => {
                let tenant_id = account.tenant_id.ok_or(ReconcileError::NoTenant(customer_ref))?;
                let mut tenant = self
                    .records
                    .tenants
                    .get(&tenant_id)?
                    .ok_or(ReconcileError::NoTenant(account.customer_ref.clone()))?;
                tenant.record_payment_failed(now);
                self.records.tenants.upsert(tenant_id, tenant)?;
                Ok((ReconcileAck::Applied, Some(tenant_id)))
            }
            EventCategory::SubscriptionChanged => {
                let status = event
                    .data
                    .get("status")
                    .and_then(JsonValue::as_str)
                    .and_then(SubscriptionStatus::parse)
                    .ok_or_else(|| ReconcileError::Payload("missing or unknown subscription status".to_string()))?;
                let tenant_id = account.tenant_id.ok_or(ReconcileError::NoTenant(customer_ref))?;
                let mut tenant = self
                    .records
                    .tenants
                    .get(&tenant_id)?
                    .ok_or(ReconcileError::NoTenant(account.customer_ref.clone()))?;
                tenant.set_subscription(status, now);
                self.records.tenants.upsert(tenant_id, tenant)?;
                Ok((ReconcileAck::Applied, Some(tenant_id)))
            }
        }
    }

    /// Funds cleared: either the deferred-creation safety net (no tenant
    /// yet) or an ordinary billing update on the linked tenant.
    async fn apply_funds_cleared(
        &self,
        customer_ref: &CustomerRef,
        account: PaymentAccount,
        now: DateTime<Utc>,
    ) -> Result<(ReconcileAck, Option<TenantId>), ReconcileError> {
        if account.awaiting_tenant() {
            // Everything that can fail without side effects happens before
            // any slot is taken.
            let snapshot = account
                .pending_signup
                .clone()
                .ok_or_else(|| ReconcileError::MissingSnapshot(customer_ref.clone()))?;
            let plan = self
                .plans
                .find(&snapshot.plan)
                .ok_or_else(|| ReconcileError::Payload(format!("unknown plan in snapshot: {}", snapshot.plan)))?
                .clone();

            let customer_key = SignupKey::Customer(customer_ref.clone());
            if !self.guard.reserve(&customer_key)? {
                return match self.guard.reservation(&customer_key)? {
                    Some(Reservation::Bound(tenant_id)) => {
                        info!(customer_ref = %customer_ref, "funds cleared but a tenant is already bound; skipping creation");
                        Ok((ReconcileAck::Applied, Some(tenant_id)))
                    }
                    // A held slot belongs to an in-flight synchronous saga.
                    // Leave the event unprocessed: if that saga aborts and
                    // releases the slot, redelivery finishes the signup.
                    _ => Err(ReconcileError::CreationInFlight(customer_ref.clone())),
                };
            }

            let email_key = SignupKey::Email(snapshot.email.clone());
            // An email slot that is already held belongs to the synchronous
            // saga; the customer slot above is the one that closes the
            // duplicate-tenant race.
            let email_reserved = self.guard.reserve(&email_key)?;

            let owner = gangway_infra::providers::OwnerProfile {
                name: snapshot.owner_name.clone(),
                email: snapshot.email.clone(),
            };
            let company = gangway_tenancy::CompanyProfile {
                name: snapshot.company_name.clone(),
                industry: snapshot.industry.clone(),
                business_type: snapshot.business_type.clone(),
            };
            let billing = ProvisionedBilling {
                customer_ref: account.customer_ref.clone(),
                funding_source_ref: account.funding_source_ref.clone(),
                verification: VerificationStatus::Verified,
            };

            let provisioned = match self
                .tenants
                .create_tenant(&owner, &snapshot.password_digest, &company, &billing, &plan, now)
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    // Free only the slots this path took, so the provider's
                    // redelivery can retry without touching a reservation
                    // the synchronous saga still owns.
                    self.release(&customer_key);
                    if email_reserved {
                        self.release(&email_key);
                    }
                    return Err(ReconcileError::Provision(e));
                }
            };

            info!(
                tenant_id = %provisioned.tenant.id,
                customer_ref = %customer_ref,
                "deferred tenant creation completed from funds-cleared event"
            );
            return Ok((ReconcileAck::TenantCreated, Some(provisioned.tenant.id)));
        }

        // Ordinary billing update on the linked tenant.
        let tenant_id = account
            .tenant_id
            .ok_or(ReconcileError::NoTenant(customer_ref.clone()))?;
        let mut tenant = self
            .records
            .tenants
            .get(&tenant_id)?
            .ok_or(ReconcileError::NoTenant(customer_ref.clone()))?;
        tenant.record_payment_cleared(now);
        self.records.tenants.upsert(tenant_id, tenant.clone())?;
        self.notify_payment_confirmed(&tenant).await;
        Ok((ReconcileAck::Applied, Some(tenant_id)))
    }

    fn update_linked_tenant(
        &self,
        account: &PaymentAccount,
        apply: impl FnOnce(&mut Tenant),
    ) -> Result<Option<TenantId>, ReconcileError> {
        let Some(tenant_id) = account.tenant_id else {
            return Ok(None);
        };
        if let Some(mut tenant) = self.records.tenants.get(&tenant_id)? {
            apply(&mut tenant);
            self.records.tenants.upsert(tenant_id, tenant)?;
        }
        Ok(Some(tenant_id))
    }

    async fn notify_payment_confirmed(&self, tenant: &Tenant) {
        let Ok(Some(account)) = self.records.payment_accounts.get(&tenant.customer_ref) else {
            return;
        };
        let variables = serde_json::json!({
            "company": tenant.company.name,
            "next_billing_date": tenant.next_billing_date,
        });
        match tokio::time::timeout(
            self.call_timeout,
            self.notifier.send(&account.email, NotificationKind::PaymentConfirmed, &variables),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(tenant_id = %tenant.id, error = %e, "payment-confirmed notification failed"),
            Err(_) => warn!(tenant_id = %tenant.id, "payment-confirmed notification timed out"),
        }
    }

    fn release(&self, key: &SignupKey) {
        if let Err(e) = self.guard.release(key) {
            warn!(%key, error = %e, "failed to release reservation after aborted deferred creation");
        }
    }
}
