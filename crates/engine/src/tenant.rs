//! Tenant provisioning with explicit compensation.
//!
//! Sequence: identity account, tenant row, owner membership, then guard
//! binding. The failure handling is asymmetric: an authenticatable identity
//! with no tenant never survives (rolled back), while a tenant with no
//! membership is repairable out-of-band and is kept.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, warn};

use gangway_billing::plan::Plan;
use gangway_billing::VerificationStatus;
use gangway_core::{PasswordDigest, TenantId};
use gangway_infra::providers::{DirectoryError, IdentityDirectory, OwnerProfile};
use gangway_infra::records::{KeyedStore, Records, StoreError};
use gangway_infra::reservations::{IdempotencyGuard, SignupKey};
use gangway_tenancy::{CompanyProfile, Membership, PaymentMethodStatus, Tenant};

use crate::payment::ProvisionedBilling;

/// Outcome of tenant provisioning. `membership` is `None` only on the
/// logged-and-kept membership-failure path.
#[derive(Debug, Clone)]
pub struct TenantProvisioned {
    pub tenant: Tenant,
    pub membership: Option<Membership>,
}

/// Fatal tenant-provisioning failure; compensation has already run by the
/// time the caller sees this.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("identity account creation failed: {0}")]
    Identity(#[source] DirectoryError),

    #[error("tenant record creation failed: {0}")]
    TenantRecord(#[source] StoreError),

    #[error("tenant record conflict: a tenant already exists for this id")]
    TenantConflict,
}

/// Creates the identity account, tenant row and owner membership.
#[derive(Clone)]
pub struct TenantProvisioner {
    directory: Arc<dyn IdentityDirectory>,
    records: Records,
    guard: IdempotencyGuard,
    call_timeout: Duration,
}

impl TenantProvisioner {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        records: Records,
        guard: IdempotencyGuard,
        call_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            records,
            guard,
            call_timeout,
        }
    }

    /// Run the creation sequence, compensating on partial failure.
    pub async fn create_tenant(
        &self,
        owner: &OwnerProfile,
        password_digest: &PasswordDigest,
        company: &CompanyProfile,
        billing: &ProvisionedBilling,
        plan: &Plan,
        now: DateTime<Utc>,
    ) -> Result<TenantProvisioned, ProvisionError> {
        // (1) identity account. Fatal on failure; nothing to undo yet.
        let account_id = match tokio::time::timeout(
            self.call_timeout,
            self.directory.create_account(&owner.email, password_digest, owner),
        )
        .await
        {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => return Err(ProvisionError::Identity(e)),
            Err(_) => return Err(ProvisionError::Identity(DirectoryError::Timeout)),
        };

        // (2) tenant row. Failure here rolls back the identity account.
        let payment_method = match billing.verification {
            VerificationStatus::Verified => PaymentMethodStatus::Active,
            _ => PaymentMethodStatus::Pending,
        };
        let tenant = Tenant::new_trial(
            TenantId::new(),
            company.clone(),
            account_id,
            plan,
            billing.customer_ref.clone(),
            billing.funding_source_ref.clone(),
            payment_method,
            now,
        );

        let inserted = match self.records.tenants.insert_if_absent(tenant.id, tenant.clone()) {
            Ok(inserted) => inserted,
            Err(e) => {
                self.compensate_identity(account_id).await;
                return Err(ProvisionError::TenantRecord(e));
            }
        };
        if !inserted {
            self.compensate_identity(account_id).await;
            return Err(ProvisionError::TenantConflict);
        }

        // (3) owner membership. Failure after (2) is logged and kept.
        let membership = Membership::owner(tenant.id, account_id, now);
        let membership = match self
            .records
            .memberships
            .insert_if_absent(membership.id, membership.clone())
        {
            Ok(true) => Some(membership),
            Ok(false) | Err(_) => {
                warn!(
                    tenant_id = %tenant.id,
                    "owner membership creation failed; keeping tenant for out-of-band repair"
                );
                None
            }
        };

        self.link_and_bind(&tenant, now);

        Ok(TenantProvisioned { tenant, membership })
    }

    /// Point the payment account at its new tenant and make both guard
    /// reservations permanent. Failures here are logged, not fatal: the
    /// reservations stay held either way, so the 1:1 invariant holds.
    fn link_and_bind(&self, tenant: &Tenant, now: DateTime<Utc>) {
        match self.records.payment_accounts.get(&tenant.customer_ref) {
            Ok(Some(mut account)) => {
                account.link_tenant(tenant.id, now);
                let email = account.email.clone();
                if let Err(e) = self.records.payment_accounts.upsert(tenant.customer_ref.clone(), account) {
                    warn!(tenant_id = %tenant.id, error = %e, "failed to link payment account to tenant");
                }
                if let Err(e) = self.guard.bind_tenant(&SignupKey::Email(email), tenant.id) {
                    warn!(tenant_id = %tenant.id, error = %e, "failed to bind email reservation");
                }
            }
            Ok(None) => {
                warn!(
                    tenant_id = %tenant.id,
                    customer_ref = %tenant.customer_ref,
                    "no payment account found to link"
                );
            }
            Err(e) => {
                warn!(tenant_id = %tenant.id, error = %e, "payment account lookup failed during linking");
            }
        }
        if let Err(e) = self
            .guard
            .bind_tenant(&SignupKey::Customer(tenant.customer_ref.clone()), tenant.id)
        {
            warn!(tenant_id = %tenant.id, error = %e, "failed to bind customer reservation");
        }
    }

    /// Delete the identity account created in step (1). A compensation
    /// failure is logged; the original error still propagates.
    async fn compensate_identity(&self, account_id: gangway_core::AccountId) {
        error!(%account_id, "tenant creation failed after identity creation; deleting identity account");
        match tokio::time::timeout(self.call_timeout, self.directory.delete_account(account_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(%account_id, error = %e, "compensation failed: identity account not deleted"),
            Err(_) => error!(%account_id, "compensation timed out: identity account not deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gangway_billing::{PaymentAccount, PlanCatalog};
    use gangway_core::{CustomerRef, EmailAddress, FundingSourceRef};
    use gangway_infra::providers::InMemoryDirectory;
    use gangway_infra::reservations::InMemoryReservationStore;
    use gangway_tenancy::SubscriptionStatus;

    struct Fixture {
        directory: Arc<InMemoryDirectory>,
        records: Records,
        guard: IdempotencyGuard,
        provisioner: TenantProvisioner,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new(b"test-secret".to_vec()));
        let records = Records::in_memory();
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let provisioner = TenantProvisioner::new(
            directory.clone(),
            records.clone(),
            guard.clone(),
            Duration::from_secs(5),
        );
        Fixture {
            directory,
            records,
            guard,
            provisioner,
        }
    }

    fn test_owner() -> OwnerProfile {
        OwnerProfile {
            name: "Ada Lovelace".to_string(),
            email: EmailAddress::parse("owner@acme.test").unwrap(),
        }
    }

    fn test_company() -> CompanyProfile {
        CompanyProfile {
            name: "Acme Widgets".to_string(),
            industry: "manufacturing".to_string(),
            business_type: "llc".to_string(),
        }
    }

    fn test_billing() -> ProvisionedBilling {
        ProvisionedBilling {
            customer_ref: CustomerRef::new("cus_1").unwrap(),
            funding_source_ref: FundingSourceRef::new("fs_1").unwrap(),
            verification: VerificationStatus::Pending,
        }
    }

    fn standard_plan() -> Plan {
        PlanCatalog::default().find("standard").unwrap().clone()
    }

    #[tokio::test]
    async fn happy_path_creates_tenant_and_owner_membership() {
        let f = fixture();
        let billing = test_billing();
        f.records
            .payment_accounts
            .insert_if_absent(
                billing.customer_ref.clone(),
                PaymentAccount::new(
                    billing.customer_ref.clone(),
                    billing.funding_source_ref.clone(),
                    test_owner().email,
                    VerificationStatus::Pending,
                    Utc::now(),
                ),
            )
            .unwrap();

        let out = f
            .provisioner
            .create_tenant(
                &test_owner(),
                &PasswordDigest::from_plaintext("pw-123456"),
                &test_company(),
                &billing,
                &standard_plan(),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(out.tenant.subscription, SubscriptionStatus::Trial);
        assert_eq!(out.tenant.monthly_amount_cents, 4_900);
        let membership = out.membership.unwrap();
        assert_eq!(membership.tenant_id, out.tenant.id);

        // The payment account is linked and the customer slot bound.
        let account = f.records.payment_accounts.get(&billing.customer_ref).unwrap().unwrap();
        assert_eq!(account.tenant_id, Some(out.tenant.id));
        assert!(f
            .guard
            .has_tenant_for(&SignupKey::Customer(billing.customer_ref.clone()))
            .unwrap());
    }

    #[tokio::test]
    async fn identity_failure_leaves_nothing_behind() {
        let f = fixture();
        f.directory.fail_create_account(true);

        let err = f
            .provisioner
            .create_tenant(
                &test_owner(),
                &PasswordDigest::from_plaintext("pw-123456"),
                &test_company(),
                &test_billing(),
                &standard_plan(),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Identity(_)));
        assert!(f.records.tenants.list().unwrap().is_empty());
        assert!(!f.directory.has_account(&test_owner().email));
    }

    /// Tenant store that refuses every write.
    struct RejectingTenantStore;

    impl gangway_infra::records::KeyedStore<TenantId, Tenant> for RejectingTenantStore {
        fn get(&self, _key: &TenantId) -> Result<Option<Tenant>, StoreError> {
            Ok(None)
        }

        fn insert_if_absent(&self, _key: TenantId, _value: Tenant) -> Result<bool, StoreError> {
            Err(StoreError::backend("simulated tenant insert failure"))
        }

        fn upsert(&self, _key: TenantId, _value: Tenant) -> Result<(), StoreError> {
            Err(StoreError::backend("simulated tenant upsert failure"))
        }

        fn remove(&self, _key: &TenantId) -> Result<(), StoreError> {
            Ok(())
        }

        fn list(&self) -> Result<Vec<Tenant>, StoreError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn tenant_store_failure_compensates_the_identity_account() {
        let directory = Arc::new(InMemoryDirectory::new(b"test-secret".to_vec()));
        let mut records = Records::in_memory();
        records.tenants = Arc::new(RejectingTenantStore);
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let provisioner = TenantProvisioner::new(
            directory.clone(),
            records.clone(),
            guard,
            Duration::from_secs(5),
        );

        let err = provisioner
            .create_tenant(
                &test_owner(),
                &PasswordDigest::from_plaintext("pw-123456"),
                &test_company(),
                &test_billing(),
                &standard_plan(),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::TenantRecord(_)));
        // Compensation ran: the identity account is gone again.
        assert!(!directory.has_account(&test_owner().email));
    }

    /// Membership store that refuses every write.
    struct RejectingMembershipStore;

    impl gangway_infra::records::KeyedStore<gangway_core::MembershipId, Membership> for RejectingMembershipStore {
        fn get(&self, _key: &gangway_core::MembershipId) -> Result<Option<Membership>, StoreError> {
            Ok(None)
        }

        fn insert_if_absent(
            &self,
            _key: gangway_core::MembershipId,
            _value: Membership,
        ) -> Result<bool, StoreError> {
            Err(StoreError::backend("simulated membership insert failure"))
        }

        fn upsert(&self, _key: gangway_core::MembershipId, _value: Membership) -> Result<(), StoreError> {
            Err(StoreError::backend("simulated membership upsert failure"))
        }

        fn remove(&self, _key: &gangway_core::MembershipId) -> Result<(), StoreError> {
            Ok(())
        }

        fn list(&self) -> Result<Vec<Membership>, StoreError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn membership_failure_keeps_the_tenant_and_identity() {
        let directory = Arc::new(InMemoryDirectory::new(b"test-secret".to_vec()));
        let mut records = Records::in_memory();
        records.memberships = Arc::new(RejectingMembershipStore);
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let provisioner = TenantProvisioner::new(
            directory.clone(),
            records.clone(),
            guard,
            Duration::from_secs(5),
        );

        let out = provisioner
            .create_tenant(
                &test_owner(),
                &PasswordDigest::from_plaintext("pw-123456"),
                &test_company(),
                &test_billing(),
                &standard_plan(),
                Utc::now(),
            )
            .await
            .unwrap();

        // Tenant-without-membership is recoverable-and-kept.
        assert!(out.membership.is_none());
        assert_eq!(records.tenants.list().unwrap().len(), 1);
        assert!(directory.has_account(&test_owner().email));
    }
}
