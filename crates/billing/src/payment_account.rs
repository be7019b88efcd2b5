//! The payment account: our record of the processor-side billing relationship.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gangway_core::{CustomerRef, EmailAddress, FundingSourceRef, PasswordDigest, TenantId};

/// Bank-account verification lifecycle at the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
    Failed,
}

/// Snapshot of the signup data the deferred tenant-creation path replays.
///
/// Persisted on the payment account when the synchronous saga could not (or
/// did not) create the tenant; the funds-cleared webhook hands it back to the
/// tenant provisioner. The password survives only as a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupSnapshot {
    pub owner_name: String,
    pub email: EmailAddress,
    pub password_digest: PasswordDigest,
    pub company_name: String,
    pub industry: String,
    pub business_type: String,
    pub plan: String,
}

/// The billing relationship for one prospective tenant.
///
/// Created by the payment-account provisioner once both the external customer
/// and funding source exist; keyed by `customer_ref` with a uniqueness
/// constraint. At most one payment account exists per email prior to tenant
/// creation; `tenant_id` is set exactly once, when the tenant is provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub customer_ref: CustomerRef,
    pub funding_source_ref: FundingSourceRef,
    pub email: EmailAddress,
    pub verification: VerificationStatus,
    pub tenant_id: Option<TenantId>,
    pub pending_signup: Option<SignupSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAccount {
    pub fn new(
        customer_ref: CustomerRef,
        funding_source_ref: FundingSourceRef,
        email: EmailAddress,
        verification: VerificationStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_ref,
            funding_source_ref,
            email,
            verification,
            tenant_id: None,
            pending_signup: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the verification outcome reported by the processor.
    pub fn set_verification(&mut self, status: VerificationStatus, now: DateTime<Utc>) {
        self.verification = status;
        self.updated_at = now;
    }

    /// Link the account to its (newly created) tenant and drop the replay
    /// snapshot; the deferred-creation path has nothing left to do.
    pub fn link_tenant(&mut self, tenant_id: TenantId, now: DateTime<Utc>) {
        self.tenant_id = Some(tenant_id);
        self.pending_signup = None;
        self.updated_at = now;
    }

    /// Whether the funds-cleared safety net still needs to create a tenant.
    pub fn awaiting_tenant(&self) -> bool {
        self.tenant_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> PaymentAccount {
        PaymentAccount::new(
            CustomerRef::new("cus_1").unwrap(),
            FundingSourceRef::new("fs_1").unwrap(),
            EmailAddress::parse("owner@acme.test").unwrap(),
            VerificationStatus::Pending,
            Utc::now(),
        )
    }

    #[test]
    fn new_account_awaits_tenant() {
        let account = test_account();
        assert!(account.awaiting_tenant());
        assert_eq!(account.verification, VerificationStatus::Pending);
    }

    #[test]
    fn link_tenant_clears_the_snapshot() {
        let mut account = test_account();
        account.pending_signup = Some(SignupSnapshot {
            owner_name: "Ada".to_string(),
            email: account.email.clone(),
            password_digest: PasswordDigest::from_plaintext("pw-123456"),
            company_name: "Acme".to_string(),
            industry: "mfg".to_string(),
            business_type: "llc".to_string(),
            plan: "standard".to_string(),
        });

        let tenant_id = TenantId::new();
        account.link_tenant(tenant_id, Utc::now());

        assert_eq!(account.tenant_id, Some(tenant_id));
        assert!(account.pending_signup.is_none());
        assert!(!account.awaiting_tenant());
    }
}
