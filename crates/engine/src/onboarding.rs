//! The synchronous onboarding saga.
//!
//! validate → reserve email → provision payment account → persist it →
//! reserve customer → provision tenant → best-effort session artifact and
//! welcome notification. Fatal failures release the reservations they took,
//! so a corrected resubmission can succeed. The persisted payment account is
//! kept on tenant-step failure; the funds-cleared webhook is the safety net
//! that finishes the job.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

use gangway_billing::{PaymentAccount, PlanCatalog, SignupSnapshot};
use gangway_core::{AccountId, EmailAddress, PasswordDigest, TenantId};
use gangway_infra::providers::{
    BankAccount, IdentityDirectory, NotificationKind, Notifier, OwnerProfile,
};
use gangway_infra::records::{KeyedStore, Records, StoreError};
use gangway_infra::reservations::{IdempotencyGuard, SignupKey};
use gangway_signup::{validate, SignupRequest, ValidationError};
use gangway_tenancy::PaymentMethodStatus;

use crate::payment::{PaymentProvisioner, PaymentProviderError};
use crate::tenant::{ProvisionError, TenantProvisioner};

/// What the signup caller gets back on success.
#[derive(Debug, Clone)]
pub struct SignupReceipt {
    pub tenant_id: TenantId,
    pub owner_account_id: AccountId,
    pub trial_ends_on: NaiveDate,
    pub payment_method: PaymentMethodStatus,
    /// One-time session artifact; `None` when issuance failed (best-effort).
    pub login_token: Option<String>,
}

/// Onboarding failure, one variant per caller-visible outcome.
#[derive(Debug, Error)]
pub enum OnboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a registration already exists for this email")]
    DuplicateRegistration,

    #[error("payment setup failed, please try again")]
    PaymentProvider(#[source] PaymentProviderError),

    #[error("account setup failed, please try again")]
    Provision(#[source] ProvisionError),

    #[error("account setup failed, please try again")]
    Store(#[from] StoreError),
}

/// Composes the payment and tenant provisioners into the signup saga.
#[derive(Clone)]
pub struct OnboardingOrchestrator {
    plans: PlanCatalog,
    payment: PaymentProvisioner,
    tenants: TenantProvisioner,
    guard: IdempotencyGuard,
    records: Records,
    directory: Arc<dyn IdentityDirectory>,
    notifier: Arc<dyn Notifier>,
    call_timeout: Duration,
}

impl OnboardingOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plans: PlanCatalog,
        payment: PaymentProvisioner,
        tenants: TenantProvisioner,
        guard: IdempotencyGuard,
        records: Records,
        directory: Arc<dyn IdentityDirectory>,
        notifier: Arc<dyn Notifier>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            plans,
            payment,
            tenants,
            guard,
            records,
            directory,
            notifier,
            call_timeout,
        }
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }

    /// Run the full signup saga for one request.
    pub async fn onboard(
        &self,
        request: &SignupRequest,
        now: DateTime<Utc>,
    ) -> Result<SignupReceipt, OnboardError> {
        validate(request, &self.plans)?;

        // Validation guarantees both parse.
        let email = EmailAddress::parse(&request.owner.email)
            .map_err(|e| StoreError::backend(e.to_string()))?;
        let plan = self
            .plans
            .find(&request.plan)
            .ok_or_else(|| StoreError::backend("plan disappeared from catalog"))?
            .clone();

        let email_key = SignupKey::Email(email.clone());
        if !self.guard.reserve(&email_key)? {
            return Err(OnboardError::DuplicateRegistration);
        }

        let owner = OwnerProfile {
            name: request.owner.name.clone(),
            email: email.clone(),
        };
        let bank = BankAccount {
            routing_number: request.bank.routing_number.clone(),
            account_number: request.bank.account_number.clone(),
            account_type: request.bank.account_type.clone(),
        };

        let billing = match self.payment.provision(&owner, &bank).await {
            Ok(billing) => billing,
            Err(e) => {
                // Nothing durable exists yet; free the slot for a retry.
                self.release(&email_key);
                return Err(OnboardError::PaymentProvider(e));
            }
        };

        let password_digest = PasswordDigest::from_plaintext(&request.owner.password);
        let mut account = PaymentAccount::new(
            billing.customer_ref.clone(),
            billing.funding_source_ref.clone(),
            email.clone(),
            billing.verification,
            now,
        );
        // Snapshot for the deferred-creation safety net: if the tenant step
        // below fails, the funds-cleared webhook replays this.
        account.pending_signup = Some(SignupSnapshot {
            owner_name: owner.name.clone(),
            email: email.clone(),
            password_digest: password_digest.clone(),
            company_name: request.company.name.clone(),
            industry: request.company.industry.clone(),
            business_type: request.company.business_type.clone(),
            plan: plan.code.clone(),
        });

        if !self
            .records
            .payment_accounts
            .insert_if_absent(billing.customer_ref.clone(), account)?
        {
            // The processor handed out a reference we already know; treat it
            // as an already-bound registration.
            self.release(&email_key);
            return Err(OnboardError::DuplicateRegistration);
        }

        let customer_key = SignupKey::Customer(billing.customer_ref.clone());
        if !self.guard.reserve(&customer_key)? {
            // The webhook safety net won the race for this customer; the
            // synchronous path steps aside.
            return Err(OnboardError::DuplicateRegistration);
        }

        let company = gangway_tenancy::CompanyProfile {
            name: request.company.name.clone(),
            industry: request.company.industry.clone(),
            business_type: request.company.business_type.clone(),
        };

        let provisioned = match self
            .tenants
            .create_tenant(&owner, &password_digest, &company, &billing, &plan, now)
            .await
        {
            Ok(provisioned) => provisioned,
            Err(e) => {
                // The payment account row stays: the funds-cleared webhook
                // can still finish this signup from the snapshot.
                self.release(&customer_key);
                self.release(&email_key);
                return Err(OnboardError::Provision(e));
            }
        };

        let login_token = self.issue_login_token(&email).await;
        self.send_welcome(&email, &provisioned.tenant.plan, provisioned.tenant.trial_ends_on)
            .await;

        info!(
            tenant_id = %provisioned.tenant.id,
            customer_ref = %provisioned.tenant.customer_ref,
            "onboarding completed"
        );

        Ok(SignupReceipt {
            tenant_id: provisioned.tenant.id,
            owner_account_id: provisioned.tenant.owner_account_id,
            trial_ends_on: provisioned.tenant.trial_ends_on,
            payment_method: provisioned.tenant.payment_method,
            login_token,
        })
    }

    fn release(&self, key: &SignupKey) {
        if let Err(e) = self.guard.release(key) {
            warn!(%key, error = %e, "failed to release reservation after aborted saga");
        }
    }

    /// Best-effort: a failed or timed-out issuance never fails the saga.
    async fn issue_login_token(&self, email: &EmailAddress) -> Option<String> {
        match tokio::time::timeout(self.call_timeout, self.directory.issue_login_token(email)).await {
            Ok(Ok(token)) => Some(token),
            Ok(Err(e)) => {
                warn!(error = %e, "login token issuance failed; onboarding still succeeds");
                None
            }
            Err(_) => {
                warn!("login token issuance timed out; onboarding still succeeds");
                None
            }
        }
    }

    /// Best-effort welcome notification.
    async fn send_welcome(&self, email: &EmailAddress, plan: &str, trial_ends_on: NaiveDate) {
        let variables = serde_json::json!({
            "plan": plan,
            "trial_ends_on": trial_ends_on,
        });
        match tokio::time::timeout(
            self.call_timeout,
            self.notifier.send(email, NotificationKind::Welcome, &variables),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "welcome notification failed; onboarding still succeeds"),
            Err(_) => warn!("welcome notification timed out; onboarding still succeeds"),
        }
    }
}
