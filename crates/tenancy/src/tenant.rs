//! The tenant aggregate: one durable company record per successful onboarding.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use gangway_billing::plan::{trial_window, Plan};
use gangway_core::{AccountId, CustomerRef, FundingSourceRef, TenantId};

/// Failed payments tolerated before the subscription is cancelled.
pub const DUNNING_CUTOFF: u32 = 3;

/// Subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Cancelled,
}

impl SubscriptionStatus {
    /// Parse the wire form used by subscription-lifecycle events.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trial" => Some(Self::Trial),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Payment-method status as reflected by verification/payment events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodStatus {
    Pending,
    Active,
    Inactive,
}

/// Company profile fields carried on the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub industry: String,
    pub business_type: String,
}

/// The durable company/organization record.
///
/// Created exactly once per onboarding; the 1:1 mapping between
/// `customer_ref` and tenant is enforced upstream by the idempotency guard.
/// Billing webhooks mutate it for the rest of its life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub company: CompanyProfile,
    pub owner_account_id: AccountId,
    pub subscription: SubscriptionStatus,
    pub plan: String,
    pub monthly_amount_cents: i64,
    pub trial_ends_on: NaiveDate,
    pub next_billing_date: NaiveDate,
    pub customer_ref: CustomerRef,
    pub funding_source_ref: FundingSourceRef,
    pub payment_method: PaymentMethodStatus,
    pub failed_payment_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Build a fresh trial tenant: 30-day trial, first bill the day after.
    #[allow(clippy::too_many_arguments)]
    pub fn new_trial(
        id: TenantId,
        company: CompanyProfile,
        owner_account_id: AccountId,
        plan: &Plan,
        customer_ref: CustomerRef,
        funding_source_ref: FundingSourceRef,
        payment_method: PaymentMethodStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let (trial_ends_on, next_billing_date) = trial_window(now.date_naive());
        Self {
            id,
            company,
            owner_account_id,
            subscription: SubscriptionStatus::Trial,
            plan: plan.code.clone(),
            monthly_amount_cents: plan.monthly_amount_cents,
            trial_ends_on,
            next_billing_date,
            customer_ref,
            funding_source_ref,
            payment_method,
            failed_payment_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a cleared payment: the subscription is (back) in good standing
    /// and the next bill moves out a month.
    pub fn record_payment_cleared(&mut self, now: DateTime<Utc>) {
        self.subscription = SubscriptionStatus::Active;
        self.payment_method = PaymentMethodStatus::Active;
        self.failed_payment_count = 0;
        self.next_billing_date = self
            .next_billing_date
            .checked_add_months(Months::new(1))
            .unwrap_or(self.next_billing_date);
        self.updated_at = now;
    }

    /// Apply a failed payment; past the dunning cutoff the subscription is
    /// cancelled rather than left past-due forever.
    pub fn record_payment_failed(&mut self, now: DateTime<Utc>) {
        self.failed_payment_count += 1;
        self.payment_method = PaymentMethodStatus::Inactive;
        self.subscription = if self.failed_payment_count >= DUNNING_CUTOFF {
            SubscriptionStatus::Cancelled
        } else {
            SubscriptionStatus::PastDue
        };
        self.updated_at = now;
    }

    /// Apply a verification outcome to the payment-method status.
    pub fn record_verification(&mut self, verified: bool, now: DateTime<Utc>) {
        self.payment_method = if verified {
            PaymentMethodStatus::Active
        } else {
            PaymentMethodStatus::Inactive
        };
        self.updated_at = now;
    }

    /// Apply a provider-reported subscription status directly.
    pub fn set_subscription(&mut self, status: SubscriptionStatus, now: DateTime<Utc>) {
        self.subscription = status;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gangway_billing::PlanCatalog;

    fn test_tenant() -> Tenant {
        let catalog = PlanCatalog::default();
        let plan = catalog.find("standard").unwrap();
        Tenant::new_trial(
            TenantId::new(),
            CompanyProfile {
                name: "Acme Widgets".to_string(),
                industry: "manufacturing".to_string(),
                business_type: "llc".to_string(),
            },
            AccountId::new(),
            plan,
            CustomerRef::new("cus_1").unwrap(),
            FundingSourceRef::new("fs_1").unwrap(),
            PaymentMethodStatus::Pending,
            Utc::now(),
        )
    }

    #[test]
    fn new_trial_tenant_has_thirty_day_window_and_tier_price() {
        let now = Utc::now();
        let tenant = test_tenant();

        assert_eq!(tenant.subscription, SubscriptionStatus::Trial);
        assert_eq!(tenant.monthly_amount_cents, 4_900);
        assert_eq!(tenant.trial_ends_on, now.date_naive() + chrono::Days::new(30));
        assert_eq!(tenant.next_billing_date, tenant.trial_ends_on + chrono::Days::new(1));
        assert_eq!(tenant.failed_payment_count, 0);
    }

    #[test]
    fn cleared_payment_resets_dunning_and_advances_billing() {
        let mut tenant = test_tenant();
        tenant.record_payment_failed(Utc::now());
        let before = tenant.next_billing_date;

        tenant.record_payment_cleared(Utc::now());

        assert_eq!(tenant.subscription, SubscriptionStatus::Active);
        assert_eq!(tenant.payment_method, PaymentMethodStatus::Active);
        assert_eq!(tenant.failed_payment_count, 0);
        assert_eq!(tenant.next_billing_date, before.checked_add_months(Months::new(1)).unwrap());
    }

    #[test]
    fn third_failed_payment_cancels_the_subscription() {
        let mut tenant = test_tenant();

        tenant.record_payment_failed(Utc::now());
        assert_eq!(tenant.subscription, SubscriptionStatus::PastDue);
        tenant.record_payment_failed(Utc::now());
        assert_eq!(tenant.subscription, SubscriptionStatus::PastDue);
        tenant.record_payment_failed(Utc::now());
        assert_eq!(tenant.subscription, SubscriptionStatus::Cancelled);
        assert_eq!(tenant.payment_method, PaymentMethodStatus::Inactive);
    }

    #[test]
    fn subscription_status_parses_wire_forms() {
        assert_eq!(SubscriptionStatus::parse("past_due"), Some(SubscriptionStatus::PastDue));
        assert_eq!(SubscriptionStatus::parse("gold"), None);
    }
}
