//! `gangway-tenancy` — the durable company record and its owner membership:
//! subscription lifecycle, payment-method status, trial policy, dunning.

pub mod membership;
pub mod tenant;

pub use membership::{Capabilities, Membership, Role};
pub use tenant::{CompanyProfile, PaymentMethodStatus, SubscriptionStatus, Tenant, DUNNING_CUTOFF};
