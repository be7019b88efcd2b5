//! `gangway-billing` — the billing relationship with the external payment
//! processor: payment accounts, the plan catalog, the inbound event model
//! and the webhook signature scheme.

pub mod event;
pub mod payment_account;
pub mod plan;
pub mod signature;

pub use event::{EventCategory, EventOutcome, ProcessorEvent, WebhookEvent};
pub use payment_account::{PaymentAccount, SignupSnapshot, VerificationStatus};
pub use plan::{Plan, PlanCatalog};
pub use signature::{sign, verify, SignatureError};
