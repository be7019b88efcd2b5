//! `gangway-engine` — the onboarding saga and webhook-reconciliation engine.
//!
//! Two independently-triggered entry points feed the same tenant-creation
//! logic: the synchronous [`onboarding::OnboardingOrchestrator`] and the
//! asynchronous [`webhook::ReconciliationEngine`]. Both funnel through the
//! idempotency guard's atomic reserve, which is the single correctness-
//! critical primitive here: without it a provider redelivery or a race
//! between the two paths would mint two tenants for one billing relationship.

pub mod onboarding;
pub mod payment;
pub mod tenant;
pub mod webhook;

pub use onboarding::{OnboardError, OnboardingOrchestrator, SignupReceipt};
pub use payment::{PaymentProvisioner, PaymentProviderError, ProvisionedBilling};
pub use tenant::{ProvisionError, TenantProvisioned, TenantProvisioner};
pub use webhook::{ReconcileAck, ReconcileError, ReconciliationEngine, WebhookError};
