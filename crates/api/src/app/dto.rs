//! Request/response DTOs and JSON mapping helpers.

use serde::{Deserialize, Serialize};
use serde_json::json;

use gangway_billing::Plan;
use gangway_engine::{ReconcileAck, SignupReceipt};
use gangway_signup::request::{BankDetails, CompanyInfo, Consent, OwnerInfo};
use gangway_signup::SignupRequest;

// -------------------------
// Request DTOs
// -------------------------

/// The signup body as delivered by the registration form.
#[derive(Debug, Deserialize)]
pub struct SignupBody {
    pub owner: OwnerInfo,
    pub company: CompanyInfo,
    pub bank: BankDetails,
    pub plan: String,
    pub consent: Consent,
}

impl From<SignupBody> for SignupRequest {
    fn from(body: SignupBody) -> Self {
        SignupRequest {
            owner: body.owner,
            company: body.company,
            bank: body.bank,
            plan: body.plan,
            consent: body.consent,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub tenant_id: String,
    pub owner_id: String,
    pub trial_end_date: String,
    pub payment_method_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_token: Option<String>,
}

impl From<SignupReceipt> for SignupResponse {
    fn from(receipt: SignupReceipt) -> Self {
        SignupResponse {
            success: true,
            tenant_id: receipt.tenant_id.to_string(),
            owner_id: receipt.owner_account_id.to_string(),
            trial_end_date: receipt.trial_ends_on.to_string(),
            payment_method_status: payment_method_str(receipt.payment_method).to_string(),
            login_token: receipt.login_token,
        }
    }
}

fn payment_method_str(status: gangway_tenancy::PaymentMethodStatus) -> &'static str {
    match status {
        gangway_tenancy::PaymentMethodStatus::Pending => "pending",
        gangway_tenancy::PaymentMethodStatus::Active => "active",
        gangway_tenancy::PaymentMethodStatus::Inactive => "inactive",
    }
}

/// Webhook acknowledgment body; always 2xx once authenticity passed.
pub fn ack_to_json(ack: ReconcileAck) -> serde_json::Value {
    let status = match ack {
        ReconcileAck::Applied => "applied",
        ReconcileAck::Duplicate => "duplicate",
        ReconcileAck::Ignored => "ignored",
        ReconcileAck::TenantCreated => "tenant_created",
        ReconcileAck::Accepted => "accepted",
    };
    json!({ "received": true, "status": status })
}

pub fn plan_to_json(plan: &Plan) -> serde_json::Value {
    json!({
        "code": plan.code,
        "display_name": plan.display_name,
        "monthly_amount_cents": plan.monthly_amount_cents,
        "trial_days": gangway_billing::plan::TRIAL_DAYS,
    })
}
