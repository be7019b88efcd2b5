//! Pure signup validation.
//!
//! `validate` is a total function over the request: it checks every rule and
//! returns the **complete** list of violations, so a caller can render all
//! form errors at once. No I/O, no rule depends on another rule's order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gangway_billing::PlanCatalog;
use gangway_core::EmailAddress;

use crate::request::SignupRequest;

/// One violated rule, addressed to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path of the offending field, e.g. `bank.routing_number`.
    pub field: String,
    /// Stable machine-readable rule code, e.g. `routing_number_format`.
    pub code: String,
    /// Human-readable message suitable for form rendering.
    pub message: String,
}

impl Violation {
    fn new(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Validation failure carrying every violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signup request failed validation ({} rule(s) violated)", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

/// Check a signup request against all structural and business rules.
pub fn validate(request: &SignupRequest, plans: &PlanCatalog) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    check_present(&mut violations, "owner.name", &request.owner.name);
    if let Err(e) = EmailAddress::parse(&request.owner.email) {
        violations.push(Violation::new("owner.email", "email_format", e.to_string()));
    }
    if request.owner.password.chars().count() < 8 {
        violations.push(Violation::new(
            "owner.password",
            "password_length",
            "password must be at least 8 characters",
        ));
    }

    check_present(&mut violations, "company.name", &request.company.name);
    check_present(&mut violations, "company.industry", &request.company.industry);
    check_present(&mut violations, "company.business_type", &request.company.business_type);

    check_routing_number(&mut violations, &request.bank.routing_number);
    check_account_number(&mut violations, &request.bank.account_number);
    if request.bank.parsed_account_type().is_none() {
        violations.push(Violation::new(
            "bank.account_type",
            "account_type",
            "account type must be one of: checking, savings",
        ));
    }

    if plans.find(&request.plan).is_none() {
        violations.push(Violation::new(
            "plan",
            "unknown_plan",
            format!(
                "plan must be one of: {}",
                plans.codes().collect::<Vec<_>>().join(", ")
            ),
        ));
    }

    if !request.consent.terms_of_service {
        violations.push(Violation::new(
            "consent.terms_of_service",
            "consent_required",
            "terms of service must be accepted",
        ));
    }
    if !request.consent.payment_authorization {
        violations.push(Violation::new(
            "consent.payment_authorization",
            "consent_required",
            "payment authorization must be granted",
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

fn check_present(violations: &mut Vec<Violation>, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.push(Violation::new(field, "required", format!("{field} is required")));
    }
}

fn check_routing_number(violations: &mut Vec<Violation>, routing: &str) {
    if routing.len() != 9 || !routing.bytes().all(|b| b.is_ascii_digit()) {
        violations.push(Violation::new(
            "bank.routing_number",
            "routing_number_format",
            "routing number must be exactly 9 digits",
        ));
        return;
    }
    if !aba_checksum_ok(routing) {
        violations.push(Violation::new(
            "bank.routing_number",
            "routing_number_checksum",
            "routing number failed checksum validation",
        ));
    }
}

fn check_account_number(violations: &mut Vec<Violation>, account: &str) {
    let digits_ok = !account.is_empty() && account.bytes().all(|b| b.is_ascii_digit());
    if !digits_ok || account.len() < 4 || account.len() > 17 {
        violations.push(Violation::new(
            "bank.account_number",
            "account_number_format",
            "account number must be 4 to 17 digits",
        ));
    }
}

/// ABA routing checksum: 3(d1+d4+d7) + 7(d2+d5+d8) + (d3+d6+d9) ≡ 0 (mod 10).
///
/// Caller guarantees `routing` is exactly 9 ASCII digits.
fn aba_checksum_ok(routing: &str) -> bool {
    let d: Vec<u32> = routing.bytes().map(|b| u32::from(b - b'0')).collect();
    let sum = 3 * (d[0] + d[3] + d[6]) + 7 * (d[1] + d[4] + d[7]) + (d[2] + d[5] + d[8]);
    sum % 10 == 0
}
