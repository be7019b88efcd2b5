//! The ephemeral signup request submitted by a prospective business owner.

use serde::{Deserialize, Serialize};

/// Owner identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInfo {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Company/tenant fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub industry: String,
    pub business_type: String,
}

/// Bank account type accepted for funding sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
}

impl core::fmt::Display for AccountType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Checking => f.write_str("checking"),
            Self::Savings => f.write_str("savings"),
        }
    }
}

/// Bank funding-source fields.
///
/// `account_type` is a raw string here (not [`AccountType`]) so that the
/// validator can report an unknown value as one violation among many instead
/// of the whole request failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub routing_number: String,
    pub account_number: String,
    pub account_type: String,
}

impl BankDetails {
    /// The parsed account type, once validation has passed.
    pub fn parsed_account_type(&self) -> Option<AccountType> {
        match self.account_type.to_ascii_lowercase().as_str() {
            "checking" => Some(AccountType::Checking),
            "savings" => Some(AccountType::Savings),
            _ => None,
        }
    }
}

/// Consent checkboxes; both must be ticked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    pub terms_of_service: bool,
    pub payment_authorization: bool,
}

/// The full signup submission. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub owner: OwnerInfo,
    pub company: CompanyInfo,
    pub bank: BankDetails,
    pub plan: String,
    pub consent: Consent,
}
