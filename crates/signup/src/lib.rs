//! `gangway-signup` — the signup request model and its pure validator.
//!
//! A [`request::SignupRequest`] is ephemeral input: constructed per HTTP call,
//! validated, decomposed by the orchestrator, then discarded. Nothing in this
//! crate performs I/O.

pub mod request;
pub mod validator;

pub use request::{AccountType, BankDetails, CompanyInfo, Consent, OwnerInfo, SignupRequest};
pub use validator::{validate, ValidationError, Violation};
