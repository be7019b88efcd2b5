//! `gangway-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, external-reference newtypes, the shared domain
//! error model, and the email/credential value types every layer passes around.

pub mod credential;
pub mod email;
pub mod error;
pub mod id;

pub use credential::PasswordDigest;
pub use email::EmailAddress;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, CustomerRef, EventId, FundingSourceRef, MembershipId, TenantId};
