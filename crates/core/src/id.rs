//! Strongly-typed identifiers and external references used across the domain.
//!
//! Locally-generated identifiers are UUIDv7 newtypes; references handed to us
//! by external collaborators (payment processor, event delivery) are opaque
//! string newtypes; we never parse or generate those ourselves.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a tenant (the durable company record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// Identifier of an owner membership row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(TenantId, "TenantId");
impl_uuid_newtype!(MembershipId, "MembershipId");

/// Identity-store account id for an owner principal.
///
/// The directory mints these; we treat them as opaque but they are UUID-shaped
/// in every directory we integrate with, so the newtype keeps UUID semantics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl_uuid_newtype!(AccountId, "AccountId");

/// External payment-processor customer reference (opaque, e.g. `cus_…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerRef(String);

/// External funding-source reference (opaque, e.g. `fs_…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundingSourceRef(String);

/// External event id carried on a webhook delivery (opaque, e.g. `evt_…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

macro_rules! impl_opaque_ref {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a reference received from the external collaborator.
            ///
            /// Fails on empty/blank input: an empty reference is always a bug
            /// in the caller or a malformed payload, never a real reference.
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::invalid_id(concat!($name, " must not be empty")));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_opaque_ref!(CustomerRef, "CustomerRef");
impl_opaque_ref!(FundingSourceRef, "FundingSourceRef");
impl_opaque_ref!(EventId, "EventId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_ref_rejects_blank() {
        assert!(CustomerRef::new("  ").is_err());
        assert!(CustomerRef::new("").is_err());
    }

    #[test]
    fn customer_ref_roundtrips_serde_transparently() {
        let r = CustomerRef::new("cus_123").unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"cus_123\"");
        let back: CustomerRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn tenant_id_parses_from_uuid_string() {
        let id = TenantId::new();
        let parsed: TenantId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn tenant_id_rejects_garbage() {
        let err = "not-a-uuid".parse::<TenantId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }
}
