//! Membership: links one identity account to one tenant with a role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gangway_core::{AccountId, MembershipId, TenantId};

/// Membership role. Onboarding only ever creates owners; further roles are
/// administered after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
}

/// Capability flags carried on a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub manage_billing: bool,
    pub manage_members: bool,
}

impl Capabilities {
    pub fn owner() -> Self {
        Self {
            manage_billing: true,
            manage_members: true,
        }
    }
}

/// One identity account's membership of one tenant.
///
/// Exactly one owner membership exists per tenant at creation time; it is
/// written in the same logical transaction as the tenant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub tenant_id: TenantId,
    pub account_id: AccountId,
    pub role: Role,
    pub capabilities: Capabilities,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn owner(tenant_id: TenantId, account_id: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            id: MembershipId::new(),
            tenant_id,
            account_id,
            role: Role::Owner,
            capabilities: Capabilities::owner(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_membership_carries_full_capabilities() {
        let m = Membership::owner(TenantId::new(), AccountId::new(), Utc::now());
        assert_eq!(m.role, Role::Owner);
        assert!(m.capabilities.manage_billing);
        assert!(m.capabilities.manage_members);
    }
}
