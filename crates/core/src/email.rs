//! Email address value type.
//!
//! The onboarding pipeline keys idempotency reservations on the submitted
//! email, so the same mailbox written two ways must normalize to one value.
//! Parsing lowercases and trims; equality is on the normalized form.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A syntactically valid, normalized (lowercased, trimmed) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an address.
    ///
    /// Accepts the standard shape: non-empty local part, exactly one `@`,
    /// a dotted domain, no whitespace anywhere. This is not a full RFC 5321
    /// grammar; the directory store is the final authority.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("email must not be empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email must not contain whitespace"));
        }

        let mut parts = trimmed.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(DomainError::validation("email must contain exactly one '@'"));
        }

        let dot_ok = domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
            && !domain.starts_with('.')
            && !domain.ends_with('.');
        if !dot_ok {
            return Err(DomainError::validation("email domain must contain a dot"));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EmailAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_surrounding_space() {
        let a = EmailAddress::parse("  Owner@Acme.Test ").unwrap();
        assert_eq!(a.as_str(), "owner@acme.test");
        assert_eq!(a, EmailAddress::parse("owner@acme.test").unwrap());
    }

    #[test]
    fn parse_rejects_malformed_addresses() {
        for bad in ["", "no-at-sign", "@acme.test", "owner@", "owner@acme", "a b@acme.test", "owner@@acme.test", "owner@.test"] {
            assert!(EmailAddress::parse(bad).is_err(), "accepted {bad:?}");
        }
    }
}
