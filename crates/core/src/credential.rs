//! Password digest value type.
//!
//! The raw password goes straight to the identity directory and is never
//! persisted here. What *is* persisted (inside a deferred-signup snapshot)
//! is a SHA-256 digest, so that the webhook-driven tenant-creation path can
//! hand the directory the same credential material without the plaintext
//! ever touching a record store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 digest of a submitted password, hex-encoded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn from_plaintext(password: &str) -> Self {
        let digest = Sha256::digest(password.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// The digest never appears in debug/log output.
impl core::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_and_hex() {
        let a = PasswordDigest::from_plaintext("hunter2!");
        let b = PasswordDigest::from_plaintext("hunter2!");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_never_prints_the_digest() {
        let d = PasswordDigest::from_plaintext("hunter2!");
        assert_eq!(format!("{d:?}"), "PasswordDigest(..)");
    }
}
