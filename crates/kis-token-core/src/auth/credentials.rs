use std::fmt;

use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Joins appkey and appsecret in the digest input.
///
/// An appkey that itself contains `:` can collide with a different split of
/// the same bytes, e.g. `("a:b", "c")` and `("a", "b:c")`. Broker-issued keys
/// are alphanumeric, so this is left as-is.
const KEY_SEPARATOR: &str = ":";

/// The (appkey, appsecret) pair identifying which account a token belongs to.
///
/// Missing fields deserialize to empty strings, so two identities that both
/// lack the same field share a cache key.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CredentialIdentity {
    #[serde(default)]
    pub appkey: String,
    #[serde(default)]
    pub appsecret: String,
}

impl CredentialIdentity {
    pub fn new(appkey: impl Into<String>, appsecret: impl Into<String>) -> Self {
        Self {
            appkey: appkey.into(),
            appsecret: appsecret.into(),
        }
    }

    /// Cache key for this identity, see [`derive_cache_key`]
    pub fn cache_key(&self) -> String {
        derive_cache_key(self)
    }
}

// The secret must never reach logs.
impl fmt::Debug for CredentialIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialIdentity")
            .field("appkey", &self.appkey)
            .field("appsecret", &"<redacted>")
            .finish()
    }
}

/// Derive the store key for a credential identity
///
/// ```text
/// key = hex(SHA256(appkey ":" appsecret))
/// ```
///
/// Always 64 lowercase hex characters. The raw appkey never appears in the key.
pub fn derive_cache_key(identity: &CredentialIdentity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.appkey.as_bytes());
    hasher.update(KEY_SEPARATOR.as_bytes());
    hasher.update(identity.appsecret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short key prefix for log fields
pub(crate) fn short_key(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}
