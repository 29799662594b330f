use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Key-value storage for serialized token records.
///
/// Implementations only need per-key atomicity. Deleting a missing key is not
/// an error. Entries written with a `ttl` must read back as absent once it
/// has elapsed.
pub trait TokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, record: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: TokenStore + ?Sized> TokenStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, record: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        (**self).set(key, record, ttl)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

impl<T: TokenStore + ?Sized> TokenStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, record: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        (**self).set(key, record, ttl)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

/// A stored record plus its store-level expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Envelope {
    pub record: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Envelope {
    /// A TTL too large to represent never expires.
    pub fn new(record: &str, ttl: Option<Duration>) -> Self {
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        Self {
            record: record.to_string(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Utc::now() >= at)
    }
}

/// Keys become file names and keychain accounts, so keep them to a safe alphabet.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
