use std::time::Duration;

use keyring::Entry;
use tracing::warn;

use super::store::{validate_key, Envelope, TokenStore};
use crate::error::StoreError;

/// Default keychain service name
pub const DEFAULT_SERVICE_NAME: &str = "kis-token";

/// Store backed by the OS keychain, one credential per key.
///
/// The keychain has no expiry of its own, so records are wrapped in the same
/// envelope the file store uses. Every write is read back through a fresh
/// entry; a keychain that accepts writes without keeping them is an error.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        validate_key(key)?;
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl TokenStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entry = self.entry(key)?;
        let secret = match entry.get_password() {
            Ok(secret) => secret,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Envelope>(&secret) {
            Ok(envelope) if envelope.is_expired() => {
                self.delete(key)?;
                Ok(None)
            }
            Ok(envelope) => Ok(Some(envelope.record)),
            Err(e) => {
                warn!(service = %self.service, error = %e, "Discarding unreadable keychain entry");
                self.delete(key)?;
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, record: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let secret = serde_json::to_string(&Envelope::new(record, ttl))?;
        self.entry(key)?.set_password(&secret)?;
        match self.entry(key)?.get_password() {
            Ok(stored) if stored == secret => Ok(()),
            Ok(_) | Err(keyring::Error::NoEntry) => {
                Err(StoreError::NotPersisted(format!("keychain service {}", self.service)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        assert_eq!(KeyringStore::default().service(), DEFAULT_SERVICE_NAME);
    }

    /// Skips itself where no keychain is reachable (headless CI, sandboxed containers)
    #[test]
    fn test_keychain_round_trip() {
        let store = KeyringStore::new("kis-token-test");
        let key = format!("roundtrip_{:016x}", rand::random::<u64>());

        if let Err(e) = store.set(&key, "record", None) {
            eprintln!("skipping keychain round trip: {}", e);
            return;
        }
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("record"));

        store.set(&key, "replaced", Some(Duration::from_secs(60))).unwrap();
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("replaced"));

        store.delete(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        store.delete(&key).unwrap();
    }

    #[test]
    fn test_lapsed_ttl_reads_as_absent() {
        let store = KeyringStore::new("kis-token-test");
        let key = format!("ttl_{:016x}", rand::random::<u64>());

        if let Err(e) = store.set(&key, "record", Some(Duration::ZERO)) {
            eprintln!("skipping keychain ttl check: {}", e);
            return;
        }
        assert_eq!(store.get(&key).unwrap(), None);
        store.delete(&key).unwrap();
    }

    #[test]
    fn test_invalid_key_rejected_before_keychain() {
        let store = KeyringStore::new("kis-token-test");
        assert!(matches!(store.get("no/slashes"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.delete(""), Err(StoreError::InvalidKey(_))));
    }
}
