use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::credentials::{derive_cache_key, short_key, CredentialIdentity};
use super::response::AuthResponse;
use super::token::{AccessToken, CachedToken};
use crate::cache::{FileStore, TokenStore};
use crate::config::{TokenCacheConfig, DEFAULT_CACHE_EXPIRE_SECS, DEFAULT_SAFETY_MARGIN_SECS};
use crate::error::{StoreError, TokenError};

/// Holds the current access token and writes it through to a [`TokenStore`].
///
/// Typical flow: [`load_from_cache`](Self::load_from_cache) at startup, check
/// [`is_valid`](Self::is_valid) before each request, and on `false` call the
/// token endpoint and hand the response to [`create`](Self::create).
pub struct TokenManager<S> {
    store: S,
    token: Option<AccessToken>,
    safety_margin: Duration,
    cache_ttl: Option<StdDuration>,
}

impl TokenManager<FileStore> {
    /// Manager over a file store in the configured cache directory
    pub fn open(config: &TokenCacheConfig) -> anyhow::Result<Self> {
        let dir = config.cache_dir()?;
        let store = FileStore::new(&dir)
            .with_context(|| format!("Failed to open token cache at {}", dir.display()))?;
        Ok(Self::with_config(store, config))
    }
}

impl<S: TokenStore> TokenManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            token: None,
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
            cache_ttl: Some(StdDuration::from_secs(DEFAULT_CACHE_EXPIRE_SECS)),
        }
    }

    pub fn with_config(store: S, config: &TokenCacheConfig) -> Self {
        Self::new(store)
            .with_safety_margin(config.safety_margin())
            .with_cache_ttl(config.cache_ttl())
    }

    /// Negative margins are clamped to zero
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin.max(Duration::zero());
        self
    }

    /// Store-level lifetime for written entries; `None` keeps them until deleted
    pub fn with_cache_ttl(mut self, ttl: Option<StdDuration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Replace the current token with one built from `resp`.
    ///
    /// With an identity, the token is also written to the store. If that
    /// write fails the in-memory token is still set and the error is returned.
    pub fn create(
        &mut self,
        resp: &AuthResponse,
        identity: Option<&CredentialIdentity>,
    ) -> Result<(), TokenError> {
        resp.validate()?;
        let token = AccessToken::from_response(resp, self.safety_margin, Utc::now());
        let cached = token.to_cached();
        self.token = Some(token);
        debug!(valid_until = %cached.valid_until, "Access token created");

        let Some(identity) = identity else {
            return Ok(());
        };
        let key = derive_cache_key(identity);
        let record = cached.to_json().map_err(StoreError::from)?;
        if let Err(e) = self.store.set(&key, &record, self.cache_ttl) {
            warn!(key = %short_key(&key), error = %e, "Failed to cache access token");
            return Err(e.into());
        }
        info!(key = %short_key(&key), "Access token cached");
        Ok(())
    }

    /// Restore the token cached for `identity`.
    ///
    /// Returns `true` only if a valid, unexpired token was found. Corrupted or
    /// expired entries are deleted. Whenever this returns `false` the manager
    /// holds no token.
    pub fn load_from_cache(&mut self, identity: &CredentialIdentity) -> bool {
        self.token = None;
        let key = derive_cache_key(identity);

        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %short_key(&key), "No cached access token");
                return false;
            }
            Err(e) => {
                warn!(key = %short_key(&key), error = %e, "Failed to read token cache, treating as miss");
                return false;
            }
        };

        let token = match CachedToken::from_json(&raw).and_then(CachedToken::into_token) {
            Ok(token) => token,
            Err(e) => {
                warn!(key = %short_key(&key), error = %e, "Discarding corrupted cached token");
                self.discard(&key);
                return false;
            }
        };

        if !token.is_valid() {
            debug!(key = %short_key(&key), valid_until = %token.valid_until(), "Cached access token expired");
            self.discard(&key);
            return false;
        }

        info!(key = %short_key(&key), valid_until = %token.valid_until(), "Loaded access token from cache");
        self.token = Some(token);
        true
    }

    /// Forget the current token and delete the cached entry for `identity`
    pub fn invalidate(&mut self, identity: &CredentialIdentity) -> Result<(), TokenError> {
        self.token = None;
        let key = derive_cache_key(identity);
        self.store.delete(&key)?;
        info!(key = %short_key(&key), "Access token invalidated");
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.token.as_ref().is_some_and(AccessToken::is_valid)
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Header value, e.g. `Bearer eyJ0...`
    pub fn value(&self) -> Option<&str> {
        self.token.as_ref().map(AccessToken::value)
    }

    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.token.as_ref().map(AccessToken::valid_until)
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.token.as_ref().map(AccessToken::time_until_expiry)
    }

    /// True when there is no token or it expires within `buffer`
    pub fn needs_refresh(&self, buffer: Duration) -> bool {
        self.time_until_expiry().map_or(true, |left| left <= buffer)
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.store.delete(key) {
            warn!(key = %short_key(key), error = %e, "Failed to delete cached token");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
