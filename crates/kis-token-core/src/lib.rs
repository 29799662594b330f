//! kis-token-core - cached access tokens for the brokerage REST API.
//!
//! A token is obtained once from the broker's token endpoint and reused
//! across process restarts until shortly before it expires:
//!
//! ```no_run
//! use kis_token_core::{AuthResponse, CredentialIdentity, TokenCacheConfig, TokenManager};
//!
//! # fn main() -> anyhow::Result<()> {
//! let identity = CredentialIdentity::new("appkey", "appsecret");
//! let mut tokens = TokenManager::open(&TokenCacheConfig::load()?)?;
//!
//! if !tokens.load_from_cache(&identity) {
//!     let body = r#"{"access_token": "eyJ0...", "expires_in": 86400}"#; // from the token endpoint
//!     tokens.create(&AuthResponse::from_json(body)?, Some(&identity))?;
//! }
//! assert!(tokens.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;

pub use auth::{derive_cache_key, AccessToken, AuthResponse, CredentialIdentity, TokenManager};
pub use cache::{FileStore, KeyringStore, MemoryStore, TokenStore};
pub use config::TokenCacheConfig;
pub use error::{StoreError, TokenError};
