//! Access token lifecycle.
//!
//! This module provides:
//! - `TokenManager`: holds the current bearer token and writes it through to a store
//! - `CredentialIdentity`: the (appkey, appsecret) pair a cached token belongs to
//! - `AuthResponse`: the broker's token endpoint payload
//!
//! Tokens stop being valid 60 seconds before the broker says they expire.

pub mod credentials;
pub mod manager;
pub mod response;
pub mod token;

pub use credentials::{derive_cache_key, CredentialIdentity};
pub use manager::TokenManager;
pub use response::AuthResponse;
pub use token::{AccessToken, CachedToken, RecordError, BEARER_PREFIX};
