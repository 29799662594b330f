//! Token stores.
//!
//! `TokenStore` is the get/set/delete contract the token manager writes
//! through. Backends:
//! - `FileStore`: one JSON file per key in a cache directory
//! - `MemoryStore`: in-process map, mainly for tests and short-lived tools
//! - `KeyringStore`: the OS keychain

pub mod file;
pub mod keychain;
pub mod memory;
pub mod store;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;
pub use store::TokenStore;
