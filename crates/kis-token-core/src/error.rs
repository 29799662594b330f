use thiserror::Error;

/// Failures raised by a [`TokenStore`](crate::cache::TokenStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Write to {0} was not persisted")]
    NotPersisted(String),
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed authentication response: {0}")]
    MalformedResponse(String),

    #[error("Failed to persist token: {0}")]
    Store(#[from] StoreError),
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 200;

impl TokenError {
    /// Build a `MalformedResponse` quoting a truncated copy of the offending body
    pub fn malformed(reason: impl std::fmt::Display, body: &str) -> Self {
        let quoted = if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        };
        TokenError::MalformedResponse(format!("{} in {}", reason, quoted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_keeps_short_body() {
        let err = TokenError::malformed("missing field", "{}");
        assert_eq!(
            err.to_string(),
            "Malformed authentication response: missing field in {}"
        );
    }

    #[test]
    fn test_malformed_truncates_long_body() {
        let body = "x".repeat(1000);
        let err = TokenError::malformed("bad", &body);
        let msg = err.to_string();
        assert!(msg.contains("truncated, 1000 total bytes"));
        assert!(msg.len() < 400);
    }
}
