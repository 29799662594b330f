use serde::{de, Deserialize, Deserializer};

use crate::error::TokenError;

/// Payload returned by the broker's token endpoint.
///
/// The broker is loose about JSON types, so `access_token` accepts a string
/// or number and `expires_in` accepts an integer, float, or numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    #[serde(deserialize_with = "coerce_string")]
    pub access_token: String,
    #[serde(deserialize_with = "coerce_seconds")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Str(String),
}

fn coerce_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Str(s) => s,
        Loose::Int(i) => i.to_string(),
        Loose::Float(f) => f.to_string(),
    })
}

fn coerce_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Loose::deserialize(deserializer)? {
        Loose::Int(i) => Ok(i),
        Loose::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
        Loose::Float(f) => Err(de::Error::custom(format!("expires_in out of range: {}", f))),
        Loose::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("expires_in is not an integer: {:?}", s))),
    }
}

impl AuthResponse {
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in,
            token_type: None,
        }
    }

    /// Parse a raw token endpoint body
    pub fn from_json(body: &str) -> Result<Self, TokenError> {
        let resp: Self =
            serde_json::from_str(body).map_err(|e| TokenError::malformed(e, body))?;
        resp.validate()?;
        Ok(resp)
    }

    /// Reject responses that cannot produce a usable bearer token
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.access_token.trim().is_empty() {
            return Err(TokenError::MalformedResponse(
                "access_token is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_broker_payload() {
        let body = r#"{
            "access_token": "eyJ0eXAi",
            "access_token_token_expired": "2024-03-02 09:10:11",
            "token_type": "Bearer",
            "expires_in": 86400
        }"#;
        let resp = AuthResponse::from_json(body).unwrap();
        assert_eq!(resp.access_token, "eyJ0eXAi");
        assert_eq!(resp.expires_in, 86400);
        assert_eq!(resp.token_type.as_deref(), Some("Bearer"));
    }

    #[test]
    fn test_expires_in_coercion() {
        let from_str = AuthResponse::from_json(r#"{"access_token":"a","expires_in":" 3600 "}"#).unwrap();
        assert_eq!(from_str.expires_in, 3600);

        let from_float = AuthResponse::from_json(r#"{"access_token":"a","expires_in":3600.9}"#).unwrap();
        assert_eq!(from_float.expires_in, 3600);
    }

    #[test]
    fn test_access_token_coercion() {
        let resp = AuthResponse::from_json(r#"{"access_token":12345,"expires_in":60}"#).unwrap();
        assert_eq!(resp.access_token, "12345");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let err = AuthResponse::from_json(r#"{"expires_in":60}"#).unwrap_err();
        assert!(matches!(err, TokenError::MalformedResponse(_)));

        let err = AuthResponse::from_json(r#"{"access_token":"a"}"#).unwrap_err();
        assert!(matches!(err, TokenError::MalformedResponse(_)));
    }

    #[test]
    fn test_non_numeric_expires_in_is_malformed() {
        let err = AuthResponse::from_json(r#"{"access_token":"a","expires_in":"soon"}"#).unwrap_err();
        assert!(matches!(err, TokenError::MalformedResponse(_)));
    }

    #[test]
    fn test_empty_access_token_is_malformed() {
        let err = AuthResponse::from_json(r#"{"access_token":"  ","expires_in":60}"#).unwrap_err();
        assert!(matches!(err, TokenError::MalformedResponse(_)));
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(AuthResponse::from_json("<html>502</html>").is_err());
    }
}
