use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::response::AuthResponse;

/// Prefix applied to the raw access token to form the header value
pub const BEARER_PREFIX: &str = "Bearer ";

/// Naive ISO-8601 layout written by older tools, interpreted as local time
const NAIVE_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A bearer token and the instant it stops being usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    valid_until: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token from a broker response, ending `safety_margin` before the
    /// server-declared expiry.
    pub fn from_response(resp: &AuthResponse, safety_margin: Duration, now: DateTime<Utc>) -> Self {
        let lifetime = Duration::try_seconds(resp.expires_in)
            .unwrap_or(Duration::zero())
            .checked_sub(&safety_margin)
            .unwrap_or(Duration::zero());
        let valid_until = now.checked_add_signed(lifetime).unwrap_or(now);
        Self {
            value: format!("{}{}", BEARER_PREFIX, resp.access_token),
            valid_until,
        }
    }

    /// Full header value, including the `Bearer ` prefix
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_until
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Remaining lifetime, zero once expired
    pub fn time_until_expiry(&self) -> Duration {
        (self.valid_until - Utc::now()).max(Duration::zero())
    }

    pub fn to_cached(&self) -> CachedToken {
        CachedToken {
            value: self.value.clone(),
            valid_until: self.valid_until.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

/// Serialized form of a token as held in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub value: String,
    pub valid_until: String,
}

/// Why a stored record could not be turned back into a token.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty token value")]
    EmptyValue,

    #[error("invalid timestamp: {0:?}")]
    Timestamp(String),
}

impl CachedToken {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, RecordError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn into_token(self) -> Result<AccessToken, RecordError> {
        if self.value.is_empty() {
            return Err(RecordError::EmptyValue);
        }
        let valid_until = parse_timestamp(&self.valid_until)
            .ok_or_else(|| RecordError::Timestamp(self.valid_until.clone()))?;
        Ok(AccessToken {
            value: self.value,
            valid_until,
        })
    }
}

/// Parse an RFC 3339 timestamp, falling back to a naive local ISO-8601 one
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, NAIVE_ISO_FORMAT).ok()?;
    Some(resolve_local(&Local, &naive))
}

/// Pin a wall-clock time in `tz` to an instant.
///
/// Ambiguous times take the earlier instant. Times skipped by a DST jump
/// are shifted by the zone's offset at that moment instead of being rejected.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(ts) | LocalResult::Ambiguous(ts, _) => ts.with_timezone(&Utc),
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(naive).fix();
            let utc = *naive - Duration::seconds(i64::from(offset.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}
