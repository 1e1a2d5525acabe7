//! The token envelope sealed by `SignedEncoder` and `PrivateEncoder`.
//!
//! A session value is wrapped as `{"v": 1, "exp": <unix seconds or null>, "data": <value>}`,
//! serialized to JSON and rendered as unpadded URL-safe base64. The encoders sign or encrypt
//! that text. [`decode_value`] rejects unknown versions and envelopes whose `exp` has passed,
//! so an expired token fails verification like a forged one.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use time::OffsetDateTime;

const VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to serialize session value: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("session token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("session token payload is malformed: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("unsupported session token version: {0}")]
    UnsupportedVersion(u8),

    #[error("session token expired at {0}")]
    Expired(i64),

    #[error("session token signature or ciphertext is invalid")]
    Seal,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T: ?Sized> {
    v: u8,
    exp: Option<i64>,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    v: u8,
    exp: Option<i64>,
    data: T,
}

/// Encode `value` into the token payload, optionally expiring at `expires_at`.
pub fn encode_value<T: Serialize + ?Sized>(
    value: &T,
    expires_at: Option<OffsetDateTime>,
) -> Result<String, FormatError> {
    let envelope = EnvelopeRef {
        v: VERSION,
        exp: expires_at.map(OffsetDateTime::unix_timestamp),
        data: value,
    };

    let bytes = serde_json::to_vec(&envelope).map_err(FormatError::Serialize)?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a token payload into a value, rejecting unknown versions and expired payloads.
pub fn decode_value<T: DeserializeOwned>(payload: &str) -> Result<T, FormatError> {
    let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes())?;

    let envelope: Envelope<T> =
        serde_json::from_slice(&bytes).map_err(FormatError::Deserialize)?;

    if envelope.v != VERSION {
        return Err(FormatError::UnsupportedVersion(envelope.v));
    }

    if let Some(exp) = envelope.exp
        && exp <= OffsetDateTime::now_utc().unix_timestamp()
    {
        return Err(FormatError::Expired(exp));
    }

    Ok(envelope.data)
}
