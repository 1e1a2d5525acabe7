use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

/// Turns a session value into a tamper-evident text token.
pub trait Marshaler: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Self::Error>;
}

/// Verifies a token and recovers the value it carries.
///
/// Failure means the token is forged, corrupt, expired or of the wrong shape.
pub trait Unmarshaler: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn unmarshal<T: DeserializeOwned>(&self, token: &str) -> Result<T, Self::Error>;
}

impl<M: Marshaler> Marshaler for &M {
    type Error = M::Error;

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Self::Error> {
        (**self).marshal(value)
    }
}

impl<M: Marshaler> Marshaler for Arc<M> {
    type Error = M::Error;

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Self::Error> {
        (**self).marshal(value)
    }
}

impl<U: Unmarshaler> Unmarshaler for &U {
    type Error = U::Error;

    fn unmarshal<T: DeserializeOwned>(&self, token: &str) -> Result<T, Self::Error> {
        (**self).unmarshal(token)
    }
}

impl<U: Unmarshaler> Unmarshaler for Arc<U> {
    type Error = U::Error;

    fn unmarshal<T: DeserializeOwned>(&self, token: &str) -> Result<T, Self::Error> {
        (**self).unmarshal(token)
    }
}

#[cfg(any(feature = "signed", feature = "private"))]
const SEAL_NAME: &str = "session";

#[cfg(any(feature = "signed", feature = "private"))]
fn expires_at(ttl: Option<time::Duration>) -> Option<time::OffsetDateTime> {
    ttl.map(|ttl| time::OffsetDateTime::now_utc() + ttl)
}

/// Signs tokens with HMAC-SHA256. Token contents are readable by the client.
#[cfg(feature = "signed")]
#[derive(Debug, Clone)]
pub struct SignedEncoder {
    key: crate::Key,
    ttl: Option<time::Duration>,
}

#[cfg(feature = "signed")]
impl SignedEncoder {
    pub fn new(key: crate::Key) -> Self {
        Self { key, ttl: None }
    }

    /// Embed an expiry in every token; expired tokens fail to unmarshal.
    #[must_use]
    pub fn with_ttl(mut self, ttl: time::Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[cfg(feature = "signed")]
impl Marshaler for SignedEncoder {
    type Error = crate::format::FormatError;

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Self::Error> {
        let payload = crate::format::encode_value(value, expires_at(self.ttl))?;

        let mut jar = tower_cookies::cookie::CookieJar::new();
        jar.signed_mut(&self.key)
            .add(tower_cookies::Cookie::new(SEAL_NAME, payload));
        jar.get(SEAL_NAME)
            .map(|cookie| cookie.value().to_owned())
            .ok_or(crate::format::FormatError::Seal)
    }
}

#[cfg(feature = "signed")]
impl Unmarshaler for SignedEncoder {
    type Error = crate::format::FormatError;

    fn unmarshal<T: DeserializeOwned>(&self, token: &str) -> Result<T, Self::Error> {
        let mut jar = tower_cookies::cookie::CookieJar::new();
        jar.add_original(tower_cookies::Cookie::new(SEAL_NAME, token.to_owned()));
        let payload = jar
            .signed(&self.key)
            .get(SEAL_NAME)
            .ok_or(crate::format::FormatError::Seal)?;
        crate::format::decode_value(payload.value())
    }
}

/// Encrypts and authenticates tokens with AES-256-GCM. Token contents are opaque to the client.
#[cfg(feature = "private")]
#[derive(Debug, Clone)]
pub struct PrivateEncoder {
    key: crate::Key,
    ttl: Option<time::Duration>,
}

#[cfg(feature = "private")]
impl PrivateEncoder {
    pub fn new(key: crate::Key) -> Self {
        Self { key, ttl: None }
    }

    /// Embed an expiry in every token; expired tokens fail to unmarshal.
    #[must_use]
    pub fn with_ttl(mut self, ttl: time::Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[cfg(feature = "private")]
impl Marshaler for PrivateEncoder {
    type Error = crate::format::FormatError;

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Self::Error> {
        let payload = crate::format::encode_value(value, expires_at(self.ttl))?;

        let mut jar = tower_cookies::cookie::CookieJar::new();
        jar.private_mut(&self.key)
            .add(tower_cookies::Cookie::new(SEAL_NAME, payload));
        jar.get(SEAL_NAME)
            .map(|cookie| cookie.value().to_owned())
            .ok_or(crate::format::FormatError::Seal)
    }
}

#[cfg(feature = "private")]
impl Unmarshaler for PrivateEncoder {
    type Error = crate::format::FormatError;

    fn unmarshal<T: DeserializeOwned>(&self, token: &str) -> Result<T, Self::Error> {
        let mut jar = tower_cookies::cookie::CookieJar::new();
        jar.add_original(tower_cookies::Cookie::new(SEAL_NAME, token.to_owned()));
        let payload = jar
            .private(&self.key)
            .get(SEAL_NAME)
            .ok_or(crate::format::FormatError::Seal)?;
        crate::format::decode_value(payload.value())
    }
}
