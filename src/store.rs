use std::{borrow::Cow, fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use http::{HeaderMap, HeaderValue, header};
use serde::{Serialize, de::IgnoredAny};
use time::OffsetDateTime;
use tower_cookies::Cookie;

use crate::{
    chunk,
    config::OptionsSource,
    encoder::{Marshaler, Unmarshaler},
    error::{Error, Result},
};

/// A value to persist in the session cookie.
///
/// Only [`SessionValue::Typed`] goes through the encoder and can be verified on load. Raw text is
/// stored verbatim and raw bytes as unpadded URL-safe base64; neither is signed.
pub enum SessionValue<'a, T: ?Sized = ()> {
    RawText(&'a str),
    /// Stored as unpadded URL-safe base64, since a cookie value must be text.
    RawBytes(&'a [u8]),
    Typed(&'a T),
}

impl<'a> SessionValue<'a> {
    pub fn text(text: &'a str) -> Self {
        Self::RawText(text)
    }

    pub fn bytes(bytes: &'a [u8]) -> Self {
        Self::RawBytes(bytes)
    }
}

impl<'a, T: ?Sized> SessionValue<'a, T> {
    pub fn typed(value: &'a T) -> Self {
        Self::Typed(value)
    }
}

/// Reads, writes and clears a session token kept in the client's cookies.
///
/// The store keeps no state between calls; share one instance (for example behind an `Arc`)
/// across all request handlers.
pub struct CookieStore<E> {
    options: Arc<dyn OptionsSource>,
    encoder: Option<E>,
}

impl<E> CookieStore<E>
where
    E: Marshaler + Unmarshaler,
{
    /// Build a store. Fails with [`Error::MissingDependency`] when `encoder` is `None`.
    pub fn new(options: Arc<dyn OptionsSource>, encoder: Option<E>) -> Result<Self> {
        let encoder = encoder.ok_or(Error::MissingDependency)?;
        Ok(Self {
            options,
            encoder: Some(encoder),
        })
    }

    /// Write `value` into `response` as one or more `Set-Cookie` headers.
    ///
    /// `request` is consulted for chunk cookies left over from a longer session, which are
    /// expired so they cannot be joined onto the new token. Nothing is written on error.
    pub fn save_session<T>(
        &self,
        response: &mut HeaderMap,
        request: &HeaderMap,
        value: SessionValue<'_, T>,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let options = self.options.current();
        options.validate()?;

        let token = match value {
            SessionValue::RawText(text) => Cow::Borrowed(text),
            SessionValue::RawBytes(bytes) => Cow::Owned(URL_SAFE_NO_PAD.encode(bytes)),
            SessionValue::Typed(value) => {
                let encoder = self.encoder.as_ref().ok_or(Error::MissingEncoder)?;
                Cow::Owned(encoder.marshal(value).map_err(Error::marshal)?)
            }
        };

        let chunks = chunk::split(&token, &options.name, chunk::MAX_CHUNK_BYTES)?;
        let written = chunks.len();
        let now = OffsetDateTime::now_utc();

        let mut headers = chunks
            .into_iter()
            .map(|(name, value)| set_cookie(&options.build_cookie(name, &value, now)))
            .collect::<Result<Vec<_>>>()?;

        let stale = chunk::chunk_names_in(&chunk::request_jar(request), &options.name)
            .into_iter()
            .skip(written)
            .map(|name| set_cookie(&options.build_removal(name, now)))
            .collect::<Result<Vec<_>>>()?;
        if !stale.is_empty() {
            tracing::trace!(
                name = %options.name,
                count = stale.len(),
                "expiring stale session chunks"
            );
        }
        headers.extend(stale);

        tracing::trace!(
            name = %options.name,
            chunks = written,
            bytes = token.len(),
            "writing session cookies"
        );
        for value in headers {
            response.append(header::SET_COOKIE, value);
        }

        Ok(())
    }

    /// Read the session token from `request` and verify it with the decoder.
    ///
    /// The verified token is returned as-is; decode it with the concrete type you need.
    pub fn load_session(&self, request: &HeaderMap) -> Result<String> {
        load_verified(self.options.as_ref(), request, self.encoder.as_ref())
    }

    /// Expire the session cookie and every chunk cookie the request carries.
    pub fn clear_session(&self, response: &mut HeaderMap, request: &HeaderMap) -> Result<()> {
        clear(self.options.as_ref(), response, request)
    }
}

impl<E> CookieStore<E>
where
    E: Marshaler + Unmarshaler + Clone,
{
    /// A read-only view sharing this store's options and decoder.
    pub fn loader(&self) -> CookieLoader<E> {
        CookieLoader {
            options: self.options.clone(),
            decoder: self.encoder.clone(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for CookieStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieStore")
            .field("options", &self.options.current())
            .field("encoder", &self.encoder)
            .finish()
    }
}

/// Read-only counterpart of [`CookieStore`] for call sites that only verify sessions.
pub struct CookieLoader<D> {
    options: Arc<dyn OptionsSource>,
    decoder: Option<D>,
}

impl<D: Unmarshaler> CookieLoader<D> {
    /// Build a loader. Fails with [`Error::MissingDependency`] when `decoder` is `None`.
    pub fn new(options: Arc<dyn OptionsSource>, decoder: Option<D>) -> Result<Self> {
        let decoder = decoder.ok_or(Error::MissingDependency)?;
        Ok(Self {
            options,
            decoder: Some(decoder),
        })
    }

    /// See [`CookieStore::load_session`].
    pub fn load_session(&self, request: &HeaderMap) -> Result<String> {
        load_verified(self.options.as_ref(), request, self.decoder.as_ref())
    }

    pub fn decoder(&self) -> Option<&D> {
        self.decoder.as_ref()
    }
}

impl<D: fmt::Debug> fmt::Debug for CookieLoader<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieLoader")
            .field("options", &self.options.current())
            .field("decoder", &self.decoder)
            .finish()
    }
}

fn load_verified<D: Unmarshaler>(
    options: &dyn OptionsSource,
    request: &HeaderMap,
    decoder: Option<&D>,
) -> Result<String> {
    let options = options.current();
    options.validate()?;

    let token = chunk::join(&chunk::request_jar(request), &options.name)?;

    let decoder = decoder.ok_or(Error::MissingDecoder)?;
    decoder
        .unmarshal::<IgnoredAny>(&token)
        .map_err(Error::integrity)?;

    Ok(token)
}

fn clear(options: &dyn OptionsSource, response: &mut HeaderMap, request: &HeaderMap) -> Result<()> {
    let options = options.current();
    options.validate()?;

    let mut names = chunk::chunk_names_in(&chunk::request_jar(request), &options.name);
    if names.is_empty() {
        names.push(options.name.to_string());
    }

    let now = OffsetDateTime::now_utc();
    let headers = names
        .into_iter()
        .map(|name| set_cookie(&options.build_removal(name, now)))
        .collect::<Result<Vec<_>>>()?;

    for value in headers {
        response.append(header::SET_COOKIE, value);
    }
    Ok(())
}

/// Render a `Set-Cookie` value. Chunk values arrive percent-encoded from [`chunk::split`] and
/// are written as they are.
fn set_cookie(cookie: &Cookie<'_>) -> Result<HeaderValue> {
    Ok(HeaderValue::try_from(cookie.to_string())?)
}
