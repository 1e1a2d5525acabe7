use std::{
    fmt,
    sync::Arc,
    task::{Context, Poll},
};

use http::Request;
use serde::de::DeserializeOwned;
use tower_layer::Layer;
use tower_service::Service;

use crate::{encoder::Unmarshaler, store::CookieLoader};

/// A verified session token, inserted into request extensions by [`SessionLoaderLayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Decode the token into the caller's session type.
    pub fn decode<T, D>(&self, decoder: &D) -> Result<T, D::Error>
    where
        T: DeserializeOwned,
        D: Unmarshaler,
    {
        decoder.unmarshal(&self.0)
    }
}

/// Loads and verifies the session cookie of every request.
///
/// Requests with a valid session get a [`SessionToken`] extension. Requests without one, or
/// with one that fails verification, are passed through untouched.
pub struct SessionLoaderLayer<D> {
    loader: Arc<CookieLoader<D>>,
}

impl<D> SessionLoaderLayer<D> {
    #[must_use]
    pub fn new(loader: CookieLoader<D>) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }

    #[must_use]
    pub fn from_shared(loader: Arc<CookieLoader<D>>) -> Self {
        Self { loader }
    }
}

impl<D> Clone for SessionLoaderLayer<D> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for SessionLoaderLayer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLoaderLayer")
            .field("loader", &self.loader)
            .finish()
    }
}

impl<S, D> Layer<S> for SessionLoaderLayer<D> {
    type Service = SessionLoader<S, D>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionLoader {
            inner,
            loader: self.loader.clone(),
        }
    }
}

pub struct SessionLoader<S, D> {
    inner: S,
    loader: Arc<CookieLoader<D>>,
}

impl<S: Clone, D> Clone for SessionLoader<S, D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            loader: self.loader.clone(),
        }
    }
}

impl<S: fmt::Debug, D: fmt::Debug> fmt::Debug for SessionLoader<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLoader")
            .field("inner", &self.inner)
            .field("loader", &self.loader)
            .finish()
    }
}

impl<ReqBody, S, D> Service<Request<ReqBody>> for SessionLoader<S, D>
where
    S: Service<Request<ReqBody>>,
    D: Unmarshaler,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        match self.loader.load_session(req.headers()) {
            Ok(token) => {
                req.extensions_mut().insert(SessionToken(token));
            }
            Err(err) if err.is_not_found() => {
                tracing::trace!(err = %err, "no cookie session on request");
            }
            Err(err) => {
                tracing::warn!(err = %err, "cookie session load failed");
            }
        }

        self.inner.call(req)
    }
}
