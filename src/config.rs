use std::{
    borrow::Cow,
    sync::{Arc, PoisonError, RwLock},
};

use time::{Duration, OffsetDateTime};
use tower_cookies::Cookie;

use crate::{
    SameSite,
    error::{Error, Result},
};

/// Every session cookie is scoped to the whole site.
pub const COOKIE_PATH: &str = "/";

/// Cookie attributes and lifetime used by a [`CookieStore`](crate::CookieStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub(crate) name: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) secure: bool,
    pub(crate) http_only: bool,
    pub(crate) same_site: Option<SameSite>,
    pub(crate) expire: Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: "_session".into(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: None,
            expire: Duration::hours(14),
        }
    }
}

impl CookieOptions {
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// An empty domain is treated the same as no domain.
    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        let domain = domain.into();
        self.domain = (!domain.is_empty()).then_some(domain);
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Cookie lifetime. `Duration::ZERO` writes browser-session cookies without `Expires`.
    #[must_use]
    pub fn with_expire(mut self, expire: Duration) -> Self {
        self.expire = expire;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    pub fn expire(&self) -> Duration {
        self.expire
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidOptions("cookie name must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn build_cookie(
        &self,
        name: String,
        value: &str,
        now: OffsetDateTime,
    ) -> Cookie<'static> {
        let mut cookie = self.base_cookie(name, value.to_owned());
        if self.expire > Duration::ZERO {
            cookie.set_expires(now + self.expire);
        }
        cookie
    }

    pub(crate) fn build_removal(&self, name: String, now: OffsetDateTime) -> Cookie<'static> {
        let mut cookie = self.base_cookie(name, String::new());
        cookie.set_expires(now - Duration::days(365));
        cookie
    }

    fn base_cookie(&self, name: String, value: String) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((name, value))
            .path(COOKIE_PATH)
            .secure(self.secure)
            .http_only(self.http_only);

        if let Some(same_site) = self.same_site {
            cookie_builder = cookie_builder.same_site(same_site);
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }
}

/// Source of the current [`CookieOptions`].
///
/// Stores call [`OptionsSource::current`] once at the start of every operation and never keep
/// the result, so configuration changes apply to the next request.
pub trait OptionsSource: Send + Sync {
    fn current(&self) -> CookieOptions;
}

impl<F> OptionsSource for F
where
    F: Fn() -> CookieOptions + Send + Sync,
{
    fn current(&self) -> CookieOptions {
        self()
    }
}

/// Shared, replaceable options snapshot.
///
/// Hand an `Arc<LiveOptions>` to the store and keep a clone for the configuration reloader.
#[derive(Debug, Default)]
pub struct LiveOptions {
    current: RwLock<Arc<CookieOptions>>,
}

impl LiveOptions {
    pub fn new(options: CookieOptions) -> Self {
        Self {
            current: RwLock::new(Arc::new(options)),
        }
    }

    pub fn replace(&self, options: CookieOptions) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(options);
    }

    pub fn snapshot(&self) -> Arc<CookieOptions> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OptionsSource for LiveOptions {
    fn current(&self) -> CookieOptions {
        CookieOptions::clone(&self.snapshot())
    }
}
